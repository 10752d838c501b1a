//! Request-line parsing and matching against the response registry.

use log::{debug, trace};

use crate::parser::error::Error;
use crate::parser::method::Method;
use crate::registry::ResponseRegistry;

/// A parsed request line, borrowing from the connection's receive buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestLine<'a> {
    /// The HTTP method.
    pub method: Method,
    /// Everything after the `/` that opens the target, up to the end of the line.
    rest: &'a [u8],
}

impl<'a> RequestLine<'a> {
    /// The request target without its leading `/`, cut at the first space.
    pub fn target(&self) -> &'a [u8] {
        let end = self.rest.iter().position(|&b| b == b' ').unwrap_or(self.rest.len());
        &self.rest[..end]
    }

    /// Whether the target is exactly `url` followed by a space.
    ///
    /// A target that runs to the end of the line without a space never matches.
    pub fn target_matches(&self, url: &[u8]) -> bool {
        self.rest
            .strip_prefix(url)
            .is_some_and(|after| after.first() == Some(&b' '))
    }
}

/// Parse a request line (CRLF already stripped) into its method and target.
///
/// # Arguments
///
/// * `line` - The bytes of the first line of the request
///
/// # Returns
///
/// The parsed request line, or an error if the line is not `METHOD SP /TARGET ...`
pub fn parse_request_line(line: &[u8]) -> Result<RequestLine<'_>, Error> {
    let space = line
        .iter()
        .position(|&b| b == b' ')
        .ok_or_else(|| Error::MalformedRequestLine(String::from_utf8_lossy(line).into_owned()))?;

    let method = Method::from_token(&line[..space])?;
    let rest = line[space + 1..].strip_prefix(b"/").ok_or(Error::InvalidPath)?;

    Ok(RequestLine { method, rest })
}

/// Find the registry entry a request line asks for.
///
/// Entries are tried in insertion order and the first whose URL matches wins.
/// Anything other than a well-formed `GET` line matches nothing.
pub fn match_request(line: &[u8], registry: &ResponseRegistry) -> Option<usize> {
    let request = match parse_request_line(line) {
        Ok(request) => request,
        Err(e) => {
            debug!("Unrecognized request line: {e}");
            return None;
        }
    };

    if request.method != Method::GET {
        debug!("{method} is not served", method = request.method);
        return None;
    }

    let matched = registry
        .entries()
        .iter()
        .position(|entry| request.target_matches(entry.url()));

    trace!(
        "GET /{target} -> {matched:?}",
        target = String::from_utf8_lossy(request.target())
    );
    matched
}
