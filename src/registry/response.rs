//! Prebuilt HTTP response bytes.

use std::collections::TryReserveError;

/// The fixed response sent when no registry entry matches a request.
pub const NOT_FOUND_RESPONSE: &[u8] = b"HTTP/1.1 404 Not Found\r\nContent-Length:0\r\n\r\n";

/// HTTP status codes the server can answer with, with their standard reason phrases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Ok = 200,
    NotFound = 404,
}

impl StatusCode {
    /// Get the reason phrase for this status code.
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::NotFound => "Not Found",
        }
    }
}

/// Serialize a complete response: status line, `Content-Length` header, blank line and body.
///
/// The buffer is sized exactly once up front, so an allocation failure is reported
/// instead of aborting the process.
pub fn serialize(status: StatusCode, body: &[u8]) -> Result<Vec<u8>, TryReserveError> {
    let head = format!(
        "HTTP/1.1 {code} {reason}\r\nContent-Length:{len}\r\n\r\n",
        code = status as u16,
        reason = status.reason_phrase(),
        len = body.len(),
    );

    let mut bytes = Vec::new();
    bytes.try_reserve_exact(head.len() + body.len())?;
    bytes.extend_from_slice(head.as_bytes());
    bytes.extend_from_slice(body);

    Ok(bytes)
}
