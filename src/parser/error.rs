//! Error types for the request-line parser.

use thiserror::Error;

/// Errors that can occur while parsing a request line.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// The method token is not a known HTTP method.
    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),

    /// The line has no space separating the method from the target.
    #[error("Malformed request line: {0}")]
    MalformedRequestLine(String),

    /// The request target does not start with `/`.
    #[error("Invalid HTTP path")]
    InvalidPath,
}
