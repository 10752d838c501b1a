//! Request-line parsing and URL matching.
//!
//! Only the first line of a request is ever inspected. Headers are skipped by the
//! connection state machine, so this module deals with one CRLF-free line at a time.

mod error;
mod method;
mod request;

// Re-export public items
pub use error::Error;
pub use method::Method;
pub use request::{match_request, parse_request_line, RequestLine};
