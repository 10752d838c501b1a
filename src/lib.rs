//! A minimal, single-threaded HTTP/1.1 server for prebuilt responses.
//!
//! Every response is serialized once, before the server starts, into a
//! [`ResponseRegistry`]. The server then multiplexes all connections on one thread
//! with `mio`, parses request lines incrementally as bytes arrive, and answers
//! `GET` requests by writing the matching prebuilt bytes (or a fixed 404).
//!
//! # Features
//!
//! - Fixed pool of connection slots with circular reuse
//! - Incremental CRLF line scanning that survives arbitrary read fragmentation
//! - First-match URL lookup over an insertion-ordered registry
//! - Responses loaded from a directory or from memory
//! - Non-blocking sends that resume when the socket becomes writable
//!
//! # Examples
//!
//! ## Building a registry
//!
//! ```
//! use microstatic::{match_request, MemorySource, RegistryLimits, ResponseRegistry};
//!
//! let source = MemorySource::new().with("test", "<html><body>Hello World!</body></html>");
//! let registry = ResponseRegistry::build(source, RegistryLimits::default()).unwrap();
//!
//! assert!(registry.entries()[0]
//!     .response()
//!     .starts_with(b"HTTP/1.1 200 OK\r\nContent-Length:38\r\n\r\n"));
//! assert_eq!(match_request(b"GET /test HTTP/1.1", &registry), Some(0));
//! assert_eq!(match_request(b"GET /missing HTTP/1.1", &registry), None);
//! ```
//!
//! ## Serving a directory
//!
//! ```no_run
//! use microstatic::{DirectorySource, HttpServer, ResponseRegistry, ServerConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig {
//!         addr: "127.0.0.1:8080".parse()?,
//!         ..ServerConfig::default()
//!     };
//!
//!     let registry = ResponseRegistry::build(DirectorySource::new("./public"), config.registry_limits())?;
//!     let mut server = HttpServer::bind(config, registry)?;
//!     server.run()?;
//!     Ok(())
//! }
//! ```

// Export the parser module
pub mod parser;

// Export the registry module
pub mod registry;

// Export the server module
pub mod server;

// Re-export commonly used items for convenience
pub use parser::{match_request, parse_request_line, Error as ParserError, Method, RequestLine};
pub use registry::{
    DirectorySource, Error as RegistryError, MemorySource, RegistryLimits, ResponseRegistry, ResponseSource,
    NOT_FOUND_RESPONSE,
};
pub use server::{Error as ServerError, HttpServer, ServerConfig, ShutdownHandle};
