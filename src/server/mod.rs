//! HTTP server implementation for microstatic.
//!
//! One thread, one `mio::Poll`, and a fixed pool of connection slots. Every socket
//! is non-blocking and every handler returns as soon as its socket would block.

mod config;
mod connection;
mod error;
mod http_server;
mod pool;
mod slot;
mod tests;

// Re-export public items
pub use config::{ServerConfig, DEFAULT_PORT, LISTEN_BACKLOG, MAX_CLIENTS, MAX_EVENTS, RECEIVE_BUFFER_SIZE};
pub use connection::{on_readable, Outcome};
pub use error::{CloseReason, Error};
pub use http_server::{HttpServer, ShutdownHandle};
pub use pool::SlotPool;
pub use slot::{ConnectionSlot, ParseState, PendingWrite, SlotKey, MAX_SLOTS};
