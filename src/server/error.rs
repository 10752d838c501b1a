//! Error types for the HTTP server.

use thiserror::Error;

use crate::registry::Error as RegistryError;

/// Errors that stop the server from starting or running.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error on the listener or the poll.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The response registry could not be built.
    #[error("Registry error: {0}")]
    RegistryError(#[from] RegistryError),

    /// A configuration value is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// JSON configuration could not be parsed.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Why a connection was closed.
#[derive(Debug, Error)]
pub enum CloseReason {
    /// The peer closed its end.
    #[error("peer closed the connection")]
    PeerClosed,

    /// The receive buffer filled up before a complete request arrived.
    #[error("receive buffer exhausted before the request completed")]
    BufferExhausted,

    /// Receiving or sending failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
