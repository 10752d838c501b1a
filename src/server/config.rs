//! Server configuration.

use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::registry::{RegistryLimits, MAX_RESPONSES, MAX_URL_LENGTH};
use crate::server::error::Error;
use crate::server::slot::MAX_SLOTS;

/// Default listening port.
pub const DEFAULT_PORT: u16 = 80;
/// Default number of concurrent connections.
pub const MAX_CLIENTS: usize = 2048;
/// Default per-connection receive buffer capacity.
pub const RECEIVE_BUFFER_SIZE: usize = 1000;
/// Default number of readiness events handled per wake-up.
pub const MAX_EVENTS: usize = 64;
/// Default listen backlog.
pub const LISTEN_BACKLOG: i32 = 128;

/// HTTP server configuration.
///
/// Every limit is fixed once the server is bound. Missing fields in a JSON
/// configuration file fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// The address to bind to.
    pub addr: SocketAddr,
    /// Directory whose regular files are served.
    pub response_dir: PathBuf,
    /// The maximum number of concurrent connections.
    pub max_connections: usize,
    /// Receive buffer capacity of each connection. A request must fit in it.
    pub buffer_capacity: usize,
    /// Readiness events collected per poll.
    pub max_events: usize,
    /// Listen backlog of the server socket.
    pub backlog: i32,
    /// The maximum number of registry entries.
    pub max_responses: usize,
    /// The maximum length of a registry URL.
    pub max_url_length: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            response_dir: PathBuf::from("responses"),
            max_connections: MAX_CLIENTS,
            buffer_capacity: RECEIVE_BUFFER_SIZE,
            max_events: MAX_EVENTS,
            backlog: LISTEN_BACKLOG,
            max_responses: MAX_RESPONSES,
            max_url_length: MAX_URL_LENGTH,
        }
    }
}

impl ServerConfig {
    /// Parse a configuration from JSON.
    pub fn from_json_str(json: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Check the limits for values the server cannot run with.
    pub fn validate(&self) -> Result<(), Error> {
        if self.max_connections == 0 || self.max_connections > MAX_SLOTS {
            return Err(Error::InvalidConfig(format!(
                "max_connections must be between 1 and {MAX_SLOTS}, got {}",
                self.max_connections
            )));
        }
        if self.buffer_capacity < 4 {
            return Err(Error::InvalidConfig(format!(
                "buffer_capacity must hold at least an empty request line and blank line, got {}",
                self.buffer_capacity
            )));
        }
        if self.max_events == 0 {
            return Err(Error::InvalidConfig("max_events must be at least 1".to_string()));
        }
        if self.backlog <= 0 {
            return Err(Error::InvalidConfig(format!("backlog must be positive, got {}", self.backlog)));
        }
        if self.max_url_length >= self.buffer_capacity {
            return Err(Error::InvalidConfig(format!(
                "max_url_length ({}) must be smaller than buffer_capacity ({})",
                self.max_url_length, self.buffer_capacity
            )));
        }
        Ok(())
    }

    /// The bounds used when building the response registry.
    pub fn registry_limits(&self) -> RegistryLimits {
        RegistryLimits {
            max_entries: self.max_responses,
            max_url_length: self.max_url_length,
        }
    }
}
