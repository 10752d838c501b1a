//! Error types for building the response registry.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures that prevent the registry from being built at all.
#[derive(Debug, Error)]
pub enum Error {
    /// The response source could not be opened.
    #[error("Cannot open response source {path}: {source}")]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Failures of a single source item. The item is skipped and construction continues.
#[derive(Debug, Error)]
pub enum ItemError {
    /// The item's content could not be read.
    #[error("Cannot read {name}: {source}")]
    Unreadable {
        name: String,
        #[source]
        source: io::Error,
    },

    /// The item's name is longer than the configured URL limit.
    #[error("Name of {len} bytes exceeds the limit of {max}: {name}")]
    NameTooLong { name: String, len: usize, max: usize },

    /// Fewer bytes were read than the source declared.
    #[error("Short read of {name}: expected {expected} bytes, got {actual}")]
    ShortRead {
        name: String,
        expected: u64,
        actual: u64,
    },

    /// The response buffer could not be allocated.
    #[error("Out of memory while building the response for {name}")]
    OutOfMemory { name: String },

    /// An earlier item already registered the same URL.
    #[error("Duplicate URL: {name}")]
    DuplicateUrl { name: String },
}
