//! Response registry.
//!
//! The registry is built once, before the server starts, from a [`ResponseSource`]
//! and never changes afterwards. Each entry holds the complete response bytes, so
//! serving a request is a lookup followed by a write.

mod entry;
mod error;
mod response;
mod source;
mod table;

// Re-export public items
pub use entry::{ResponseEntry, ResponseRef};
pub use error::{Error, ItemError};
pub use response::{serialize, StatusCode, NOT_FOUND_RESPONSE};
pub use source::{DirectoryItems, DirectorySource, MemoryItems, MemorySource, ResponseSource, SourceItem};
pub use table::{RegistryLimits, ResponseRegistry, MAX_RESPONSES, MAX_URL_LENGTH};
