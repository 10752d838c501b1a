//! The immutable URL to response table.

use log::{debug, info, warn};

use crate::registry::entry::{ResponseEntry, ResponseRef};
use crate::registry::error::{Error, ItemError};
use crate::registry::response::{self, StatusCode, NOT_FOUND_RESPONSE};
use crate::registry::source::{ResponseSource, SourceItem};

/// Default cap on the number of registry entries.
pub const MAX_RESPONSES: usize = 2048;

/// Default cap on the length of an entry's URL, in bytes.
pub const MAX_URL_LENGTH: usize = 255;

/// Bounds applied while the registry is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryLimits {
    /// Items beyond this many stored entries are skipped.
    pub max_entries: usize,
    /// Items with longer names are skipped.
    pub max_url_length: usize,
}

impl Default for RegistryLimits {
    fn default() -> Self {
        Self {
            max_entries: MAX_RESPONSES,
            max_url_length: MAX_URL_LENGTH,
        }
    }
}

/// Insertion-ordered, read-only table of prebuilt responses.
#[derive(Debug, Clone, Default)]
pub struct ResponseRegistry {
    entries: Vec<ResponseEntry>,
}

impl ResponseRegistry {
    /// Build the registry from a source.
    ///
    /// Only a source that cannot be opened is an error. Items that fail on their own
    /// are logged and skipped, and once `limits.max_entries` entries are stored the
    /// rest of the source is ignored.
    pub fn build<S: ResponseSource>(source: S, limits: RegistryLimits) -> Result<Self, Error> {
        let mut entries: Vec<ResponseEntry> = Vec::new();

        for item in source.open()? {
            if entries.len() >= limits.max_entries {
                warn!(
                    "Response limit of {max} reached, skipping remaining items",
                    max = limits.max_entries
                );
                break;
            }

            match item.and_then(|item| Self::prepare(item, &limits, &mut entries)) {
                Ok(entry) => {
                    debug!(
                        "Registered /{url} ({len} bytes)",
                        url = String::from_utf8_lossy(entry.url()),
                        len = entry.len()
                    );
                    entries.push(entry);
                }
                Err(e) => warn!("Skipping response: {e}"),
            }
        }

        info!("Loaded {count} responses", count = entries.len());
        Ok(Self { entries })
    }

    fn prepare(item: SourceItem, limits: &RegistryLimits, entries: &mut Vec<ResponseEntry>) -> Result<ResponseEntry, ItemError> {
        let name = || String::from_utf8_lossy(&item.name).into_owned();

        if item.name.len() > limits.max_url_length {
            return Err(ItemError::NameTooLong {
                name: name(),
                len: item.name.len(),
                max: limits.max_url_length,
            });
        }

        let actual = item.content.len() as u64;
        if actual != item.declared_len {
            return Err(ItemError::ShortRead {
                name: name(),
                expected: item.declared_len,
                actual,
            });
        }

        if entries.iter().any(|entry| entry.url() == item.name.as_slice()) {
            return Err(ItemError::DuplicateUrl { name: name() });
        }

        let bytes = response::serialize(StatusCode::Ok, &item.content).map_err(|_| ItemError::OutOfMemory { name: name() })?;
        entries.try_reserve(1).map_err(|_| ItemError::OutOfMemory { name: name() })?;

        Ok(ResponseEntry::new(item.name, bytes))
    }

    /// All entries, in insertion order.
    pub fn entries(&self) -> &[ResponseEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&ResponseEntry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The bytes to send for a dispatched request.
    ///
    /// A stale index falls back to the 404 response.
    pub fn response_bytes(&self, response: ResponseRef) -> &[u8] {
        match response {
            ResponseRef::Entry(index) => self.entries.get(index).map_or(NOT_FOUND_RESPONSE, ResponseEntry::response),
            ResponseRef::NotFound => NOT_FOUND_RESPONSE,
        }
    }
}
