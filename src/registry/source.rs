//! Collaborators that supply the (name, content) pairs the registry is built from.

use std::fs::{self, File, ReadDir};
use std::io::{self, Read};
use std::path::PathBuf;
use std::vec;

use log::trace;

use crate::registry::error::{Error, ItemError};

/// One named piece of content offered to the registry.
#[derive(Debug, Clone)]
pub struct SourceItem {
    /// The URL the content is served under, without the leading `/`.
    pub name: Vec<u8>,
    /// The length the source announced before reading.
    pub declared_len: u64,
    /// The bytes that were actually read.
    pub content: Vec<u8>,
}

/// A finite supply of registry items, consumed exactly once before serving starts.
pub trait ResponseSource {
    /// The item iterator. Per-item failures are yielded as `Err` and skipped by the registry.
    type Items: Iterator<Item = Result<SourceItem, ItemError>>;

    /// Open the source. Failing here is fatal to registry construction.
    fn open(self) -> Result<Self::Items, Error>;
}

/// Serves every regular file of a directory under its file name.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    path: PathBuf,
}

impl DirectorySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ResponseSource for DirectorySource {
    type Items = DirectoryItems;

    fn open(self) -> Result<Self::Items, Error> {
        let entries = fs::read_dir(&self.path).map_err(|source| Error::SourceUnavailable {
            path: self.path.clone(),
            source,
        })?;
        Ok(DirectoryItems { entries })
    }
}

/// Iterator over the regular files of an opened [`DirectorySource`].
#[derive(Debug)]
pub struct DirectoryItems {
    entries: ReadDir,
}

impl Iterator for DirectoryItems {
    type Item = Result<SourceItem, ItemError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.entries.next()? {
                Ok(entry) => entry,
                Err(source) => {
                    return Some(Err(ItemError::Unreadable {
                        name: "<directory entry>".to_string(),
                        source,
                    }))
                }
            };

            let path = entry.path();
            let name = entry.file_name();
            let display = name.to_string_lossy().into_owned();

            // Follows symlinks, so a link to a regular file is served like the file.
            let metadata = match fs::metadata(&path) {
                Ok(metadata) => metadata,
                Err(source) => return Some(Err(ItemError::Unreadable { name: display, source })),
            };
            if !metadata.is_file() {
                trace!("Skipping {display}: not a regular file");
                continue;
            }

            return Some(read_item(path, name.into_encoded_bytes(), display, metadata.len()));
        }
    }
}

fn read_item(path: PathBuf, name: Vec<u8>, display: String, declared_len: u64) -> Result<SourceItem, ItemError> {
    let unreadable = |source: io::Error| ItemError::Unreadable {
        name: display.clone(),
        source,
    };

    let file = File::open(&path).map_err(unreadable)?;

    let mut content = Vec::new();
    let capacity = usize::try_from(declared_len).map_err(|_| ItemError::OutOfMemory { name: display.clone() })?;
    content
        .try_reserve_exact(capacity)
        .map_err(|_| ItemError::OutOfMemory { name: display.clone() })?;

    // Never read past the announced length; a file that shrank shows up as a short read.
    file.take(declared_len).read_to_end(&mut content).map_err(unreadable)?;

    Ok(SourceItem {
        name,
        declared_len,
        content,
    })
}

/// An in-memory source, mostly useful for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    items: Vec<(Vec<u8>, Vec<u8>)>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a named response body.
    pub fn with(mut self, name: impl Into<Vec<u8>>, content: impl Into<Vec<u8>>) -> Self {
        self.items.push((name.into(), content.into()));
        self
    }
}

impl ResponseSource for MemorySource {
    type Items = MemoryItems;

    fn open(self) -> Result<Self::Items, Error> {
        Ok(MemoryItems {
            items: self.items.into_iter(),
        })
    }
}

/// Iterator over the items of a [`MemorySource`].
#[derive(Debug)]
pub struct MemoryItems {
    items: vec::IntoIter<(Vec<u8>, Vec<u8>)>,
}

impl Iterator for MemoryItems {
    type Item = Result<SourceItem, ItemError>;

    fn next(&mut self) -> Option<Self::Item> {
        let (name, content) = self.items.next()?;
        Some(Ok(SourceItem {
            name,
            declared_len: content.len() as u64,
            content,
        }))
    }
}
