//! Registry entries and references to them.

/// A URL and the complete response served for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseEntry {
    url: Box<[u8]>,
    response: Box<[u8]>,
}

impl ResponseEntry {
    pub(crate) fn new(url: Vec<u8>, response: Vec<u8>) -> Self {
        Self {
            url: url.into_boxed_slice(),
            response: response.into_boxed_slice(),
        }
    }

    /// The URL, without the leading `/`.
    pub fn url(&self) -> &[u8] {
        &self.url
    }

    /// The serialized response, headers included.
    pub fn response(&self) -> &[u8] {
        &self.response
    }

    /// Total length of the serialized response.
    pub fn len(&self) -> usize {
        self.response.len()
    }

    pub fn is_empty(&self) -> bool {
        self.response.is_empty()
    }
}

/// Which response a completed request is answered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseRef {
    /// The registry entry at this index.
    Entry(usize),
    /// The fixed 404 response.
    NotFound,
}

impl From<Option<usize>> for ResponseRef {
    fn from(matched: Option<usize>) -> Self {
        matched.map_or(ResponseRef::NotFound, ResponseRef::Entry)
    }
}
