//! Connection slots and the keys that address them.

use mio::Token;

use crate::registry::ResponseRef;

/// Bits of a token that hold the slot index. The rest hold the generation.
const INDEX_BITS: u32 = 24;
const INDEX_MASK: usize = (1 << INDEX_BITS) - 1;
const GENERATION_MASK: usize = usize::MAX >> INDEX_BITS;

/// Upper bound on the number of slots a pool may hold.
///
/// The two highest index values are left unused so the listener and waker tokens
/// can never decode to a live slot.
pub const MAX_SLOTS: usize = INDEX_MASK - 1;

/// Where the line scanner is within the current request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    /// Waiting for the first line of a request.
    AwaitingRequestLine,
    /// Request line consumed; skipping headers until the empty line.
    AwaitingBlankLine,
}

/// Stable address of a slot: its index plus the generation of its occupant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotKey {
    index: usize,
    generation: usize,
}

impl SlotKey {
    pub(crate) fn new(index: usize, generation: usize) -> Self {
        Self { index, generation }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn generation(&self) -> usize {
        self.generation
    }

    /// The token the slot's socket is registered under.
    pub fn token(&self) -> Token {
        Token((self.generation << INDEX_BITS) | self.index)
    }

    pub fn from_token(token: Token) -> Self {
        Self {
            index: token.0 & INDEX_MASK,
            generation: token.0 >> INDEX_BITS,
        }
    }
}

/// A response that is being written but has not been fully sent yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingWrite {
    pub response: ResponseRef,
    pub written: usize,
}

/// One accepted connection and its in-progress request.
#[derive(Debug)]
pub struct ConnectionSlot<S> {
    pub(crate) stream: Option<S>,
    generation: usize,
    pub(crate) buffer: Box<[u8]>,
    pub(crate) write_cursor: usize,
    pub(crate) line_cursor: usize,
    pub(crate) state: ParseState,
    pub(crate) matched: Option<usize>,
    pub(crate) pending: Option<PendingWrite>,
}

impl<S> ConnectionSlot<S> {
    pub(crate) fn new(buffer_capacity: usize) -> Self {
        Self {
            stream: None,
            generation: 0,
            buffer: vec![0; buffer_capacity].into_boxed_slice(),
            write_cursor: 0,
            line_cursor: 0,
            state: ParseState::AwaitingRequestLine,
            matched: None,
            pending: None,
        }
    }

    /// Occupy the slot with a new connection.
    pub(crate) fn claim(&mut self, stream: S) {
        self.generation = (self.generation + 1) & GENERATION_MASK;
        self.stream = Some(stream);
        self.pending = None;
        self.reset_request();
    }

    /// Free the slot, handing back its stream.
    pub(crate) fn vacate(&mut self) -> Option<S> {
        self.pending = None;
        self.reset_request();
        self.stream.take()
    }

    /// Forget everything about the current request, including unscanned bytes.
    pub(crate) fn reset_request(&mut self) {
        self.write_cursor = 0;
        self.line_cursor = 0;
        self.state = ParseState::AwaitingRequestLine;
        self.matched = None;
    }

    pub fn is_free(&self) -> bool {
        self.stream.is_none()
    }

    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn stream(&self) -> Option<&S> {
        self.stream.as_ref()
    }

    pub fn stream_mut(&mut self) -> Option<&mut S> {
        self.stream.as_mut()
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    pub fn write_cursor(&self) -> usize {
        self.write_cursor
    }

    pub fn line_cursor(&self) -> usize {
        self.line_cursor
    }

    pub fn state(&self) -> ParseState {
        self.state
    }

    /// The registry entry the current request line matched, if any.
    pub fn matched(&self) -> Option<usize> {
        self.matched
    }

    pub fn pending(&self) -> Option<PendingWrite> {
        self.pending
    }
}
