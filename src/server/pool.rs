//! Fixed-capacity pool of connection slots.

use crate::server::slot::{ConnectionSlot, SlotKey};

/// A fixed array of connection slots.
///
/// Allocation sweeps circularly from where the previous allocation stopped, so
/// recently released low indices are not rescanned on every accept.
#[derive(Debug)]
pub struct SlotPool<S> {
    slots: Vec<ConnectionSlot<S>>,
    cursor: usize,
    in_use: usize,
}

impl<S> SlotPool<S> {
    /// Create `capacity` free slots, each with a receive buffer of `buffer_capacity` bytes.
    pub fn new(capacity: usize, buffer_capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| ConnectionSlot::new(buffer_capacity)).collect(),
            cursor: 0,
            in_use: 0,
        }
    }

    /// Claim a free slot for `stream`.
    ///
    /// When every slot is taken the stream is handed back so the caller can close it.
    pub fn allocate(&mut self, stream: S) -> Result<SlotKey, S> {
        let capacity = self.slots.len();

        for _ in 0..capacity {
            let index = self.cursor;
            self.cursor = (self.cursor + 1) % capacity;

            let slot = &mut self.slots[index];
            if slot.is_free() {
                slot.claim(stream);
                self.in_use += 1;
                return Ok(SlotKey::new(index, slot.generation()));
            }
        }

        Err(stream)
    }

    /// Free the slot behind `key` and return its stream.
    ///
    /// Returns `None` if the key is stale or the slot is already free.
    pub fn release(&mut self, key: SlotKey) -> Option<S> {
        let stream = self.get_mut(key)?.vacate();
        if stream.is_some() {
            self.in_use -= 1;
        }
        stream
    }

    /// The live slot behind `key`, if its generation still matches.
    pub fn get_mut(&mut self, key: SlotKey) -> Option<&mut ConnectionSlot<S>> {
        self.slots
            .get_mut(key.index())
            .filter(|slot| !slot.is_free() && slot.generation() == key.generation())
    }

    pub fn get(&self, key: SlotKey) -> Option<&ConnectionSlot<S>> {
        self.slots
            .get(key.index())
            .filter(|slot| !slot.is_free() && slot.generation() == key.generation())
    }

    /// Keys of every occupied slot.
    pub fn keys(&self) -> Vec<SlotKey> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| !slot.is_free())
            .map(|(index, slot)| SlotKey::new(index, slot.generation()))
            .collect()
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.in_use
    }

    pub fn is_empty(&self) -> bool {
        self.in_use == 0
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn is_full(&self) -> bool {
        self.in_use == self.slots.len()
    }
}
