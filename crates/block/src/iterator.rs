use bytes::Bytes;

use crate::block::{entry_ranges, Block};
use crate::error::BlockError;

#[derive(Debug, Clone, PartialEq, Eq)]
enum State {
    Valid,
    Exhausted,
    Corrupt(BlockError),
}

/// Sequential reader over the records of one block.
///
/// The iterator keeps its own snapshot of the block's bytes, so the source
/// [`Block`] may be dropped or reused while an iteration is in flight. Keys
/// and values are handed out as slices of that snapshot.
///
/// [`key`](BlockIterator::key) and [`value`](BlockIterator::value) are only
/// meaningful while [`is_valid`](BlockIterator::is_valid) returns `true`.
#[derive(Debug, Clone)]
pub struct BlockIterator {
    data: Bytes,
    offsets: Vec<u16>,
    idx: usize,
    key: Bytes,
    value: Bytes,
    state: State,
}

impl BlockIterator {
    /// Creates an iterator positioned at the first record of `block`.
    pub fn new(block: &Block) -> Self {
        let mut iter = Self {
            data: Bytes::new(),
            offsets: Vec::new(),
            idx: 0,
            key: Bytes::new(),
            value: Bytes::new(),
            state: State::Exhausted,
        };
        iter.set_block(block);
        iter
    }

    /// Points the iterator at a new block and rewinds to its first record.
    pub fn set_block(&mut self, block: &Block) {
        self.data = Bytes::copy_from_slice(&block.data);
        self.offsets = block.offsets.clone();
        self.seek_to_first();
    }

    /// Rewinds to the first record.
    pub fn seek_to_first(&mut self) {
        self.idx = 0;
        self.decode_entry();
    }

    /// Returns `true` if the iterator sits on a successfully decoded record.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.state == State::Valid
    }

    /// The decode error that invalidated the iterator, if any. Running off
    /// the end of the block is not an error.
    #[must_use]
    pub fn error(&self) -> Option<&BlockError> {
        match &self.state {
            State::Corrupt(e) => Some(e),
            _ => None,
        }
    }

    /// Index of the current record.
    #[must_use]
    pub fn index(&self) -> usize {
        self.idx
    }

    /// Advances to the next record. Does nothing once invalid.
    pub fn next(&mut self) {
        if !self.is_valid() {
            return;
        }
        self.idx += 1;
        self.decode_entry();
    }

    /// Positions the iterator on the record whose key equals `key`.
    ///
    /// Scans linearly from the first record. If no record matches, the
    /// iterator ends up past the last record and is invalid.
    ///
    /// # Panics
    ///
    /// Panics if a record fails to decode. Blocks reaching an iterator were
    /// produced by the builder or read back through a validated table, so
    /// this means memory corruption or a bug in the codec.
    pub fn seek(&mut self, key: &[u8]) {
        self.idx = 0;
        while self.idx < self.offsets.len() {
            self.decode_entry();
            if let State::Corrupt(e) = &self.state {
                panic!("block iterator: failed to decode record {}: {}", self.idx, e);
            }
            if self.key.as_ref() == key {
                return;
            }
            self.idx += 1;
        }
        self.decode_entry();
    }

    /// Key of the current record.
    #[must_use]
    pub fn key(&self) -> &[u8] {
        debug_assert!(self.is_valid(), "key() on an invalid block iterator");
        &self.key
    }

    /// Value of the current record. Empty for a tombstone.
    #[must_use]
    pub fn value(&self) -> &[u8] {
        debug_assert!(self.is_valid(), "value() on an invalid block iterator");
        &self.value
    }

    /// Owned handle to the current key, sharing the snapshot buffer.
    #[must_use]
    pub fn key_bytes(&self) -> Bytes {
        self.key.clone()
    }

    /// Owned handle to the current value, sharing the snapshot buffer.
    #[must_use]
    pub fn value_bytes(&self) -> Bytes {
        self.value.clone()
    }

    fn decode_entry(&mut self) {
        let Some(&offset) = self.offsets.get(self.idx) else {
            self.key = Bytes::new();
            self.value = Bytes::new();
            self.state = State::Exhausted;
            return;
        };

        match entry_ranges(&self.data, offset as usize) {
            Ok((key, value)) => {
                self.key = self.data.slice(key);
                self.value = self.data.slice(value);
                self.state = State::Valid;
            }
            Err(e) => {
                self.key = Bytes::new();
                self.value = Bytes::new();
                self.state = State::Corrupt(e);
            }
        }
    }
}
