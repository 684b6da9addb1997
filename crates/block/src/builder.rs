
use crate::block::{Block, MAX_BLOCK_SIZE, SIZEOF_U16};

/// Packs sorted key/value pairs into a [`Block`] under a size ceiling.
///
/// Callers feed records in ascending key order; the builder does not sort.
/// Once at least one record has been accepted, the encoded size of the block
/// never exceeds `target_size`. The first record is always accepted, even if
/// it alone is larger than the target, so an oversized entry cannot wedge a
/// caller that rolls over to a fresh builder on rejection.
#[derive(Debug, Clone)]
pub struct BlockBuilder {
    data: Vec<u8>,
    offsets: Vec<u16>,
    target_size: usize,
    /// Key of the most recently accepted record.
    last_key: Vec<u8>,
}

impl BlockBuilder {
    /// Creates an empty builder that targets `target_size` encoded bytes.
    ///
    /// # Panics
    ///
    /// Panics if `target_size` is zero or larger than [`MAX_BLOCK_SIZE`];
    /// 16-bit offsets cannot address a bigger block.
    pub fn new(target_size: usize) -> Self {
        assert!(
            target_size > 0 && target_size <= MAX_BLOCK_SIZE,
            "block target size must be in 1..={}, got {}",
            MAX_BLOCK_SIZE,
            target_size
        );
        Self {
            data: Vec::with_capacity(target_size),
            offsets: Vec::new(),
            target_size,
            last_key: Vec::new(),
        }
    }

    /// Size the block would encode to right now: count + data + offsets.
    #[must_use]
    pub fn estimated_size(&self) -> usize {
        SIZEOF_U16 + self.data.len() + self.offsets.len() * SIZEOF_U16
    }

    /// Appends a record. Returns `false`, leaving the builder untouched, if
    /// the record would push a non-empty block past the target size.
    ///
    /// # Panics
    ///
    /// Panics if `key` is empty, or if `key` or `value` is longer than a
    /// 16-bit length field can express.
    #[must_use]
    pub fn add(&mut self, key: &[u8], value: &[u8]) -> bool {
        assert!(!key.is_empty(), "key must not be empty");
        assert!(
            key.len() <= u16::MAX as usize,
            "key too large for a block: {} bytes",
            key.len()
        );
        assert!(
            value.len() <= u16::MAX as usize,
            "value too large for a block: {} bytes",
            value.len()
        );

        // key_len + value_len + one offset slot
        let required = key.len() + value.len() + 3 * SIZEOF_U16;
        if !self.is_empty() && self.estimated_size() + required > self.target_size {
            return false;
        }

        // Non-first records are bounded by target_size, so the offset fits.
        self.offsets.push(self.data.len() as u16);

        self.data.extend_from_slice(&(key.len() as u16).to_be_bytes());
        self.data.extend_from_slice(key);
        self.data.extend_from_slice(&(value.len() as u16).to_be_bytes());
        self.data.extend_from_slice(value);

        self.last_key.clear();
        self.last_key.extend_from_slice(key);
        true
    }

    /// Returns `true` if no record has been accepted yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Number of accepted records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    /// The configured size ceiling.
    #[must_use]
    pub fn target_size(&self) -> usize {
        self.target_size
    }

    /// Key of the most recently accepted record.
    #[must_use]
    pub fn last_key(&self) -> Option<&[u8]> {
        if self.is_empty() {
            None
        } else {
            Some(&self.last_key)
        }
    }

    /// Finalizes the block. An unused builder yields an empty block, which
    /// callers should check with [`Block::is_empty`] before persisting.
    #[must_use]
    pub fn build(self) -> Block {
        Block {
            data: self.data,
            offsets: self.offsets,
        }
    }
}

/// Encoded size of a block holding just one record with these key and value
/// lengths: the count, one offset slot, and both length prefixes.
///
/// A record fits a block of target `t` on its own iff this is at most `t`.
#[must_use]
pub const fn single_record_block_size(key_len: usize, value_len: usize) -> usize {
    4 * SIZEOF_U16 + key_len + value_len
}
