use byteorder::{BigEndian, ByteOrder};
use std::ops::Range;

use crate::error::BlockError;

/// Width of every length, offset and count field in a block.
pub const SIZEOF_U16: usize = std::mem::size_of::<u16>();

/// Largest target size a block may be built with. Offsets and lengths are
/// 16-bit, so anything above this would silently wrap.
pub const MAX_BLOCK_SIZE: usize = u16::MAX as usize;

/// A decoded block: concatenated records plus the start offset of each one.
///
/// Blocks are produced by [`BlockBuilder::build`](crate::BlockBuilder::build)
/// or [`Block::decode`] and are never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Block {
    pub(crate) data: Vec<u8>,
    pub(crate) offsets: Vec<u16>,
}

impl Block {
    /// Serializes the block as `data || offsets || count`.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        buf.extend_from_slice(&self.data);

        let mut pos = buf.len();
        buf.resize(self.encoded_len(), 0);
        for offset in &self.offsets {
            BigEndian::write_u16(&mut buf[pos..pos + SIZEOF_U16], *offset);
            pos += SIZEOF_U16;
        }
        BigEndian::write_u16(&mut buf[pos..], self.offsets.len() as u16);

        buf
    }

    /// Parses an encoded block.
    ///
    /// Only the framing is checked here: the count, the offset table, that
    /// offsets never decrease, and that every offset lands inside the data
    /// section. Records themselves
    /// are parsed on access, so a damaged record fails the read that touches
    /// it. Call [`validate`](Block::validate) to check every record up front.
    ///
    /// # Errors
    ///
    /// Returns a [`BlockError`] if the buffer is shorter than the count
    /// field, if the offset table does not fit, if the offsets decrease, or
    /// if an offset points past the data section.
    pub fn decode(bytes: &[u8]) -> Result<Self, BlockError> {
        if bytes.len() < SIZEOF_U16 {
            return Err(BlockError::TooSmall { len: bytes.len() });
        }

        let count = BigEndian::read_u16(&bytes[bytes.len() - SIZEOF_U16..]) as usize;
        let trailer = SIZEOF_U16 + count * SIZEOF_U16;
        if trailer > bytes.len() {
            return Err(BlockError::OffsetTableOverrun {
                count,
                len: bytes.len(),
            });
        }
        let data_len = bytes.len() - trailer;

        let offsets: Vec<u16> = bytes[data_len..bytes.len() - SIZEOF_U16]
            .chunks_exact(SIZEOF_U16)
            .map(BigEndian::read_u16)
            .collect();

        if let Some(idx) = offsets.windows(2).position(|w| w[1] < w[0]) {
            return Err(BlockError::UnorderedOffsets {
                idx: idx + 1,
                offset: offsets[idx + 1] as usize,
                prev: offsets[idx] as usize,
            });
        }
        if let Some(&bad) = offsets.iter().find(|&&o| o as usize >= data_len) {
            return Err(BlockError::InvalidOffset {
                offset: bad as usize,
                data_len,
            });
        }

        Ok(Self {
            data: bytes[..data_len].to_vec(),
            offsets,
        })
    }

    /// Parses every record, returning the first failure.
    ///
    /// # Errors
    ///
    /// Returns a [`BlockError`] describing the first truncated record.
    pub fn validate(&self) -> Result<(), BlockError> {
        for idx in 0..self.len() {
            self.entry(idx)?;
        }
        Ok(())
    }

    /// Number of records in the block.
    #[must_use]
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    /// Returns `true` for a block with no records, such as the output of an
    /// unused builder.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Raw record bytes.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Start offset of each record within [`data`](Block::data).
    #[must_use]
    pub fn offsets(&self) -> &[u16] {
        &self.offsets
    }

    /// Size of [`encode`](Block::encode)'s output in bytes.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        self.data.len() + self.offsets.len() * SIZEOF_U16 + SIZEOF_U16
    }

    /// Returns the key and value of record `idx`.
    ///
    /// # Errors
    ///
    /// Returns a [`BlockError`] if the record is truncated.
    ///
    /// # Panics
    ///
    /// Panics if `idx >= self.len()`.
    pub fn entry(&self, idx: usize) -> Result<(&[u8], &[u8]), BlockError> {
        let (key, value) = entry_ranges(&self.data, self.offsets[idx] as usize)?;
        Ok((&self.data[key], &self.data[value]))
    }

    /// Key of the first record, or `None` for an empty block.
    ///
    /// # Errors
    ///
    /// Returns a [`BlockError`] if the first record is truncated.
    pub fn first_key(&self) -> Result<Option<&[u8]>, BlockError> {
        if self.is_empty() {
            return Ok(None);
        }
        let (key, _) = self.entry(0)?;
        Ok(Some(key))
    }
}

/// Locates the key and value of the record starting at `offset` in `data`.
pub(crate) fn entry_ranges(
    data: &[u8],
    offset: usize,
) -> Result<(Range<usize>, Range<usize>), BlockError> {
    if offset >= data.len() {
        return Err(BlockError::InvalidOffset {
            offset,
            data_len: data.len(),
        });
    }

    let mut pos = offset;
    let key_len = read_len(data, pos, "key length", offset)?;
    pos += SIZEOF_U16;
    if data.len() - pos < key_len {
        return Err(BlockError::Truncated {
            offset,
            what: "key",
        });
    }
    let key = pos..pos + key_len;
    pos += key_len;

    let value_len = read_len(data, pos, "value length", offset)?;
    pos += SIZEOF_U16;
    if data.len() - pos < value_len {
        return Err(BlockError::Truncated {
            offset,
            what: "value",
        });
    }
    let value = pos..pos + value_len;

    Ok((key, value))
}

fn read_len(
    data: &[u8],
    pos: usize,
    what: &'static str,
    offset: usize,
) -> Result<usize, BlockError> {
    if data.len() - pos < SIZEOF_U16 {
        return Err(BlockError::Truncated { offset, what });
    }
    Ok(BigEndian::read_u16(&data[pos..pos + SIZEOF_U16]) as usize)
}
