//! Block metadata section and footer codecs.
//!
//! ## Metadata section
//!
//! ```text
//! [num_blocks: u32 BE]
//! repeated num_blocks times:
//!   [block_offset: u32 BE][first_key_len: u16 BE][first_key][last_key_len: u16 BE][last_key]
//! ```
//!
//! ## Footer (4 bytes)
//!
//! ```text
//! [meta_offset: u32 BE]
//! ```
//!
//! The footer is always the last 4 bytes of the file and points at the start
//! of the metadata section, which immediately follows the last block.

use byteorder::{BigEndian, ByteOrder, ReadBytesExt, WriteBytesExt};
use bytes::Bytes;
use std::io::{self, Cursor, Read, Write};
use thiserror::Error;

/// Size of the footer in bytes: a single `u32` metadata offset.
pub const FOOTER_BYTES: usize = 4;

/// Smallest possible encoded metadata entry: offset + two empty key lengths.
const MIN_META_ENTRY_BYTES: usize = 4 + 2 + 2;

/// Location and key range of one block inside an SSTable.
///
/// `first_key` and `last_key` are the literal first and last keys stored in
/// the block, so the blocks of a run form a binary-searchable key range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockMeta {
    /// Byte offset of the encoded block from the start of the file.
    pub offset: u32,
    pub first_key: Bytes,
    pub last_key: Bytes,
}

/// Errors raised while decoding the metadata section or footer.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("sstable too small: {len} bytes")]
    TooSmall { len: usize },

    #[error("metadata offset {offset} out of range (file is {len} bytes)")]
    InvalidMetaOffset { offset: u32, len: usize },

    #[error("truncated block metadata: failed to read {what}")]
    Truncated {
        what: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("{0} trailing bytes after block metadata")]
    TrailingBytes(usize),
}

/// Appends the encoded metadata section for `metas` to `w`.
///
/// # Errors
///
/// Fails with [`io::ErrorKind::InvalidInput`] if there are more than
/// `u32::MAX` entries or a key is longer than `u16::MAX` bytes, and
/// otherwise propagates write errors.
pub fn encode_block_meta<W: Write>(w: &mut W, metas: &[BlockMeta]) -> io::Result<()> {
    let count = u32::try_from(metas.len())
        .map_err(|_| invalid_input(format!("too many blocks: {}", metas.len())))?;
    w.write_u32::<BigEndian>(count)?;
    for meta in metas {
        w.write_u32::<BigEndian>(meta.offset)?;
        write_key(w, &meta.first_key, "first key")?;
        write_key(w, &meta.last_key, "last key")?;
    }
    Ok(())
}

fn write_key<W: Write>(w: &mut W, key: &[u8], what: &str) -> io::Result<()> {
    let len = u16::try_from(key.len())
        .map_err(|_| invalid_input(format!("{} too long: {} bytes", what, key.len())))?;
    w.write_u16::<BigEndian>(len)?;
    w.write_all(key)
}

fn invalid_input(msg: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, msg)
}

/// Parses a metadata section. The whole of `buf` must be consumed.
pub fn decode_block_meta(buf: &[u8]) -> Result<Vec<BlockMeta>, FormatError> {
    let mut cur = Cursor::new(buf);

    let count = cur
        .read_u32::<BigEndian>()
        .map_err(|source| FormatError::Truncated {
            what: "block count",
            source,
        })? as usize;

    // Don't trust `count` for the allocation; a corrupt value would OOM.
    let mut metas = Vec::with_capacity(count.min(buf.len() / MIN_META_ENTRY_BYTES));
    for _ in 0..count {
        let offset = cur
            .read_u32::<BigEndian>()
            .map_err(|source| FormatError::Truncated {
                what: "block offset",
                source,
            })?;
        let first_key = read_key(&mut cur, "first key")?;
        let last_key = read_key(&mut cur, "last key")?;
        metas.push(BlockMeta {
            offset,
            first_key,
            last_key,
        });
    }

    let trailing = buf.len() - cur.position() as usize;
    if trailing != 0 {
        return Err(FormatError::TrailingBytes(trailing));
    }
    Ok(metas)
}

fn read_key(cur: &mut Cursor<&[u8]>, what: &'static str) -> Result<Bytes, FormatError> {
    let len = cur
        .read_u16::<BigEndian>()
        .map_err(|source| FormatError::Truncated { what, source })? as usize;
    let mut key = vec![0u8; len];
    cur.read_exact(&mut key)
        .map_err(|source| FormatError::Truncated { what, source })?;
    Ok(Bytes::from(key))
}

/// Writes the footer pointing at `meta_offset`.
pub fn write_footer<W: Write>(w: &mut W, meta_offset: u32) -> io::Result<()> {
    w.write_u32::<BigEndian>(meta_offset)
}

/// Parses `footer`, the last [`FOOTER_BYTES`] of a `file_len`-byte file,
/// and checks that the offset leaves room for at least the block count.
pub fn read_footer(file_len: usize, footer: &[u8; FOOTER_BYTES]) -> Result<u32, FormatError> {
    if file_len < FOOTER_BYTES + 4 {
        return Err(FormatError::TooSmall { len: file_len });
    }
    let offset = BigEndian::read_u32(footer);
    if offset as usize > file_len - FOOTER_BYTES - 4 {
        return Err(FormatError::InvalidMetaOffset {
            offset,
            len: file_len,
        });
    }
    Ok(offset)
}
