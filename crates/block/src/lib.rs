//! # Block - the unit of SSTable storage
//!
//! A block is a small page of sorted key/value records followed by an offset
//! index. SSTables are a concatenation of encoded blocks plus a metadata
//! section describing each block's key range.
//!
//! ## Byte layout
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ DATA SECTION (records, in insertion = key order)             │
//! │                                                              │
//! │ key_len (u16) | key | value_len (u16) | value                │
//! │                                                              │
//! │ ... repeated for each record ...                             │
//! ├──────────────────────────────────────────────────────────────┤
//! │ OFFSETS (start of each record within DATA)                   │
//! │                                                              │
//! │ offset_0 (u16) | offset_1 (u16) | ... | offset_{n-1} (u16)   │
//! ├──────────────────────────────────────────────────────────────┤
//! │ COUNT                                                        │
//! │                                                              │
//! │ n (u16)                                                      │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! All integers are big-endian. There is no magic or version field: the
//! layout is fixed. Because offsets and lengths are 16-bit, a block's data
//! section and record count are both bounded by 65 535, which is why
//! [`BlockBuilder::new`] refuses target sizes above [`MAX_BLOCK_SIZE`].
//!
//! An empty value is legal and is how a deletion (tombstone) is written.
//!
//! ## Example
//!
//! ```rust
//! use block::{Block, BlockBuilder, BlockIterator};
//!
//! let mut builder = BlockBuilder::new(4096);
//! assert!(builder.add(b"apple", b"red"));
//! assert!(builder.add(b"banana", b"yellow"));
//! let block = builder.build();
//!
//! let bytes = block.encode();
//! let decoded = Block::decode(&bytes).unwrap();
//! assert_eq!(block, decoded);
//!
//! let mut it = BlockIterator::new(&decoded);
//! it.seek(b"banana");
//! assert!(it.is_valid());
//! assert_eq!(it.value(), b"yellow");
//! ```

mod block;
mod builder;
mod error;
mod iterator;

pub use block::{Block, MAX_BLOCK_SIZE, SIZEOF_U16};
pub use builder::{single_record_block_size, BlockBuilder};
pub use error::BlockError;
pub use iterator::BlockIterator;

#[cfg(test)]
mod tests;
