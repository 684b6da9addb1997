//! # SSTable - Sorted String Table
//!
//! Immutable, on-disk sorted runs. A frozen [`memtable::MemTable`] (or the
//! output of a future merge) is fed in key order to an [`SsTableBuilder`],
//! which packs the records into [`block::Block`]s and writes them out
//! together with a per-block key-range index.
//!
//! ## File layout
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │ BLOCKS (encoded block::Block, back to back)                   │
//! │                                                               │
//! │ block_0 | block_1 | ... | block_k                             │
//! ├───────────────────────────────────────────────────────────────┤
//! │ META (one entry per block)                                    │
//! │                                                               │
//! │ num_blocks (u32)                                              │
//! │ block_offset (u32) | first_key_len (u16) | first_key          │
//! │                    | last_key_len (u16)  | last_key           │
//! │ ... repeated for each block ...                               │
//! ├───────────────────────────────────────────────────────────────┤
//! │ FOOTER (always last 4 bytes)                                  │
//! │                                                               │
//! │ meta_offset (u32)                                             │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! All integers are big-endian. There is no magic number or version: the
//! layout is fixed.
//!
//! `block_offset` is measured from the start of the file; a block ends where
//! the next one starts, and the last block ends at `meta_offset`. The first
//! and last key of each block let a catalog prune tables and blocks by key
//! range without reading them.

mod builder;
mod format;
mod table;

pub use builder::{write_from_memtable, SsTableBuilder};
pub use format::{
    decode_block_meta, encode_block_meta, read_footer, write_footer, BlockMeta, FormatError,
    FOOTER_BYTES,
};
pub use table::SsTable;

#[cfg(test)]
mod tests;
