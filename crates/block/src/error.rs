use thiserror::Error;

/// Errors raised while decoding a block or one of its records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlockError {
    /// The buffer is too short to hold even the trailing record count.
    #[error("block too small: {len} bytes")]
    TooSmall { len: usize },

    /// The record count claims more offsets than the buffer can hold.
    #[error("block offset table overruns buffer: {count} offsets in {len} bytes")]
    OffsetTableOverrun { count: usize, len: usize },

    /// An offset points at or past the end of the data section.
    #[error("invalid data offset {offset} (data is {data_len} bytes)")]
    InvalidOffset { offset: usize, data_len: usize },

    /// Offsets must not decrease; records are stored in insertion order.
    #[error("block offsets out of order: offset {idx} is {offset}, previous is {prev}")]
    UnorderedOffsets { idx: usize, offset: usize, prev: usize },

    /// A record ended before its key or value was complete.
    #[error("truncated record at offset {offset}: {what}")]
    Truncated { offset: usize, what: &'static str },
}
