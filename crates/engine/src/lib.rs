//! # Engine - LSM storage state
//!
//! Owns the in-memory generations of the LSM tree: exactly one *current*
//! [`MemTable`] that accepts writes, and a list of *immutable* memtables
//! that were frozen when they grew past the size limit and now wait to be
//! drained into SSTables.
//!
//! ## Architecture
//!
//! ```text
//! Client
//!   |
//!   v
//! ┌───────────────────────────────────────────────┐
//! │              LsmStorageState                  │
//! │                                               │
//! │ write.rs → current MemTable (shared lock)     │
//! │              |                                │
//! │              |  (approx size >= limit?)       │
//! │              |            yes                 │
//! │              v                                │
//! │           freeze (exclusive lock):            │
//! │           current → immutable, new current    │
//! │                                               │
//! │ read.rs → current → immutable newest-first    │
//! │            (first match wins)                 │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ## Module Responsibilities
//!
//! | Module      | Purpose                                                 |
//! |-------------|---------------------------------------------------------|
//! | [`lib.rs`]  | `LsmStorageState` struct, constructors, accessors, `Debug` |
//! | [`write`]   | `put()`, `delete()`, `freeze_current_memtable()`        |
//! | [`read`]    | `get()`, `memtables()`                                  |
//!
//! ## Locking
//!
//! A single reader-writer lock guards the pair (current, immutable). Writes
//! mutate the current memtable while holding only the shared lock, since the
//! memtable is itself safe for concurrent mutation. The exclusive lock is
//! taken only to splice the immutable list and swap in a new memtable; no
//! memtable contents are copied while it is held.
//!
//! ## Levels
//!
//! ```text
//! ┌────────────────────────────┐  ← freshest, checked first
//! │ CURRENT MEMTABLE           │
//! ├────────────────────────────┤  ← newest frozen first
//! │ IMMUTABLE MEMTABLES        │
//! ├────────────────────────────┤
//! │ SSTables (not wired yet)   │
//! └────────────────────────────┘
//! ```
mod read;
mod write;

use config::LsmOptions;
use memtable::MemTable;
use parking_lot::RwLock;
use std::sync::Arc;

pub use memtable::Record;

/// Maximum allowed key size in bytes. Keys must fit a block's 16-bit
/// length field.
pub const MAX_KEY_SIZE: usize = u16::MAX as usize;
/// Maximum allowed value size in bytes, for the same reason.
pub const MAX_VALUE_SIZE: usize = u16::MAX as usize;

/// The generations guarded by the state lock.
#[derive(Debug)]
struct Generations {
    current: Arc<MemTable>,
    /// Oldest first. Never written to again.
    immutable: Vec<Arc<MemTable>>,
}

/// In-memory state of the LSM tree.
///
/// # Write Path
///
/// 1. Validate the key and value.
/// 2. Apply the mutation to the current memtable under the shared lock.
/// 3. If its approximate size reached `memtable_size_limit`, freeze it.
///
/// # Read Path
///
/// 1. Check the current memtable.
/// 2. Check immutable memtables from newest to oldest.
/// 3. First match wins; a tombstone (empty value) shadows older values.
///
/// `LsmStorageState` is `Send + Sync`; share it with `Arc`.
pub struct LsmStorageState {
    state: RwLock<Generations>,
    options: LsmOptions,
}

impl std::fmt::Debug for LsmStorageState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("LsmStorageState")
            .field("memtable_size_limit", &self.options.memtable_size_limit)
            .field("current_memtable_id", &state.current.id())
            .field("current_memtable_size", &state.current.approximate_size())
            .field("current_memtable_entries", &state.current.len())
            .field("immutable_memtable_count", &state.immutable.len())
            .finish()
    }
}

impl LsmStorageState {
    /// Creates an empty state with memtable `0` as the current generation.
    pub fn new(options: LsmOptions) -> Self {
        Self {
            state: RwLock::new(Generations {
                current: Arc::new(MemTable::new(0)),
                immutable: Vec::new(),
            }),
            options,
        }
    }

    /// Default options with a custom memtable size limit. Mostly useful in
    /// tests.
    pub fn with_memtable_size_limit(limit: usize) -> Self {
        Self::new(LsmOptions::default().with_memtable_size_limit(limit))
    }

    #[must_use]
    pub fn options(&self) -> &LsmOptions {
        &self.options
    }

    /// Id of the memtable currently accepting writes.
    #[must_use]
    pub fn current_memtable_id(&self) -> usize {
        self.state.read().current.id()
    }

    /// Approximate size of the current memtable.
    #[must_use]
    pub fn current_memtable_size(&self) -> usize {
        self.state.read().current.approximate_size()
    }

    /// Number of frozen memtables waiting to be drained.
    #[must_use]
    pub fn immutable_count(&self) -> usize {
        self.state.read().immutable.len()
    }

    /// Frozen memtables, oldest first.
    #[must_use]
    pub fn immutable_memtables(&self) -> Vec<Arc<MemTable>> {
        self.state.read().immutable.clone()
    }
}

impl Default for LsmStorageState {
    fn default() -> Self {
        Self::new(LsmOptions::default())
    }
}

#[cfg(test)]
mod tests;
