//! # Memtable - one in-memory write generation
//!
//! Every write lands in the *current* memtable first. Once its approximate
//! size crosses the configured limit the storage state freezes it (it stops
//! accepting writes) and installs a fresh one; frozen memtables are the
//! input a flush pipeline turns into SSTables.
//!
//! The table is a lock-free skip list, so `set`, `delete` and `get` all take
//! `&self` and may be called from many threads at once. Atomicity across an
//! insert *and* the size check that follows it is not provided here; the
//! storage state coordinates that.
//!
//! ## Tombstones
//!
//! A delete stores the key with an empty value. At this layer a tombstone is
//! physically the same as inserting an empty value.

use bytes::Bytes;
use crossbeam_skiplist::SkipMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Reference size limit for a single memtable (64 MiB).
pub const MEMTABLE_MAX_SIZE_BYTES: usize = 64 << 20;

/// A key and its most recent value. An empty value marks a deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub key: Bytes,
    pub value: Bytes,
}

impl Record {
    pub fn new(key: impl Into<Bytes>, value: impl Into<Bytes>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Returns `true` if the record carries no data, which is how deletes
    /// are written.
    #[must_use]
    pub fn is_tombstone(&self) -> bool {
        self.value.is_empty()
    }
}

/// Ordered, concurrently writable table for a single generation.
#[derive(Debug)]
pub struct MemTable {
    id: usize,
    map: SkipMap<Bytes, Bytes>,
    /// Sum of key + value bytes passed to `set`/`delete`. Only ever grows:
    /// overwrites and deletes are not subtracted.
    approx_size: AtomicUsize,
}

impl MemTable {
    pub fn new(id: usize) -> Self {
        Self {
            id,
            map: SkipMap::new(),
            approx_size: AtomicUsize::new(0),
        }
    }

    /// Generation id. Ids increase with freeze order.
    #[must_use]
    pub fn id(&self) -> usize {
        self.id
    }

    /// Inserts or replaces `key`. The last write wins.
    pub fn set(&self, key: &[u8], value: &[u8]) {
        self.set_record(Record::new(
            Bytes::copy_from_slice(key),
            Bytes::copy_from_slice(value),
        ));
    }

    /// Same as [`set`](MemTable::set) for an already owned record.
    pub fn set_record(&self, record: Record) {
        self.approx_size
            .fetch_add(record.key.len() + record.value.len(), Ordering::Relaxed);
        self.map.insert(record.key, record.value);
    }

    /// Writes a tombstone for `key`.
    pub fn delete(&self, key: &[u8]) {
        self.approx_size.fetch_add(key.len(), Ordering::Relaxed);
        self.map.insert(Bytes::copy_from_slice(key), Bytes::new());
    }

    /// Exact-key lookup. A tombstone is returned as a record with an empty
    /// value; `None` means this generation never saw the key.
    #[must_use]
    pub fn get(&self, key: &[u8]) -> Option<Record> {
        self.map.get(key).map(|e| Record {
            key: e.key().clone(),
            value: e.value().clone(),
        })
    }

    /// Upper-bound estimate of the bytes written into this generation.
    #[must_use]
    pub fn approximate_size(&self) -> usize {
        self.approx_size.load(Ordering::Relaxed)
    }

    /// Number of distinct keys, tombstones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Records in ascending key order, tombstones included.
    pub fn iter(&self) -> impl Iterator<Item = Record> + '_ {
        self.map.iter().map(|e| Record {
            key: e.key().clone(),
            value: e.value().clone(),
        })
    }
}
