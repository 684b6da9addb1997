/// Read path: `get()` and the generation snapshot it scans.
///
/// Point lookups check the current memtable first, then immutable memtables
/// newest-first. The first generation that holds the key wins, so a newer
/// value or tombstone always shadows an older one.
use bytes::Bytes;
use memtable::MemTable;
use std::sync::Arc;

use crate::LsmStorageState;

impl LsmStorageState {
    /// Looks up `key`, returning the value from the newest generation that
    /// holds it.
    ///
    /// A deleted key comes back as `Some` of an empty value: at this layer a
    /// tombstone and an empty insert are the same record. `None` means no
    /// in-memory generation has seen the key.
    ///
    /// SSTables are not consulted.
    #[must_use]
    pub fn get(&self, key: &[u8]) -> Option<Bytes> {
        self.memtables()
            .iter()
            .find_map(|mem| mem.get(key))
            .map(|record| record.value)
    }

    /// Snapshot of every generation in read order: the current memtable
    /// followed by the immutable ones, newest first.
    ///
    /// The lock is held only while the handles are cloned, so a freeze that
    /// happens during a lookup does not block it.
    #[must_use]
    pub fn memtables(&self) -> Vec<Arc<MemTable>> {
        let state = self.state.read();
        let mut tables = Vec::with_capacity(state.immutable.len() + 1);
        tables.push(Arc::clone(&state.current));
        tables.extend(state.immutable.iter().rev().cloned());
        tables
    }
}
