/// Write path: `put()`, `delete()` and the freeze transition.
///
/// Mutations are applied to the current memtable under the shared lock.
/// When that leaves the memtable at or above the size limit, the writer
/// drops the shared lock and freezes the memtable under the exclusive lock.
use anyhow::Result;
use block::single_record_block_size;
use memtable::MemTable;
use std::sync::Arc;

use crate::{Generations, LsmStorageState, MAX_KEY_SIZE, MAX_VALUE_SIZE};

impl LsmStorageState {
    /// Inserts or overwrites `key`.
    ///
    /// # Errors
    ///
    /// Fails if the key is empty, or if the record would not fit a block of
    /// the configured `block_size` on its own.
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        check_key(key)?;
        anyhow::ensure!(
            value.len() <= MAX_VALUE_SIZE,
            "value too large: {} bytes (max {})",
            value.len(),
            MAX_VALUE_SIZE
        );
        self.check_fits_block(key.len(), value.len())?;

        self.write_current(|mem| mem.set(key, value));
        Ok(())
    }

    /// Deletes `key` by writing a tombstone to the current memtable.
    ///
    /// The tombstone shadows any value in older generations.
    ///
    /// # Errors
    ///
    /// Fails if the key is empty or too large for a block.
    pub fn delete(&self, key: &[u8]) -> Result<()> {
        check_key(key)?;
        self.check_fits_block(key.len(), 0)?;
        self.write_current(|mem| mem.delete(key));
        Ok(())
    }

    /// Moves the current memtable to the immutable list and installs a fresh
    /// one, whose id is the new length of the immutable list.
    pub fn freeze_current_memtable(&self) {
        let mut state = self.state.write();
        freeze(&mut state);
    }

    /// Every record must fit an empty block, or draining its memtable into an
    /// SSTable would fail.
    fn check_fits_block(&self, key_len: usize, value_len: usize) -> Result<()> {
        let size = single_record_block_size(key_len, value_len);
        anyhow::ensure!(
            size <= self.options.block_size,
            "record too large for a block: {} bytes (block size {})",
            size,
            self.options.block_size
        );
        Ok(())
    }

    /// Applies `op` to the current memtable and freezes it if it has grown
    /// past the limit.
    fn write_current<F>(&self, op: F)
    where
        F: FnOnce(&MemTable),
    {
        let full = {
            let state = self.state.read();
            op(&state.current);
            let size = state.current.approximate_size();
            (size >= self.options.memtable_size_limit).then(|| state.current.id())
        };

        if let Some(id) = full {
            self.freeze_if_current(id);
        }
    }

    /// Freezes memtable `id` unless another writer already did.
    ///
    /// Several writers may see the same memtable cross the limit before any
    /// of them gets the exclusive lock; only the first one freezes.
    fn freeze_if_current(&self, id: usize) {
        let mut state = self.state.write();
        if state.current.id() != id {
            tracing::trace!(id, "memtable already frozen by another writer");
            return;
        }
        freeze(&mut state);
    }
}

fn freeze(state: &mut Generations) {
    let next = Arc::new(MemTable::new(state.immutable.len() + 1));
    let frozen = std::mem::replace(&mut state.current, next);

    tracing::info!(
        frozen_id = frozen.id(),
        new_id = state.current.id(),
        approx_size = frozen.approximate_size(),
        entries = frozen.len(),
        immutable = state.immutable.len() + 1,
        "memtable frozen"
    );

    state.immutable.push(frozen);
}

fn check_key(key: &[u8]) -> Result<()> {
    anyhow::ensure!(!key.is_empty(), "key must not be empty");
    anyhow::ensure!(
        key.len() <= MAX_KEY_SIZE,
        "key too large: {} bytes (max {})",
        key.len(),
        MAX_KEY_SIZE
    );
    Ok(())
}
