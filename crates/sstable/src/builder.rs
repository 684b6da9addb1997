use anyhow::{bail, ensure, Context, Result};
use block::{single_record_block_size, BlockBuilder};
use bytes::Bytes;
use memtable::MemTable;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::format::{encode_block_meta, write_footer, BlockMeta};
use crate::table::SsTable;

/// Packs sorted key/value pairs into blocks and writes them as one SSTable.
///
/// Records must be added in ascending key order; the builder does not sort
/// or deduplicate. Each time the active [`BlockBuilder`] rejects a record the
/// block is finished, its key range recorded as a [`BlockMeta`], and a fresh
/// builder started.
///
/// The run is assembled in memory and written in one go by
/// [`build`](SsTableBuilder::build).
pub struct SsTableBuilder {
    builder: BlockBuilder,
    block_size: usize,
    /// First key added since the last finished block.
    first_key: Option<Bytes>,
    /// Encoded blocks finished so far.
    data: Vec<u8>,
    metas: Vec<BlockMeta>,
}

impl SsTableBuilder {
    /// Creates a builder whose blocks target `block_size` encoded bytes.
    ///
    /// # Panics
    ///
    /// Panics if `block_size` is not a valid block target size
    /// (see [`BlockBuilder::new`]).
    pub fn new(block_size: usize) -> Self {
        Self {
            builder: BlockBuilder::new(block_size),
            block_size,
            first_key: None,
            data: Vec::new(),
            metas: Vec::new(),
        }
    }

    /// Appends a record, rolling over to a new block when the current one is
    /// full.
    ///
    /// # Panics
    ///
    /// Panics if `key` is empty, or if the record would not fit even an
    /// empty block of the configured size. Both indicate a caller bug or a
    /// block size too small for the data, not a runtime condition.
    pub fn add(&mut self, key: &[u8], value: &[u8]) {
        assert!(!key.is_empty(), "key must not be empty");

        let record_size = single_record_block_size(key.len(), value.len());
        assert!(
            record_size <= self.block_size,
            "key-value pair too large for a block: {} bytes (block size {})",
            record_size,
            self.block_size
        );

        if !self.builder.add(key, value) {
            self.finish_block();
            let accepted = self.builder.add(key, value);
            debug_assert!(accepted, "an empty block builder accepts any record");
        }

        if self.first_key.is_none() {
            self.first_key = Some(Bytes::copy_from_slice(key));
        }
    }

    /// Seals the active block: encodes it, appends it to the run, and records
    /// its offset and key range. Does nothing if the block is empty.
    ///
    /// # Panics
    ///
    /// Panics if the run grows past what a 32-bit offset can address.
    pub fn finish_block(&mut self) {
        if self.builder.is_empty() {
            return;
        }

        let builder = std::mem::replace(&mut self.builder, BlockBuilder::new(self.block_size));
        let last_key = Bytes::copy_from_slice(builder.last_key().unwrap_or_default());
        let first_key = self.first_key.take().unwrap_or_else(|| last_key.clone());

        assert!(
            self.data.len() <= u32::MAX as usize,
            "sstable too large: block offset {} exceeds u32",
            self.data.len()
        );
        let offset = self.data.len() as u32;

        let block = builder.build();
        self.data.extend_from_slice(&block.encode());

        tracing::trace!(offset, records = block.len(), "finished sstable block");

        self.metas.push(BlockMeta {
            offset,
            first_key,
            last_key,
        });
    }

    /// Bytes of finished blocks accumulated so far.
    #[must_use]
    pub fn estimated_size(&self) -> usize {
        self.data.len()
    }

    /// Metadata for the blocks finished so far.
    #[must_use]
    pub fn block_meta(&self) -> &[BlockMeta] {
        &self.metas
    }

    /// Returns `true` if nothing has been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.metas.is_empty() && self.builder.is_empty()
    }

    /// Finishes the pending block and writes the SSTable to `path`.
    ///
    /// # File Layout
    ///
    /// ```text
    /// [BLOCKS] block_0 | block_1 | ... | block_k
    /// [META]   num_blocks(u32) | { offset(u32) | first_key_len(u16) | first_key | last_key_len(u16) | last_key }*
    /// [FOOTER] meta_offset(u32)
    /// ```
    ///
    /// # Durability
    ///
    /// The file is written to `<path>.tmp`, fsynced, and atomically renamed
    /// into place. The returned handle exists only after the write and sync
    /// both succeeded; on failure the temp file is removed.
    ///
    /// # Errors
    ///
    /// Returns an error if no record was ever added (an empty run is not
    /// written) or on any I/O failure.
    pub fn build<P: AsRef<Path>>(mut self, path: P) -> Result<SsTable> {
        let path = path.as_ref();
        self.finish_block();

        if self.metas.is_empty() {
            bail!("refusing to write an empty SSTable (no blocks)");
        }

        let meta_offset = u32::try_from(self.data.len())
            .with_context(|| format!("sstable data section too large: {} bytes", self.data.len()))?;

        let mut buf = self.data;
        encode_block_meta(&mut buf, &self.metas)?;
        write_footer(&mut buf, meta_offset)?;

        write_durably(path, &buf)
            .with_context(|| format!("failed to write sstable {}", path.display()))?;

        tracing::info!(
            path = %path.display(),
            blocks = self.metas.len(),
            bytes = buf.len(),
            "sstable built"
        );

        SsTable::from_parts(path, self.metas, meta_offset, buf.len() as u64)
    }
}

/// Writes every record of `mem`, tombstones included, to a new SSTable.
///
/// This is the drain step of a flush: callers hand it a frozen memtable
/// outside any state lock.
///
/// # Errors
///
/// Returns an error if the memtable is empty, if a record does not fit a
/// block of `block_size` on its own, or on I/O failure. No file is written
/// in the first two cases.
pub fn write_from_memtable<P: AsRef<Path>>(
    path: P,
    mem: &MemTable,
    block_size: usize,
) -> Result<SsTable> {
    if mem.is_empty() {
        bail!("refusing to write an empty SSTable (empty memtable)");
    }
    let mut builder = SsTableBuilder::new(block_size);
    for record in mem.iter() {
        let record_size = single_record_block_size(record.key.len(), record.value.len());
        ensure!(
            record_size <= block_size,
            "record for key of {} bytes too large for a block: {} bytes (block size {})",
            record.key.len(),
            record_size,
            block_size
        );
        builder.add(&record.key, &record.value);
    }
    builder.build(path)
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

fn write_durably(path: &Path, buf: &[u8]) -> Result<()> {
    let tmp = tmp_path(path);
    let result = (|| -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp)?;
        file.write_all(buf)?;
        file.flush()?;
        file.sync_all()?;
        fs::rename(&tmp, path)?;
        Ok(())
    })();

    if let Err(e) = result {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }

    // Make the rename itself durable. Directories can't be opened for sync
    // on every platform, so this is best-effort.
    if let Some(parent) = path.parent() {
        if let Ok(dir) = File::open(parent) {
            let _ = dir.sync_all();
        }
    }
    Ok(())
}
