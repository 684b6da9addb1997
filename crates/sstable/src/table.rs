use anyhow::{bail, ensure, Context, Result};
use block::{Block, BlockIterator};
use bytes::Bytes;
use parking_lot::Mutex;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::format::{decode_block_meta, read_footer, BlockMeta, FOOTER_BYTES};

/// Handle to an immutable SSTable on disk.
///
/// Only the footer and the metadata section are loaded; blocks are read and
/// decoded on demand by [`read_block`](SsTable::read_block), so a damaged
/// block fails only the read that touches it.
///
/// The file handle is owned by the table and closed when it is dropped. It
/// sits behind a mutex so reads can go through `&self`.
#[derive(Debug)]
pub struct SsTable {
    /// Assigned by whoever catalogs the table, never by the builder.
    id: Option<u64>,
    path: PathBuf,
    file: Mutex<File>,
    block_meta: Vec<BlockMeta>,
    block_meta_offset: u32,
    first_key: Bytes,
    last_key: Bytes,
    file_size: u64,
}

impl SsTable {
    /// Opens an SSTable written by [`SsTableBuilder`](crate::SsTableBuilder).
    ///
    /// # Validation
    ///
    /// - The file must hold at least a footer and a block count.
    /// - The footer must point inside the file.
    /// - The metadata section must decode completely and describe at least
    ///   one block, with offsets increasing from 0 and below the metadata.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the above fails or on I/O failure.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut file =
            File::open(path).with_context(|| format!("failed to open sstable {}", path.display()))?;
        let file_size = file.metadata()?.len();
        let file_len = usize::try_from(file_size).context("sstable too large to map")?;

        if file_len < FOOTER_BYTES {
            bail!("sstable file too small: {} bytes", file_len);
        }
        let mut footer = [0u8; FOOTER_BYTES];
        file.seek(SeekFrom::End(-(FOOTER_BYTES as i64)))?;
        file.read_exact(&mut footer)?;
        let meta_offset = read_footer(file_len, &footer)?;

        let mut meta_buf = vec![0u8; file_len - FOOTER_BYTES - meta_offset as usize];
        file.seek(SeekFrom::Start(u64::from(meta_offset)))?;
        file.read_exact(&mut meta_buf)?;
        let block_meta = decode_block_meta(&meta_buf)
            .with_context(|| format!("corrupt block metadata in {}", path.display()))?;

        ensure!(!block_meta.is_empty(), "sstable has no blocks");
        ensure!(
            block_meta[0].offset == 0,
            "first block starts at {}, expected 0",
            block_meta[0].offset
        );
        for pair in block_meta.windows(2) {
            ensure!(
                pair[0].offset < pair[1].offset,
                "block offsets not increasing: {} then {}",
                pair[0].offset,
                pair[1].offset
            );
        }
        if let Some(last) = block_meta.last() {
            ensure!(
                last.offset < meta_offset,
                "block offset {} overlaps metadata at {}",
                last.offset,
                meta_offset
            );
        }

        tracing::debug!(
            path = %path.display(),
            blocks = block_meta.len(),
            bytes = file_size,
            "sstable opened"
        );

        Self::new(path, file, block_meta, meta_offset, file_size)
    }

    /// Builds the handle for a file the builder has just written.
    pub(crate) fn from_parts(
        path: &Path,
        block_meta: Vec<BlockMeta>,
        block_meta_offset: u32,
        file_size: u64,
    ) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to reopen sstable {}", path.display()))?;
        Self::new(path, file, block_meta, block_meta_offset, file_size)
    }

    fn new(
        path: &Path,
        file: File,
        block_meta: Vec<BlockMeta>,
        block_meta_offset: u32,
        file_size: u64,
    ) -> Result<Self> {
        let (Some(first), Some(last)) = (block_meta.first(), block_meta.last()) else {
            bail!("sstable has no blocks");
        };
        let first_key = first.first_key.clone();
        let last_key = last.last_key.clone();

        Ok(Self {
            id: None,
            path: path.to_path_buf(),
            file: Mutex::new(file),
            block_meta,
            block_meta_offset,
            first_key,
            last_key,
            file_size,
        })
    }

    /// Catalog id, if one has been assigned.
    #[must_use]
    pub fn id(&self) -> Option<u64> {
        self.id
    }

    pub fn set_id(&mut self, id: u64) {
        self.id = Some(id);
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Per-block offsets and key ranges, in file order.
    #[must_use]
    pub fn block_meta(&self) -> &[BlockMeta] {
        &self.block_meta
    }

    /// Byte offset where the metadata section starts.
    #[must_use]
    pub fn block_meta_offset(&self) -> u32 {
        self.block_meta_offset
    }

    #[must_use]
    pub fn num_blocks(&self) -> usize {
        self.block_meta.len()
    }

    /// Smallest key in the table.
    #[must_use]
    pub fn first_key(&self) -> &[u8] {
        &self.first_key
    }

    /// Largest key in the table.
    #[must_use]
    pub fn last_key(&self) -> &[u8] {
        &self.last_key
    }

    #[must_use]
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Reads and decodes block `idx`, checking every record.
    ///
    /// # Errors
    ///
    /// Returns an error if `idx` is out of range, on I/O failure, or if the
    /// block's bytes do not decode.
    pub fn read_block(&self, idx: usize) -> Result<Block> {
        ensure!(
            idx < self.block_meta.len(),
            "block index {} out of range ({} blocks)",
            idx,
            self.block_meta.len()
        );
        let start = self.block_meta[idx].offset;
        let end = self
            .block_meta
            .get(idx + 1)
            .map_or(self.block_meta_offset, |m| m.offset);

        let mut buf = vec![0u8; (end - start) as usize];
        {
            let mut file = self.file.lock();
            file.seek(SeekFrom::Start(u64::from(start)))?;
            file.read_exact(&mut buf)?;
        }

        let block = Block::decode(&buf)
            .and_then(|b| b.validate().map(|()| b))
            .with_context(|| format!("corrupt block {} in {}", idx, self.path.display()))?;
        Ok(block)
    }

    /// Returns an iterator positioned at the first record of block `idx`.
    ///
    /// # Errors
    ///
    /// Same as [`read_block`](SsTable::read_block).
    pub fn iter_block(&self, idx: usize) -> Result<BlockIterator> {
        Ok(BlockIterator::new(&self.read_block(idx)?))
    }
}
