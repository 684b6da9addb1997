//! # Config - tuning knobs for the LSM write path
//!
//! [`LsmOptions`] carries the memtable size limit that triggers a freeze, the
//! target size of SSTable blocks, and the directory SSTable files are
//! written to. Values come from [`Default`] or from the environment:
//!
//! ```text
//! MINILSM_MEMTABLE_KB   memtable size limit in KiB  (default: 65536 = 64 MiB)
//! MINILSM_BLOCK_SIZE    block target size in bytes  (default: 4096)
//! MINILSM_SST_DIR       SSTable directory           (default: "data/sst")
//! ```

use anyhow::{ensure, Result};
use std::path::PathBuf;

/// Default memtable size limit (64 MiB).
pub const DEFAULT_MEMTABLE_SIZE_LIMIT: usize = 64 << 20;
/// Default SSTable block target size (4 KiB).
pub const DEFAULT_BLOCK_SIZE: usize = 4096;
/// Largest block size the 16-bit block format can address.
pub const MAX_BLOCK_SIZE: usize = u16::MAX as usize;
/// Default directory for SSTable files.
pub const DEFAULT_SST_DIR: &str = "data/sst";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LsmOptions {
    /// Approximate byte size at which the current memtable is frozen.
    pub memtable_size_limit: usize,
    /// Target encoded size of each SSTable block.
    pub block_size: usize,
    /// Where SSTable files are written.
    pub sst_dir: PathBuf,
}

impl Default for LsmOptions {
    fn default() -> Self {
        Self {
            memtable_size_limit: DEFAULT_MEMTABLE_SIZE_LIMIT,
            block_size: DEFAULT_BLOCK_SIZE,
            sst_dir: PathBuf::from(DEFAULT_SST_DIR),
        }
    }
}

impl LsmOptions {
    /// Reads options from the process environment.
    ///
    /// Missing or unparsable variables fall back to their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the resulting options fail [`validate`](LsmOptions::validate).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](LsmOptions::from_env), reading variables through
    /// `lookup` instead of the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let memtable_size_limit = lookup("MINILSM_MEMTABLE_KB")
            .and_then(|v| v.trim().parse::<usize>().ok())
            .map(|kb| kb.saturating_mul(1024))
            .unwrap_or(defaults.memtable_size_limit);
        let block_size = lookup("MINILSM_BLOCK_SIZE")
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(defaults.block_size);
        let sst_dir = lookup("MINILSM_SST_DIR")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.sst_dir);

        let opts = Self {
            memtable_size_limit,
            block_size,
            sst_dir,
        };
        opts.validate()?;
        Ok(opts)
    }

    /// Checks that the options describe a usable configuration.
    ///
    /// # Errors
    ///
    /// Fails if the memtable limit is zero, or if the block size is zero or
    /// too large for 16-bit block offsets.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.memtable_size_limit > 0,
            "memtable size limit must be positive"
        );
        ensure!(self.block_size > 0, "block size must be positive");
        ensure!(
            self.block_size <= MAX_BLOCK_SIZE,
            "block size {} exceeds maximum {}",
            self.block_size,
            MAX_BLOCK_SIZE
        );
        Ok(())
    }

    /// Returns a copy with a different memtable size limit.
    #[must_use]
    pub fn with_memtable_size_limit(mut self, limit: usize) -> Self {
        self.memtable_size_limit = limit;
        self
    }

    /// Returns a copy with a different block size.
    #[must_use]
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }
}
