//! Configuration for laketx
//!
//! Centralized table configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{LakeTxError, Result};

/// Configuration for a single table
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory of the table.
    /// Internal structure:
    ///   {table_dir}/
    ///     └── _log/
    ///           ├── 00000000000000000001.entry
    ///           └── 00000000000000000002.entry
    pub table_dir: PathBuf,

    /// Sync strategy: whether each log write is fsynced
    pub sync_strategy: SyncStrategy,

    // -------------------------------------------------------------------------
    // Commit Configuration
    // -------------------------------------------------------------------------
    /// How many times a commit may rebase onto a newer version after losing
    /// the race for a slot before failing with a commit conflict
    pub max_commit_retries: usize,

    // -------------------------------------------------------------------------
    // Snapshot Configuration
    // -------------------------------------------------------------------------
    /// Number of recent snapshots kept in memory
    pub snapshot_cache_size: usize,
}

/// Log sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStrategy {
    /// fsync every log entry and its directory (safest, slowest)
    EveryWrite,

    /// Leave flushing to the OS page cache
    OsBuffered,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            table_dir: PathBuf::from("./laketx_table"),
            sync_strategy: SyncStrategy::EveryWrite,
            max_commit_retries: 10,
            snapshot_cache_size: 16,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the table directory
    pub fn table_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.table_dir = path.into();
        self
    }

    /// Set the log sync strategy
    pub fn sync_strategy(mut self, strategy: SyncStrategy) -> Self {
        self.config.sync_strategy = strategy;
        self
    }

    /// Set the commit retry bound
    pub fn max_commit_retries(mut self, retries: usize) -> Self {
        self.config.max_commit_retries = retries;
        self
    }

    /// Set the number of cached snapshots
    pub fn snapshot_cache_size(mut self, size: usize) -> Self {
        self.config.snapshot_cache_size = size;
        self
    }

    pub fn build(self) -> Result<Config> {
        if self.config.snapshot_cache_size == 0 {
            return Err(LakeTxError::Config(
                "snapshot_cache_size must be at least 1".to_string(),
            ));
        }
        Ok(self.config)
    }
}
