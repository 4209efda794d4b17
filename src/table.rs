//! Table Module
//!
//! Wires the log store, snapshot manager, schema validator and transaction
//! manager together for one table.
//!
//! ## Responsibilities
//! - Open (or create) a table directory and verify its log
//! - Hand out transactions
//! - Serve current and historical snapshots

use std::path::Path;
use std::sync::Arc;

use crossbeam::channel::Receiver;

use crate::config::Config;
use crate::error::Result;
use crate::log::{InMemoryLogStore, LogEntry, LogStore, StorageLogStore, Version, VerifyReport};
use crate::schema::{CompatibilityValidator, SchemaValidator};
use crate::snapshot::{Snapshot, SnapshotCommitted, SnapshotManager};
use crate::storage::{ByteStorage, LocalStorage};
use crate::txn::{Transaction, TransactionManager};

/// A versioned, transactional table
///
/// ## Concurrency Model: Optimistic, single serialization point
///
/// - **Commits**: any number of transactions may be active at once. They only
///   contend when claiming a version in the log store.
/// - **Reads**: snapshots are folded from immutable log entries and need no
///   locking beyond the snapshot cache's RwLock.
pub struct Table {
    config: Config,
    store: Arc<dyn LogStore>,
    snapshots: Arc<SnapshotManager>,
    transactions: TransactionManager,

    /// Result of the integrity scan run when the table was opened
    verify_report: Option<VerifyReport>,
}

impl Table {
    /// Open or create a table in `config.table_dir`
    ///
    /// On startup:
    /// 1. Create the table directory if it doesn't exist
    /// 2. Verify the persisted log
    /// 3. Ready to serve transactions and snapshots
    pub fn open(config: Config) -> Result<Self> {
        let storage = Arc::new(LocalStorage::open(&config.table_dir, config.sync_strategy)?);
        Self::open_with_storage(config, storage)
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified table directory
    pub fn open_path(path: &Path) -> Result<Self> {
        let config = Config {
            table_dir: path.to_path_buf(),
            ..Config::default()
        };
        Self::open(config)
    }

    /// Open a table persisted through any byte storage primitive
    pub fn open_with_storage<S: ByteStorage + 'static>(config: Config, storage: Arc<S>) -> Result<Self> {
        let log = StorageLogStore::open(storage)?;

        let report = log.verify()?;
        if !report.is_clean() {
            tracing::warn!(
                gaps = ?report.gaps,
                corrupted = ?report.corrupted,
                "log verification found damaged history"
            );
        }
        if !report.stray_files.is_empty() {
            tracing::warn!(files = ?report.stray_files, "unexpected files in log directory");
        }
        tracing::info!(
            entries = report.entries_verified,
            latest_version = report.last_version,
            "table opened"
        );

        let mut table = Self::with_store(config, Arc::new(log));
        table.verify_report = Some(report);
        Ok(table)
    }

    /// A table whose log lives only in memory
    pub fn in_memory(config: Config) -> Self {
        Self::with_store(config, Arc::new(InMemoryLogStore::new()))
    }

    /// Build a table over an existing log store
    pub fn with_store(config: Config, store: Arc<dyn LogStore>) -> Self {
        let snapshots = Arc::new(SnapshotManager::new(
            Arc::clone(&store),
            config.snapshot_cache_size,
        ));
        let transactions = TransactionManager::new(
            Arc::clone(&store),
            Arc::clone(&snapshots),
            Arc::new(CompatibilityValidator::new()),
            config.max_commit_retries,
        );

        Self {
            config,
            store,
            snapshots,
            transactions,
            verify_report: None,
        }
    }

    /// Replace the schema validator used at commit time
    pub fn with_validator(mut self, validator: Arc<dyn SchemaValidator>) -> Self {
        self.transactions = TransactionManager::new(
            Arc::clone(&self.store),
            Arc::clone(&self.snapshots),
            validator,
            self.config.max_commit_retries,
        );
        self
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// New transaction in the `Initialized` state
    pub fn transaction(&self) -> Transaction {
        self.transactions.transaction()
    }

    /// New transaction, already begun
    pub fn begin(&self) -> Result<Transaction> {
        self.transactions.begin()
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn snapshot(&self, version: Version) -> Result<Arc<Snapshot>> {
        self.snapshots.snapshot(version)
    }

    pub fn current(&self) -> Result<Arc<Snapshot>> {
        self.snapshots.current()
    }

    pub fn latest_version(&self) -> Result<Version> {
        self.store.latest_version()
    }

    pub fn is_visible(&self, version: Version) -> Result<bool> {
        self.snapshots.is_visible(version)
    }

    /// Every committed entry, oldest first
    pub fn history(&self) -> Result<Vec<LogEntry>> {
        let latest = self.store.latest_version()?;
        self.store.read_range(1, latest)
    }

    /// Receive an event for every snapshot committed through this table
    pub fn subscribe(&self) -> Receiver<SnapshotCommitted> {
        self.snapshots.subscribe()
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn LogStore> {
        &self.store
    }

    pub fn snapshots(&self) -> &Arc<SnapshotManager> {
        &self.snapshots
    }

    pub fn transactions(&self) -> &TransactionManager {
        &self.transactions
    }

    /// Integrity report from opening a persisted table
    pub fn verify_report(&self) -> Option<&VerifyReport> {
        self.verify_report.as_ref()
    }
}
