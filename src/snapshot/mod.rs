//! Snapshot Module
//!
//! Immutable, point-in-time views of a table derived from the log.
//!
//! ## Responsibilities
//! - Fold log entries into table state (live files, schema)
//! - Serve any committed version for time-travel reads
//! - Cache recent snapshots (never a source of truth)
//! - Notify passive observers when a new snapshot is committed
//!
//! ## Fold Rule
//! For each entry in increasing version order: removed files leave the live
//! set, then added files join it, and a schema carried by the entry replaces
//! the previous one.

mod events;
mod manager;

use std::collections::{BTreeMap, BTreeSet};

use crate::log::{LogEntry, Version, EMPTY_VERSION};
use crate::schema::{Schema, SchemaId};

pub use events::SnapshotCommitted;
pub use manager::SnapshotManager;

/// Aggregated table state as of a snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableMetadata {
    /// Data files that make up the table at this version
    pub live_files: BTreeSet<String>,

    /// Schema in force at this version
    pub schema: Option<Schema>,

    /// Timestamp of the entry this snapshot was built from
    pub last_commit_timestamp: Option<u64>,

    /// Commit info of the entry this snapshot was built from
    pub commit_info: BTreeMap<String, String>,
}

impl TableMetadata {
    /// Apply one log entry
    pub(crate) fn apply(&mut self, entry: &LogEntry) {
        let op = &entry.operation;

        for path in &op.removed {
            self.live_files.remove(path);
        }
        for path in &op.added {
            self.live_files.insert(path.clone());
        }
        if let Some(schema) = &op.schema {
            self.schema = Some(schema.clone());
        }

        self.last_commit_timestamp = Some(entry.timestamp);
        self.commit_info = op.commit_info.clone();
    }

    pub fn schema_id(&self) -> Option<SchemaId> {
        self.schema.as_ref().map(|s| s.schema_id)
    }
}

/// Immutable view of the table as of one version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    snapshot_id: Version,
    metadata: TableMetadata,
    is_visible: bool,
}

impl Snapshot {
    /// The state of a table with no commits
    ///
    /// Not visible: there is no log entry backing it.
    pub fn empty() -> Self {
        Self {
            snapshot_id: EMPTY_VERSION,
            metadata: TableMetadata::default(),
            is_visible: false,
        }
    }

    /// The log version this snapshot was built from
    pub fn snapshot_id(&self) -> Version {
        self.snapshot_id
    }

    pub fn metadata(&self) -> &TableMetadata {
        &self.metadata
    }

    /// True once the backing log entry is durably persisted
    pub fn is_visible(&self) -> bool {
        self.is_visible
    }

    pub fn live_files(&self) -> &BTreeSet<String> {
        &self.metadata.live_files
    }

    pub fn schema(&self) -> Option<&Schema> {
        self.metadata.schema.as_ref()
    }

    /// Successor snapshot after applying `entry`, which must be the next version
    pub(crate) fn apply(&self, entry: &LogEntry) -> Snapshot {
        debug_assert_eq!(entry.version, self.snapshot_id + 1);

        let mut metadata = self.metadata.clone();
        metadata.apply(entry);

        Snapshot {
            snapshot_id: entry.version,
            metadata,
            is_visible: true,
        }
    }
}
