//! Snapshot-committed notifications
//!
//! Governance concerns (health, lineage, quality rules) observe commits
//! through these events instead of sitting on the commit path.

use std::sync::Arc;

use crate::log::Version;

use super::{Snapshot, TableMetadata};

/// Emitted once per successful commit, after the snapshot is visible
#[derive(Debug, Clone)]
pub struct SnapshotCommitted {
    pub snapshot: Arc<Snapshot>,
}

impl SnapshotCommitted {
    pub fn snapshot_id(&self) -> Version {
        self.snapshot.snapshot_id()
    }

    pub fn metadata(&self) -> &TableMetadata {
        self.snapshot.metadata()
    }
}
