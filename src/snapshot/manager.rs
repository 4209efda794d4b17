//! Snapshot Manager
//!
//! Rebuilds snapshots from the log and keeps the newest ones cached.
//!
//! ## Concurrency:
//! - `cache`: RwLock; folds run without holding it
//! - `subscribers`: Mutex, touched once per commit
//! - Log entries are immutable, so folding needs no other synchronization

use std::collections::BTreeMap;
use std::sync::Arc;

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::{Mutex, RwLock};

use crate::error::{LakeTxError, Result};
use crate::log::{LogEntry, LogStore, Version, EMPTY_VERSION};

use super::{Snapshot, SnapshotCommitted};

/// Derives and caches snapshots over a log store
pub struct SnapshotManager {
    store: Arc<dyn LogStore>,

    /// Recent snapshots by version. Bounded to `cache_size`, oldest evicted first.
    cache: RwLock<BTreeMap<Version, Arc<Snapshot>>>,

    cache_size: usize,

    subscribers: Mutex<Vec<Sender<SnapshotCommitted>>>,
}

impl SnapshotManager {
    pub fn new(store: Arc<dyn LogStore>, cache_size: usize) -> Self {
        Self {
            store,
            cache: RwLock::new(BTreeMap::new()),
            cache_size: cache_size.max(1),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Snapshot as of `version`
    ///
    /// Folding starts from the closest cached snapshot below `version` (or the
    /// empty table), so the result does not depend on what is cached.
    pub fn snapshot(&self, version: Version) -> Result<Arc<Snapshot>> {
        if version == EMPTY_VERSION {
            return Ok(Arc::new(Snapshot::empty()));
        }

        let base = {
            let cache = self.cache.read();
            if let Some(hit) = cache.get(&version) {
                return Ok(Arc::clone(hit));
            }
            cache.range(..version).next_back().map(|(_, s)| Arc::clone(s))
        };
        let base = base.unwrap_or_else(|| Arc::new(Snapshot::empty()));

        let snapshot = Arc::new(self.fold(&base, version)?);
        self.remember(Arc::clone(&snapshot));

        Ok(snapshot)
    }

    /// Snapshot as of the latest committed version
    pub fn current(&self) -> Result<Arc<Snapshot>> {
        self.snapshot(self.store.latest_version()?)
    }

    /// Whether the log entry for `version` is durably persisted
    pub fn is_visible(&self, version: Version) -> Result<bool> {
        match self.store.read_entry(version) {
            Ok(_) => Ok(true),
            Err(LakeTxError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Make the snapshot for a just-written entry current and notify observers
    pub fn publish(&self, entry: &LogEntry) -> Result<Arc<Snapshot>> {
        let previous = self.snapshot(entry.version.saturating_sub(1))?;
        let snapshot = Arc::new(previous.apply(entry));

        self.remember(Arc::clone(&snapshot));
        self.notify(&snapshot);

        tracing::debug!(
            snapshot_id = snapshot.snapshot_id(),
            live_files = snapshot.live_files().len(),
            "snapshot published"
        );

        Ok(snapshot)
    }

    /// Register a passive observer of committed snapshots
    pub fn subscribe(&self) -> Receiver<SnapshotCommitted> {
        let (tx, rx) = channel::unbounded();
        self.subscribers.lock().push(tx);
        rx
    }

    /// Versions currently cached, ascending (for testing/debugging)
    pub fn cached_versions(&self) -> Vec<Version> {
        self.cache.read().keys().copied().collect()
    }

    /// Drop every cached snapshot
    pub fn clear_cache(&self) {
        self.cache.write().clear();
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn fold(&self, base: &Snapshot, version: Version) -> Result<Snapshot> {
        let mut snapshot = base.clone();

        for next in base.snapshot_id() + 1..=version {
            let entry = match self.store.read_entry(next) {
                Ok(entry) => entry,
                Err(LakeTxError::NotFound(_)) => {
                    return Err(LakeTxError::NotFound(format!(
                        "snapshot {} (log version {} is missing)",
                        version, next
                    )))
                }
                Err(e) => return Err(e),
            };
            snapshot = snapshot.apply(&entry);
        }

        Ok(snapshot)
    }

    fn remember(&self, snapshot: Arc<Snapshot>) {
        let mut cache = self.cache.write();
        cache.insert(snapshot.snapshot_id(), snapshot);

        while cache.len() > self.cache_size {
            if cache.pop_first().is_none() {
                break;
            }
        }
    }

    fn notify(&self, snapshot: &Arc<Snapshot>) {
        let event = SnapshotCommitted {
            snapshot: Arc::clone(snapshot),
        };
        // Observers that hung up are dropped
        self.subscribers
            .lock()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }
}
