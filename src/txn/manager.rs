//! Transaction Manager
//!
//! Runs the optimistic commit protocol against a log store.
//!
//! ## Conflict Policy
//! Losing the race for a version is retried after rebasing onto the new
//! latest version, up to `max_commit_retries` times. Overlap with an
//! intervening commit is never resolved automatically: if that commit removed
//! a file we remove, or added a file we add, the commit fails.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::{LakeTxError, Result};
use crate::log::{LogEntry, LogStore, Operation, Version};
use crate::schema::{SchemaId, SchemaValidator};
use crate::snapshot::{Snapshot, SnapshotManager};

use super::{Transaction, TransactionState};

/// Orchestrates begin/commit/abort for one table. Cheap to clone.
#[derive(Clone)]
pub struct TransactionManager {
    store: Arc<dyn LogStore>,
    snapshots: Arc<SnapshotManager>,
    validator: Arc<dyn SchemaValidator>,
    max_commit_retries: usize,
    next_txn_id: Arc<AtomicU64>,
}

impl TransactionManager {
    pub fn new(
        store: Arc<dyn LogStore>,
        snapshots: Arc<SnapshotManager>,
        validator: Arc<dyn SchemaValidator>,
        max_commit_retries: usize,
    ) -> Self {
        Self {
            store,
            snapshots,
            validator,
            max_commit_retries,
            next_txn_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Create a transaction in the `Initialized` state
    pub fn transaction(&self) -> Transaction {
        let id = self.next_txn_id.fetch_add(1, Ordering::Relaxed);
        Transaction::new(id, self.clone())
    }

    /// Create a transaction and begin it
    pub fn begin(&self) -> Result<Transaction> {
        let mut txn = self.transaction();
        txn.begin()?;
        Ok(txn)
    }

    pub fn store(&self) -> &Arc<dyn LogStore> {
        &self.store
    }

    pub fn snapshots(&self) -> &Arc<SnapshotManager> {
        &self.snapshots
    }

    pub fn validator(&self) -> &Arc<dyn SchemaValidator> {
        &self.validator
    }

    pub fn max_commit_retries(&self) -> usize {
        self.max_commit_retries
    }

    /// Commit `txn`. Any failure aborts it.
    pub(super) fn commit(&self, txn: &mut Transaction, metadata: Operation) -> Result<Arc<Snapshot>> {
        txn.expect_state(TransactionState::Active, "commit")?;
        let Some(base_version) = txn.base_version else {
            return Err(LakeTxError::InvalidState {
                txn: txn.id,
                state: txn.state,
                op: "commit",
            });
        };

        let mut staged = std::mem::take(&mut txn.staged);
        staged.merge(metadata);
        staged.dedup();

        let span = tracing::info_span!("commit", txn_id = txn.id, base_version);
        let _guard = span.enter();

        match self.write_with_retries(txn.id, base_version, staged) {
            Ok(entry) => {
                txn.mark_committed(entry.version);
                tracing::info!(version = entry.version, "transaction committed");
                // The entry is durable, so the commit stands even if publishing fails
                match self.snapshots.publish(&entry) {
                    Ok(snapshot) => Ok(snapshot),
                    Err(e) => {
                        tracing::warn!(version = entry.version, error = %e, "snapshot publish failed");
                        self.snapshots.snapshot(entry.version)
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "commit failed");
                txn.mark_aborted(&format!("commit failed: {}", e));
                Err(e)
            }
        }
    }

    /// Claim the next version for `op`, rebasing on conflicts
    fn write_with_retries(&self, txn_id: u64, base_version: Version, mut op: Operation) -> Result<LogEntry> {
        let mut base = base_version;
        let mut conflicts = 0usize;

        loop {
            let base_snapshot = self.snapshots.snapshot(base)?;
            let schema_id = self.resolve_schema(&base_snapshot, &mut op)?;
            let entry = LogEntry::new(base + 1, op.clone(), schema_id);

            match self.store.write_entry(&entry) {
                Ok(()) => return Ok(entry),
                Err(LakeTxError::VersionConflict { version }) => {
                    conflicts += 1;
                    if conflicts > self.max_commit_retries {
                        return Err(LakeTxError::CommitConflict {
                            attempts: conflicts,
                            reason: format!(
                                "version {} still contended after {} retries",
                                version, self.max_commit_retries
                            ),
                        });
                    }

                    let latest = self.store.latest_version()?.max(version);
                    tracing::debug!(
                        txn_id,
                        version,
                        latest,
                        attempt = conflicts,
                        "version conflict, rebasing"
                    );

                    for intervening in self.store.read_range(base + 1, latest)? {
                        check_overlap(&op, &intervening, conflicts)?;
                    }
                    base = latest;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Validate a staged schema against `base` and assign its id.
    ///
    /// Returns the schema id the new entry carries.
    fn resolve_schema(&self, base: &Snapshot, op: &mut Operation) -> Result<Option<SchemaId>> {
        let current = base.schema();

        let Some(proposed) = op.schema.as_mut() else {
            return Ok(current.map(|s| s.schema_id));
        };

        match current {
            Some(current) => self.validator.evolve(current, proposed)?,
            None => self.validator.validate(proposed)?,
        }

        let schema_id = current.map(|s| s.schema_id + 1).unwrap_or(1);
        proposed.schema_id = schema_id;

        Ok(Some(schema_id))
    }
}

/// Fail if `op` and an intervening commit touched the same files
fn check_overlap(op: &Operation, intervening: &LogEntry, attempts: usize) -> Result<()> {
    let removed_twice = shared_paths(&op.removed, &intervening.operation.removed);
    if !removed_twice.is_empty() {
        return Err(LakeTxError::CommitConflict {
            attempts,
            reason: format!(
                "version {} already removed {}",
                intervening.version,
                removed_twice.join(", ")
            ),
        });
    }

    let added_twice = shared_paths(&op.added, &intervening.operation.added);
    if !added_twice.is_empty() {
        return Err(LakeTxError::CommitConflict {
            attempts,
            reason: format!(
                "version {} already added {}",
                intervening.version,
                added_twice.join(", ")
            ),
        });
    }

    Ok(())
}

/// Paths of `ours` that also appear in `theirs`, in our order
fn shared_paths<'a>(ours: &'a [String], theirs: &[String]) -> Vec<&'a str> {
    if theirs.is_empty() {
        return Vec::new();
    }
    let theirs: HashSet<&str> = theirs.iter().map(String::as_str).collect();
    ours.iter()
        .map(String::as_str)
        .filter(|path| theirs.contains(path))
        .collect()
}
