//! Transaction handle
//!
//! Exists only in the writer's memory. Staging never touches the log.

use std::sync::Arc;

use crate::error::{LakeTxError, Result};
use crate::log::{Operation, Version};
use crate::schema::Schema;
use crate::snapshot::Snapshot;

use super::{TransactionManager, TransactionState};

/// A single-writer intent to change the table
pub struct Transaction {
    pub(super) id: u64,
    pub(super) manager: TransactionManager,
    pub(super) state: TransactionState,
    pub(super) base_version: Option<Version>,
    pub(super) staged: Operation,
    pub(super) committed_version: Option<Version>,
    pub(super) abort_reason: Option<String>,
}

impl Transaction {
    pub(super) fn new(id: u64, manager: TransactionManager) -> Self {
        Self {
            id,
            manager,
            state: TransactionState::Initialized,
            base_version: None,
            staged: Operation::default(),
            committed_version: None,
            abort_reason: None,
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Capture the latest version as the base and become active
    pub fn begin(&mut self) -> Result<Version> {
        self.expect_state(TransactionState::Initialized, "begin")?;

        let base = self.manager.store().latest_version()?;
        self.base_version = Some(base);
        self.state = TransactionState::Active;

        tracing::debug!(txn_id = self.id, base_version = base, "transaction started");
        Ok(base)
    }

    /// Commit the staged changes merged with `metadata`
    ///
    /// On success the returned snapshot is the table's new current snapshot.
    /// On failure the transaction is aborted and nothing is written.
    pub fn commit(&mut self, metadata: Operation) -> Result<Arc<Snapshot>> {
        let manager = self.manager.clone();
        manager.commit(self, metadata)
    }

    /// Discard staged changes. Never fails; a no-op on terminal transactions.
    pub fn abort(&mut self, reason: &str) {
        if self.state.is_terminal() {
            tracing::debug!(txn_id = self.id, state = ?self.state, "abort ignored");
            return;
        }
        self.mark_aborted(reason);
    }

    // =========================================================================
    // Staging (ACTIVE only)
    // =========================================================================

    pub fn add_file(&mut self, path: impl Into<String>) -> Result<()> {
        self.expect_state(TransactionState::Active, "stage")?;
        self.staged.added.push(path.into());
        Ok(())
    }

    pub fn remove_file(&mut self, path: impl Into<String>) -> Result<()> {
        self.expect_state(TransactionState::Active, "stage")?;
        self.staged.removed.push(path.into());
        Ok(())
    }

    pub fn set_schema(&mut self, schema: Schema) -> Result<()> {
        self.expect_state(TransactionState::Active, "stage")?;
        self.staged.schema = Some(schema);
        Ok(())
    }

    pub fn set_commit_info(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<()> {
        self.expect_state(TransactionState::Active, "stage")?;
        self.staged.commit_info.insert(key.into(), value.into());
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Version read by `begin`, if it has been called
    pub fn base_version(&self) -> Option<Version> {
        self.base_version
    }

    pub fn staged(&self) -> &Operation {
        &self.staged
    }

    /// Version written by a successful commit
    pub fn committed_version(&self) -> Option<Version> {
        self.committed_version
    }

    pub fn abort_reason(&self) -> Option<&str> {
        self.abort_reason.as_deref()
    }

    // =========================================================================
    // Internal transitions
    // =========================================================================

    pub(super) fn expect_state(&self, expected: TransactionState, op: &'static str) -> Result<()> {
        if self.state != expected {
            return Err(LakeTxError::InvalidState {
                txn: self.id,
                state: self.state,
                op,
            });
        }
        Ok(())
    }

    pub(super) fn mark_committed(&mut self, version: Version) {
        self.state = TransactionState::Committed;
        self.committed_version = Some(version);
        self.staged = Operation::default();
    }

    pub(super) fn mark_aborted(&mut self, reason: &str) {
        self.state = TransactionState::Aborted;
        self.staged = Operation::default();
        self.abort_reason = Some(reason.to_string());

        tracing::info!(txn_id = self.id, reason, "transaction aborted");
    }
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("base_version", &self.base_version)
            .field("committed_version", &self.committed_version)
            .finish_non_exhaustive()
    }
}
