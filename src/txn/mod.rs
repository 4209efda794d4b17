//! Transaction Module
//!
//! Single-writer commit intents and the optimistic commit protocol.
//!
//! ## State Machine
//! ```text
//!   INITIALIZED ──begin──▶ ACTIVE ──commit──▶ COMMITTED
//!        │                   │
//!        └──────abort────────┴──abort / failed commit──▶ ABORTED
//! ```
//! `COMMITTED` and `ABORTED` are terminal.
//!
//! ## Commit Protocol
//! 1. Validate a staged schema against the schema at `base_version`
//! 2. Claim `base_version + 1` in the log
//! 3. On a version conflict: fail on ambiguous overlap with the intervening
//!    commits, otherwise rebase and retry (bounded)
//! 4. Publish the new snapshot

mod manager;
mod transaction;

pub use manager::TransactionManager;
pub use transaction::Transaction;

/// Lifecycle state of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionState {
    /// Created, no base version captured yet
    Initialized,

    /// Base version captured; changes are being staged
    Active,

    /// Exactly one log entry was written for this transaction
    Committed,

    /// Staged changes were discarded; nothing was written
    Aborted,
}

impl TransactionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TransactionState::Committed | TransactionState::Aborted)
    }
}
