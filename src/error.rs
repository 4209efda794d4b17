//! Error types for laketx
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

use crate::log::Version;
use crate::schema::EvolutionViolation;
use crate::txn::TransactionState;

/// Result type alias using LakeTxError
pub type Result<T> = std::result::Result<T, LakeTxError>;

/// Unified error type for laketx operations
#[derive(Debug, Error)]
pub enum LakeTxError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    /// The underlying storage primitive failed. Never retried silently.
    #[error("log I/O error: {0}")]
    LogIo(#[from] std::io::Error),

    #[error("not found: {0}")]
    NotFound(String),

    // -------------------------------------------------------------------------
    // Log Errors
    // -------------------------------------------------------------------------
    /// Another writer already claimed this version.
    #[error("version conflict: version {version} is already committed")]
    VersionConflict { version: Version },

    #[error("version gap: cannot write version {version} when latest is {latest}")]
    VersionGap { version: Version, latest: Version },

    #[error("log corruption detected: {0}")]
    Corruption(String),

    // -------------------------------------------------------------------------
    // Schema Errors
    // -------------------------------------------------------------------------
    #[error("invalid schema: {0}")]
    Schema(String),

    #[error("incompatible schema change: {}", format_violations(.violations))]
    SchemaEvolution { violations: Vec<EvolutionViolation> },

    // -------------------------------------------------------------------------
    // Transaction Errors
    // -------------------------------------------------------------------------
    #[error("commit conflict after {attempts} attempt(s): {reason}")]
    CommitConflict { attempts: usize, reason: String },

    #[error("transaction {txn}: cannot {op} while {state:?}")]
    InvalidState {
        txn: u64,
        state: TransactionState,
        op: &'static str,
    },

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl LakeTxError {
    /// True when a fresh transaction over the newer state may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LakeTxError::CommitConflict { .. } | LakeTxError::VersionConflict { .. }
        )
    }
}

fn format_violations(violations: &[EvolutionViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
