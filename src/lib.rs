//! # laketx
//!
//! The transactional metadata layer of a table format:
//! - Append-only, version-addressed transaction log
//! - Optimistic commits with bounded, conflict-checked retries
//! - Immutable snapshots for current and time-travel reads
//! - Schema validation and compatible evolution enforced at commit time
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    TransactionManager                        │
//! │          begin → stage → commit (claim base+1) / abort       │
//! └──────────┬──────────────────┬───────────────────┬───────────┘
//!            │                  │                   │
//!            ▼                  ▼                   ▼
//!   ┌─────────────────┐ ┌────────────────┐ ┌─────────────────┐
//!   │ SchemaValidator │ │SnapshotManager │ │    LogStore     │
//!   │ validate/evolve │ │ fold + cache   │─▶│ (CAS on version)│
//!   └─────────────────┘ └───────┬────────┘ └────────┬────────┘
//!                               │                   │
//!                               ▼                   ▼
//!                      SnapshotCommitted    ┌─────────────────┐
//!                        (observers)        │   ByteStorage   │
//!                                           │ (local / memory)│
//!                                           └─────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod storage;
pub mod log;
pub mod schema;
pub mod snapshot;
pub mod txn;
pub mod table;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{LakeTxError, Result};
pub use config::Config;
pub use log::{LogEntry, LogStore, Operation, Version, EMPTY_VERSION};
pub use schema::{DataType, Field, Schema, SchemaValidator};
pub use snapshot::Snapshot;
pub use table::Table;
pub use txn::{Transaction, TransactionState};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of laketx
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
