//! Tests for Table
//!
//! These tests verify:
//! - Table lifecycle (open/reopen)
//! - Configuration
//! - History and verification reports
//! - Plugging in a custom schema validator

use std::fs;
use std::sync::Arc;

use laketx::config::SyncStrategy;
use laketx::schema::{DataType, Field, Schema};
use laketx::{Config, LakeTxError, Operation, Result, SchemaValidator, Table, TransactionState};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_table() -> (TempDir, Table) {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .table_dir(temp_dir.path())
        .sync_strategy(SyncStrategy::EveryWrite)
        .build()
        .unwrap();
    let table = Table::open(config).unwrap();
    (temp_dir, table)
}

fn commit(table: &Table, op: Operation) -> u64 {
    let mut txn = table.begin().unwrap();
    txn.commit(op).unwrap().snapshot_id()
}

/// Rejects every schema
struct FrozenSchema;

impl SchemaValidator for FrozenSchema {
    fn validate(&self, _schema: &Schema) -> Result<()> {
        Err(LakeTxError::Schema("schema changes are frozen".to_string()))
    }

    fn evolve(&self, _current: &Schema, _new: &Schema) -> Result<()> {
        Err(LakeTxError::Schema("schema changes are frozen".to_string()))
    }
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_table_open_creates_directories() {
    let temp_dir = TempDir::new().unwrap();
    let table_dir = temp_dir.path().join("events");

    let config = Config::builder().table_dir(&table_dir).build().unwrap();
    let table = Table::open(config).unwrap();

    assert!(table_dir.join("_log").is_dir());
    assert_eq!(table.latest_version().unwrap(), 0);
}

#[test]
fn test_table_reopen_preserves_history() {
    let temp_dir = TempDir::new().unwrap();
    {
        let table = Table::open_path(temp_dir.path()).unwrap();
        commit(&table, Operation::new().add_file("a").add_file("b"));
        commit(&table, Operation::new().remove_file("a").add_file("c"));
    }

    let table = Table::open_path(temp_dir.path()).unwrap();

    assert_eq!(table.latest_version().unwrap(), 2);
    let snapshot = table.current().unwrap();
    assert!(snapshot.live_files().contains("b"));
    assert!(snapshot.live_files().contains("c"));
    assert!(!snapshot.live_files().contains("a"));

    assert_eq!(commit(&table, Operation::new().add_file("d")), 3);
}

#[test]
fn test_open_path_uses_default_settings() {
    let temp_dir = TempDir::new().unwrap();

    let table = Table::open_path(temp_dir.path()).unwrap();

    assert_eq!(table.config().table_dir, temp_dir.path());
    assert_eq!(table.config().max_commit_retries, 10);
    assert_eq!(table.config().snapshot_cache_size, 16);
}

// =============================================================================
// Configuration Tests
// =============================================================================

#[test]
fn test_config_builder() {
    let config = Config::builder()
        .table_dir("/tmp/laketx-test")
        .sync_strategy(SyncStrategy::OsBuffered)
        .max_commit_retries(3)
        .snapshot_cache_size(4)
        .build()
        .unwrap();

    assert_eq!(config.table_dir.to_str(), Some("/tmp/laketx-test"));
    assert_eq!(config.sync_strategy, SyncStrategy::OsBuffered);
    assert_eq!(config.max_commit_retries, 3);
    assert_eq!(config.snapshot_cache_size, 4);
}

#[test]
fn test_config_rejects_empty_cache() {
    let err = Config::builder().snapshot_cache_size(0).build().unwrap_err();

    assert!(matches!(err, LakeTxError::Config(_)));
}

// =============================================================================
// History & Verification Tests
// =============================================================================

#[test]
fn test_history_lists_every_entry() {
    let table = Table::in_memory(Config::default());
    assert!(table.history().unwrap().is_empty());

    commit(&table, Operation::new().add_file("a").with_info("operation", "WRITE"));
    commit(&table, Operation::new().remove_file("a").with_info("operation", "DELETE"));

    let history = table.history().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].operation.added, vec!["a"]);
    assert_eq!(history[1].operation.removed, vec!["a"]);
    assert!(history[0].timestamp <= history[1].timestamp);
}

#[test]
fn test_verify_report_on_open() {
    let (_temp, table) = setup_temp_table();
    commit(&table, Operation::new().add_file("a"));

    let report = table.verify_report().unwrap();
    assert!(report.is_clean());
    assert_eq!(report.entries_verified, 0);

    assert!(Table::in_memory(Config::default()).verify_report().is_none());
}

#[test]
fn test_open_reports_damaged_log() {
    let temp_dir = TempDir::new().unwrap();
    {
        let table = Table::open_path(temp_dir.path()).unwrap();
        for i in 0..3 {
            commit(&table, Operation::new().add_file(format!("f{}", i)));
        }
    }
    let entry = temp_dir.path().join("_log").join(format!("{:020}.entry", 2));
    fs::write(&entry, b"garbage").unwrap();

    let table = Table::open_path(temp_dir.path()).unwrap();
    let report = table.verify_report().unwrap();

    assert!(!report.is_clean());
    assert_eq!(report.corrupted, vec![2]);
    assert_eq!(report.entries_verified, 2);

    // Versions before the damage still fold
    assert_eq!(table.snapshot(1).unwrap().live_files().len(), 1);
    assert!(matches!(table.snapshot(3), Err(LakeTxError::Corruption(_))));
}

// =============================================================================
// Validator Tests
// =============================================================================

#[test]
fn test_custom_validator() {
    let table = Table::in_memory(Config::default()).with_validator(Arc::new(FrozenSchema));

    commit(&table, Operation::new().add_file("a"));

    let mut txn = table.begin().unwrap();
    let schema = Schema::new(vec![Field::required("id", DataType::Int64)]);
    let err = txn.commit(Operation::new().with_schema(schema)).unwrap_err();

    assert!(err.to_string().contains("frozen"));
    assert_eq!(txn.state(), TransactionState::Aborted);
    assert_eq!(table.latest_version().unwrap(), 1);
}

// =============================================================================
// Error Tests
// =============================================================================

#[test]
fn test_error_retryability() {
    assert!(LakeTxError::VersionConflict { version: 3 }.is_retryable());
    assert!(LakeTxError::CommitConflict {
        attempts: 2,
        reason: "contended".to_string()
    }
    .is_retryable());

    assert!(!LakeTxError::NotFound("log version 9".to_string()).is_retryable());
    assert!(!LakeTxError::Corruption("crc".to_string()).is_retryable());
    assert!(!LakeTxError::Schema("empty".to_string()).is_retryable());
}
