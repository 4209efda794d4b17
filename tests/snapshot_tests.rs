//! Tests for snapshots
//!
//! These tests verify:
//! - The empty-table snapshot
//! - Folding added/removed files and last-writer-wins schemas
//! - Time travel to historical versions
//! - Determinism with and without the cache
//! - The visibility gate
//! - Snapshot-committed notifications

use std::collections::BTreeSet;
use std::sync::Arc;

use laketx::log::{InMemoryLogStore, LogEntry, LogStore};
use laketx::schema::{DataType, Field, Schema};
use laketx::snapshot::SnapshotManager;
use laketx::{Config, LakeTxError, Operation, Table, EMPTY_VERSION};

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_table() -> Table {
    Table::in_memory(Config::default())
}

fn commit(table: &Table, op: Operation) -> u64 {
    let mut txn = table.begin().unwrap();
    txn.commit(op).unwrap().snapshot_id()
}

fn files(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|s| s.to_string()).collect()
}

/// Table at version 3 with live files {a, b, c}
fn setup_abc() -> Table {
    let table = setup_table();
    commit(&table, Operation::new().add_file("a"));
    commit(&table, Operation::new().add_file("b"));
    commit(&table, Operation::new().add_file("c"));
    table
}

// =============================================================================
// Empty Table Tests
// =============================================================================

#[test]
fn test_empty_table_snapshot() {
    let table = setup_table();

    let snapshot = table.current().unwrap();

    assert_eq!(snapshot.snapshot_id(), EMPTY_VERSION);
    assert!(snapshot.live_files().is_empty());
    assert!(snapshot.schema().is_none());
    assert!(!snapshot.is_visible());
}

#[test]
fn test_snapshot_past_latest_is_not_found() {
    let table = setup_abc();

    let err = table.snapshot(4).unwrap_err();
    assert!(matches!(err, LakeTxError::NotFound(_)));
}

// =============================================================================
// Fold Tests
// =============================================================================

#[test]
fn test_remove_and_add_in_one_commit() {
    let table = setup_abc();
    assert_eq!(table.latest_version().unwrap(), 3);

    let mut txn = table.begin().unwrap();
    assert_eq!(txn.base_version(), Some(3));
    txn.commit(Operation::new().remove_file("b").add_file("d")).unwrap();

    let entry = table.store().read_entry(4).unwrap();
    assert_eq!(entry.operation.removed, vec!["b"]);
    assert_eq!(entry.operation.added, vec!["d"]);

    let snapshot = table.snapshot(4).unwrap();
    assert_eq!(snapshot.metadata().live_files, files(&["a", "c", "d"]));
    assert!(snapshot.is_visible());
}

#[test]
fn test_time_travel_reads_history() {
    let table = setup_abc();
    commit(&table, Operation::new().remove_file("a"));

    assert_eq!(*table.snapshot(1).unwrap().live_files(), files(&["a"]));
    assert_eq!(*table.snapshot(2).unwrap().live_files(), files(&["a", "b"]));
    assert_eq!(*table.snapshot(3).unwrap().live_files(), files(&["a", "b", "c"]));
    assert_eq!(*table.snapshot(4).unwrap().live_files(), files(&["b", "c"]));
}

#[test]
fn test_schema_is_last_writer_wins() {
    let table = setup_table();
    let v1 = Schema::new(vec![Field::required("id", DataType::Int32)]);
    let mut v2 = v1.clone();
    v2.fields.push(Field::optional("name", DataType::Utf8));

    commit(&table, Operation::new().with_schema(v1));
    commit(&table, Operation::new().add_file("a"));
    commit(&table, Operation::new().with_schema(v2));
    commit(&table, Operation::new().add_file("b"));

    let at2 = table.snapshot(2).unwrap();
    let at4 = table.snapshot(4).unwrap();

    assert_eq!(at2.schema().unwrap().fields.len(), 1);
    assert_eq!(at2.metadata().schema_id(), Some(1));
    assert_eq!(at4.schema().unwrap().fields.len(), 2);
    assert_eq!(at4.metadata().schema_id(), Some(2));
}

#[test]
fn test_commit_info_reflects_latest_entry() {
    let table = setup_table();
    commit(&table, Operation::new().add_file("a").with_info("operation", "WRITE"));
    commit(&table, Operation::new().remove_file("a").with_info("operation", "DELETE"));

    let snapshot = table.current().unwrap();

    assert_eq!(
        snapshot.metadata().commit_info.get("operation").map(String::as_str),
        Some("DELETE")
    );
    assert!(snapshot.metadata().last_commit_timestamp.is_some());
}

// =============================================================================
// Determinism Tests
// =============================================================================

#[test]
fn test_snapshot_is_deterministic() {
    let table = setup_abc();
    commit(&table, Operation::new().remove_file("b").add_file("d"));

    let first = table.snapshot(4).unwrap();
    table.snapshots().clear_cache();
    let second = table.snapshot(4).unwrap();

    assert_eq!(first.metadata(), second.metadata());
    assert_eq!(*first, *second);
}

#[test]
fn test_cache_does_not_change_results() {
    let table = setup_abc();
    for i in 0..10 {
        let mut op = Operation::new().add_file(format!("f{}", i));
        if i % 2 == 1 {
            op = op.remove_file(format!("f{}", i - 1));
        }
        commit(&table, op);
    }

    // Separate manager with a one-slot cache over the same log
    let cold = SnapshotManager::new(Arc::clone(table.store()), 1);
    for v in 1..=13 {
        assert_eq!(
            table.snapshot(v).unwrap().metadata(),
            cold.snapshot(v).unwrap().metadata(),
            "version {}",
            v
        );
    }
}

#[test]
fn test_cache_is_bounded() {
    let config = Config::builder().snapshot_cache_size(2).build().unwrap();
    let table = Table::in_memory(config);
    for i in 0..5 {
        commit(&table, Operation::new().add_file(format!("f{}", i)));
    }

    assert_eq!(table.snapshots().cached_versions(), vec![4, 5]);
}

// =============================================================================
// Visibility Tests
// =============================================================================

#[test]
fn test_visibility_gate() {
    let store: Arc<dyn LogStore> = Arc::new(InMemoryLogStore::new());
    let manager = SnapshotManager::new(Arc::clone(&store), 4);

    assert!(!manager.is_visible(1).unwrap());

    store
        .write_entry(&LogEntry::new(1, Operation::new().add_file("a"), None))
        .unwrap();

    assert!(manager.is_visible(1).unwrap());
    assert!(manager.snapshot(1).unwrap().is_visible());
    assert!(!manager.is_visible(2).unwrap());
}

// =============================================================================
// Notification Tests
// =============================================================================

#[test]
fn test_subscribers_receive_committed_snapshots() {
    let table = setup_table();
    let events = table.subscribe();

    commit(&table, Operation::new().add_file("a"));
    commit(&table, Operation::new().add_file("b"));

    let first = events.try_recv().unwrap();
    let second = events.try_recv().unwrap();

    assert_eq!(first.snapshot_id(), 1);
    assert_eq!(second.snapshot_id(), 2);
    assert_eq!(second.metadata().live_files, files(&["a", "b"]));
    assert!(events.try_recv().is_err());
}

#[test]
fn test_dropped_subscriber_does_not_block_commits() {
    let table = setup_table();
    drop(table.subscribe());
    let live = table.subscribe();

    commit(&table, Operation::new().add_file("a"));

    assert_eq!(live.try_recv().unwrap().snapshot_id(), 1);
}

#[test]
fn test_failed_commit_emits_no_event() {
    let table = setup_table();
    commit(
        &table,
        Operation::new().with_schema(Schema::new(vec![Field::required("id", DataType::Int64)])),
    );
    let events = table.subscribe();

    let mut txn = table.begin().unwrap();
    let result = txn.commit(
        Operation::new().with_schema(Schema::new(vec![Field::required("id", DataType::Int8)])),
    );

    assert!(result.is_err());
    assert!(events.try_recv().is_err());
}
