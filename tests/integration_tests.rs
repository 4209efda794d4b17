//! End-to-end tests for laketx
//!
//! Drive a table on disk through a realistic sequence of commits, then
//! reopen it and read history back.

use std::collections::BTreeSet;

use laketx::config::SyncStrategy;
use laketx::schema::{DataType, Field, Schema};
use laketx::{Config, LakeTxError, Operation, Table, TransactionState};
use tempfile::TempDir;

fn open(dir: &TempDir) -> Table {
    let config = Config::builder()
        .table_dir(dir.path())
        .sync_strategy(SyncStrategy::EveryWrite)
        .build()
        .unwrap();
    Table::open(config).unwrap()
}

fn files(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_table_lifecycle_end_to_end() {
    let temp_dir = TempDir::new().unwrap();
    let table = open(&temp_dir);
    let events = table.subscribe();

    // v1: create the table
    let mut txn = table.begin().unwrap();
    txn.set_schema(Schema::new(vec![
        Field::required("id", DataType::Int32),
        Field::optional("name", DataType::Utf8),
    ]))
    .unwrap();
    txn.set_commit_info("operation", "CREATE TABLE").unwrap();
    txn.commit(Operation::new()).unwrap();

    // v2, v3: appends
    let mut txn = table.begin().unwrap();
    txn.commit(Operation::new().add_file("part-0.parquet").add_file("part-1.parquet"))
        .unwrap();
    let mut txn = table.begin().unwrap();
    txn.commit(Operation::new().add_file("part-2.parquet")).unwrap();

    // v4: widen id, rename name, add a nullable column
    let mut txn = table.begin().unwrap();
    let evolved = Schema::new(vec![
        Field::required("id", DataType::Int64),
        Field::optional("full_name", DataType::Utf8).renamed_from("name"),
        Field::optional("email", DataType::Utf8),
    ]);
    let snapshot = txn.commit(Operation::new().with_schema(evolved)).unwrap();
    assert_eq!(snapshot.metadata().schema_id(), Some(2));

    // A destructive change is rejected and leaves no trace
    let mut txn = table.begin().unwrap();
    let narrowed = Schema::new(vec![
        Field::required("id", DataType::Int32),
        Field::optional("full_name", DataType::Utf8),
        Field::optional("email", DataType::Utf8),
    ]);
    assert!(matches!(
        txn.commit(Operation::new().with_schema(narrowed)),
        Err(LakeTxError::SchemaEvolution { .. })
    ));
    assert_eq!(txn.state(), TransactionState::Aborted);

    // v5: compaction
    let mut txn = table.begin().unwrap();
    txn.remove_file("part-0.parquet").unwrap();
    txn.remove_file("part-1.parquet").unwrap();
    txn.add_file("compacted-0.parquet").unwrap();
    txn.commit(Operation::new().with_info("operation", "OPTIMIZE"))
        .unwrap();

    let published: Vec<u64> = events.try_iter().map(|e| e.snapshot_id()).collect();
    assert_eq!(published, vec![1, 2, 3, 4, 5]);
    drop(table);

    // Reopen and time travel
    let table = open(&temp_dir);
    assert!(table.verify_report().unwrap().is_clean());
    assert_eq!(table.latest_version().unwrap(), 5);

    let current = table.current().unwrap();
    assert_eq!(
        *current.live_files(),
        files(&["compacted-0.parquet", "part-2.parquet"])
    );
    let schema = current.schema().unwrap();
    assert_eq!(schema.schema_id, 2);
    assert_eq!(schema.field("id").unwrap().data_type, DataType::Int64);
    assert!(schema.field("full_name").is_some());

    let v3 = table.snapshot(3).unwrap();
    assert_eq!(
        *v3.live_files(),
        files(&["part-0.parquet", "part-1.parquet", "part-2.parquet"])
    );
    assert_eq!(v3.schema().unwrap().schema_id, 1);
    assert!(v3.schema().unwrap().field("name").is_some());

    let v1 = table.snapshot(1).unwrap();
    assert!(v1.live_files().is_empty());
    assert_eq!(
        v1.metadata().commit_info.get("operation").map(String::as_str),
        Some("CREATE TABLE")
    );

    assert!(table.is_visible(5).unwrap());
    assert!(!table.is_visible(6).unwrap());
}
