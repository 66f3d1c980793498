//! Tests for Engine
//!
//! These tests verify:
//! - Insert/get/delete/query/list operations
//! - Write-ahead ordering: a failed WAL append leaves memory untouched
//! - Deleting an absent document writes nothing to the WAL
//! - Close is idempotent and persists a final snapshot
//! - Concurrent access patterns

use std::sync::Arc;
use std::thread;

use helixdb::config::Config;
use helixdb::engine::Engine;
use helixdb::wal::{Operation, WalReader};
use helixdb::{Filter, HelixError};
use serde_json::{json, Value};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_engine() -> (TempDir, Engine) {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder().data_dir(temp_dir.path()).build();
    let engine = Engine::open(config).unwrap();
    (temp_dir, engine)
}

fn filter(value: Value) -> Filter {
    match value {
        Value::Object(map) => map,
        other => panic!("filter must be an object, got {}", other),
    }
}

fn ids(documents: &[helixdb::Document]) -> Vec<&str> {
    documents.iter().map(|d| d.id.as_str()).collect()
}

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_engine_open_creates_files() {
    let temp_dir = TempDir::new().unwrap();
    let data_dir = temp_dir.path().join("mydb");

    let engine = Engine::open(Config::builder().data_dir(&data_dir).build()).unwrap();

    assert!(data_dir.join("wal").join("current.wal").exists());
    assert_eq!(engine.wal_path(), data_dir.join("wal").join("current.wal"));
    assert_eq!(engine.snapshot_path(), data_dir.join("helix.db"));
}

#[test]
fn test_engine_insert_get() {
    let (_temp, engine) = setup_temp_engine();

    let inserted = engine
        .insert_document("users", "u1", json!({"name": "alice"}))
        .unwrap();
    let fetched = engine.get_document("users", "u1").unwrap();

    assert_eq!(inserted.id, "u1");
    assert_eq!(inserted.data, json!({"name": "alice"}));
    assert_eq!(inserted.checksum.len(), 16);
    assert_eq!(inserted.created_at, inserted.updated_at);
    assert_eq!(fetched, inserted);
}

#[test]
fn test_engine_get_nonexistent_document() {
    let (_temp, engine) = setup_temp_engine();

    assert!(engine.get_document("users", "nobody").is_none());
}

#[test]
fn test_engine_insert_overwrites() {
    let (_temp, engine) = setup_temp_engine();

    engine.insert_document("c", "k", json!({"v": 1})).unwrap();
    let second = engine.insert_document("c", "k", json!({"v": 2})).unwrap();

    assert_eq!(engine.get_document("c", "k").unwrap(), second);
    assert_eq!(engine.document_count("c"), 1);
}

#[test]
fn test_engine_accepts_non_object_payloads() {
    let (_temp, engine) = setup_temp_engine();

    for (id, data) in [("a", json!([1, 2])), ("s", json!("text")), ("n", Value::Null)] {
        engine.insert_document("misc", id, data.clone()).unwrap();
        assert_eq!(engine.get_document("misc", id).unwrap().data, data);
    }
}

#[test]
fn test_engine_delete_then_get() {
    let (_temp, engine) = setup_temp_engine();
    engine.insert_document("c", "u1", json!({"x": 1})).unwrap();

    assert!(engine.delete_document("c", "u1").unwrap());
    assert!(engine.get_document("c", "u1").is_none());
}

#[test]
fn test_engine_delete_absent_writes_no_wal_entry() {
    let (_temp, engine) = setup_temp_engine();
    engine.insert_document("c", "u1", json!({"x": 1})).unwrap();
    let before = WalReader::read_all(engine.wal_path()).unwrap().len();

    assert!(!engine.delete_document("c", "ghost").unwrap());
    assert!(!engine.delete_document("other", "ghost").unwrap());

    assert_eq!(WalReader::read_all(engine.wal_path()).unwrap().len(), before);
    assert_eq!(engine.wal_entries_written(), 1);
}

#[test]
fn test_engine_operations_are_logged_in_order() {
    let (_temp, engine) = setup_temp_engine();

    engine.insert_document("c", "a", json!({"x": 1})).unwrap();
    engine.insert_document("c", "b", json!({"x": 2})).unwrap();
    engine.delete_document("c", "a").unwrap();

    let entries = WalReader::read_all(engine.wal_path()).unwrap();
    let ops: Vec<(Operation, &str)> = entries
        .iter()
        .map(|e| (e.operation, e.document_id.as_str()))
        .collect();
    assert_eq!(
        ops,
        vec![
            (Operation::Insert, "a"),
            (Operation::Insert, "b"),
            (Operation::Delete, "a"),
        ]
    );
    assert_eq!(entries[2].data, None);
}

// =============================================================================
// Write-Ahead Invariant Tests
// =============================================================================

#[test]
fn test_failed_wal_append_leaves_memory_untouched() {
    let (_temp, engine) = setup_temp_engine();
    engine.insert_document("c", "kept", json!({"v": 1})).unwrap();
    engine.close().unwrap();

    let insert = engine.insert_document("c", "lost", json!({"v": 2}));
    assert!(matches!(insert, Err(HelixError::WalClosed)));
    assert!(engine.get_document("c", "lost").is_none());

    let delete = engine.delete_document("c", "kept");
    assert!(matches!(delete, Err(HelixError::WalClosed)));
    assert!(engine.get_document("c", "kept").is_some());
}

#[test]
fn test_failed_overwrite_keeps_previous_version() {
    let (_temp, engine) = setup_temp_engine();
    let original = engine.insert_document("c", "k", json!({"v": 1})).unwrap();
    engine.close().unwrap();

    assert!(engine.insert_document("c", "k", json!({"v": 2})).is_err());

    assert_eq!(engine.get_document("c", "k").unwrap(), original);
}

// =============================================================================
// Query Tests
// =============================================================================

#[test]
fn test_query_exact_match() {
    let (_temp, engine) = setup_temp_engine();
    engine.insert_document("c", "1", json!({"k": "a"})).unwrap();
    engine.insert_document("c", "2", json!({"k": "b"})).unwrap();
    engine.insert_document("c", "3", json!({"k": "a"})).unwrap();

    let matched = engine.query_documents("c", &filter(json!({"k": "a"})), 0);
    assert_eq!(ids(&matched), vec!["1", "3"]);

    let limited = engine.query_documents("c", &filter(json!({"k": "a"})), 1);
    assert_eq!(limited.len(), 1);
    assert!(["1", "3"].contains(&limited[0].id.as_str()));
}

#[test]
fn test_query_empty_filter_returns_all_sorted() {
    let (_temp, engine) = setup_temp_engine();
    for id in ["c", "a", "b"] {
        engine.insert_document("letters", id, json!({})).unwrap();
    }

    let all = engine.query_documents("letters", &Filter::new(), 0);

    assert_eq!(ids(&all), vec!["a", "b", "c"]);
    assert_eq!(engine.list_documents("letters"), all);
}

#[test]
fn test_query_is_type_aware() {
    let (_temp, engine) = setup_temp_engine();
    engine.insert_document("c", "num", json!({"v": 1})).unwrap();
    engine.insert_document("c", "str", json!({"v": "1"})).unwrap();

    assert_eq!(ids(&engine.query_documents("c", &filter(json!({"v": 1})), 0)), vec!["num"]);
    assert_eq!(ids(&engine.query_documents("c", &filter(json!({"v": "1"})), 0)), vec!["str"]);
}

#[test]
fn test_query_unknown_collection_is_empty() {
    let (_temp, engine) = setup_temp_engine();

    assert!(engine.query_documents("nothing", &Filter::new(), 0).is_empty());
}

// =============================================================================
// Collection Tests
// =============================================================================

#[test]
fn test_collections_created_on_first_reference() {
    let (_temp, engine) = setup_temp_engine();

    engine.insert_document("zeta", "1", json!({})).unwrap();
    engine.get_document("alpha", "1");
    engine.query_documents("mid", &Filter::new(), 0);

    assert_eq!(engine.list_collections(), vec!["alpha", "mid", "zeta"]);
}

// =============================================================================
// Close/Lifecycle Tests
// =============================================================================

#[test]
fn test_engine_close_is_idempotent() {
    let (_temp, engine) = setup_temp_engine();
    engine.insert_document("c", "1", json!({})).unwrap();

    engine.close().unwrap();
    engine.close().unwrap();

    assert!(engine.is_closed());
}

#[test]
fn test_engine_close_writes_snapshot() {
    let (_temp, engine) = setup_temp_engine();
    engine.insert_document("users", "u1", json!({"name": "alice"})).unwrap();

    engine.close().unwrap();

    let raw: Value =
        serde_json::from_slice(&std::fs::read(engine.snapshot_path()).unwrap()).unwrap();
    assert_eq!(raw["collections"]["users"]["u1"]["data"], json!({"name": "alice"}));
}

// =============================================================================
// Concurrent Access Tests
// =============================================================================

#[test]
fn test_engine_concurrent_writers_distinct_collections() {
    let (_temp, engine) = setup_temp_engine();
    let engine = Arc::new(engine);

    let mut handles = vec![];
    for t in 0..4 {
        let engine = Arc::clone(&engine);
        handles.push(thread::spawn(move || {
            let collection = format!("col{}", t);
            for i in 0..50 {
                engine
                    .insert_document(&collection, &format!("d{}", i), json!({"t": t, "i": i}))
                    .unwrap();
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    for t in 0..4 {
        assert_eq!(engine.document_count(&format!("col{}", t)), 50);
    }
    assert_eq!(WalReader::read_all(engine.wal_path()).unwrap().len(), 200);
}

#[test]
fn test_engine_concurrent_reads_during_writes() {
    let (_temp, engine) = setup_temp_engine();
    let engine = Arc::new(engine);
    for i in 0..50 {
        engine.insert_document("c", &format!("k{}", i), json!({"i": i})).unwrap();
    }

    let writer = {
        let engine = Arc::clone(&engine);
        thread::spawn(move || {
            for i in 50..100 {
                engine.insert_document("c", &format!("k{}", i), json!({"i": i})).unwrap();
            }
        })
    };

    let mut readers = vec![];
    for _ in 0..4 {
        let engine = Arc::clone(&engine);
        readers.push(thread::spawn(move || {
            for i in 0..50 {
                let doc = engine.get_document("c", &format!("k{}", i)).unwrap();
                assert_eq!(doc.data, json!({"i": i}));
            }
        }));
    }

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(engine.document_count("c"), 100);
}
