//! Tests for the Snapshot Store and Worker
//!
//! These tests verify:
//! - Save/load round trip and the on-disk JSON shape
//! - Missing file loads as absent, malformed file as a serialization error
//! - No temporary file is left behind after a save
//! - The background worker coalesces requests and flushes on shutdown

use std::fs;
use std::sync::Arc;

use chrono::Utc;
use helixdb::collection::Catalog;
use helixdb::snapshot::{Snapshot, SnapshotStore, SnapshotWorker};
use helixdb::wal::WalEntry;
use helixdb::{Document, HelixError};
use serde_json::{json, Value};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_store() -> (TempDir, SnapshotStore) {
    let temp_dir = TempDir::new().unwrap();
    let store = SnapshotStore::new(temp_dir.path().join("data").join("helix.db"));
    (temp_dir, store)
}

fn populated_catalog() -> Catalog {
    let catalog = Catalog::new();
    catalog.apply(WalEntry::insert("users", "u1", json!({"name": "alice"}), Utc::now()));
    catalog.apply(WalEntry::insert("users", "u2", json!({"name": "bob"}), Utc::now()));
    catalog.apply(WalEntry::insert("orders", "o1", json!([1, 2, 3]), Utc::now()));
    catalog
}

// =============================================================================
// Store Tests
// =============================================================================

#[test]
fn test_load_missing_file_is_absent() {
    let (_temp, store) = setup_store();

    assert!(store.load().unwrap().is_none());
    assert!(!store.exists());
}

#[test]
fn test_save_then_load_round_trip() {
    let (_temp, store) = setup_store();
    let snapshot = populated_catalog().export();

    store.save(&snapshot).unwrap();
    let loaded = store.load().unwrap().unwrap();

    assert_eq!(loaded, snapshot);
    assert_eq!(loaded.document_count(), 3);
}

#[test]
fn test_saved_file_shape() {
    let (_temp, store) = setup_store();
    store.save(&populated_catalog().export()).unwrap();

    let raw: Value = serde_json::from_slice(&fs::read(store.path()).unwrap()).unwrap();
    let doc = &raw["collections"]["users"]["u1"];

    assert_eq!(doc["id"], "u1");
    assert_eq!(doc["data"], json!({"name": "alice"}));
    assert!(doc["createdAt"].is_string());
    assert!(doc["updatedAt"].is_string());
    assert_eq!(doc["checksum"].as_str().unwrap().len(), 16);
}

#[test]
fn test_save_leaves_no_temp_file() {
    let (temp, store) = setup_store();
    store.save(&Snapshot::default()).unwrap();

    let leftovers: Vec<_> = fs::read_dir(temp.path().join("data"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();

    assert_eq!(leftovers, vec!["helix.db".to_string()]);
}

#[test]
fn test_save_replaces_previous_snapshot() {
    let (_temp, store) = setup_store();
    store.save(&populated_catalog().export()).unwrap();

    store.save(&Snapshot::default()).unwrap();

    assert_eq!(store.load().unwrap().unwrap().document_count(), 0);
}

#[test]
fn test_load_malformed_file_is_serialization_error() {
    let (_temp, store) = setup_store();
    fs::create_dir_all(store.path().parent().unwrap()).unwrap();
    fs::write(store.path(), b"{\"collections\": {\"users\": ").unwrap();

    assert!(matches!(store.load(), Err(HelixError::Serialization(_))));
}

#[test]
fn test_capture_writes_catalog_state() {
    let (_temp, store) = setup_store();
    let catalog = populated_catalog();

    let written = store.capture(&catalog).unwrap();

    assert_eq!(written, 3);
    let loaded = store.load().unwrap().unwrap();
    let alice: &Document = &loaded.collections["users"]["u1"];
    assert_eq!(alice.data, json!({"name": "alice"}));
}

// =============================================================================
// Worker Tests
// =============================================================================

#[test]
fn test_worker_shutdown_flushes_pending_request() {
    let (_temp, store) = setup_store();
    let store = Arc::new(store);
    let catalog = Arc::new(populated_catalog());

    let mut worker = SnapshotWorker::spawn(Arc::clone(&store), Arc::clone(&catalog)).unwrap();
    worker.request();
    worker.shutdown();

    assert_eq!(worker.saves_completed(), 1);
    assert_eq!(worker.saves_failed(), 0);
    assert_eq!(store.load().unwrap().unwrap(), catalog.export());
}

#[test]
fn test_worker_coalesces_burst_of_requests() {
    let (_temp, store) = setup_store();
    let store = Arc::new(store);
    let catalog = Arc::new(Catalog::new());

    let mut worker = SnapshotWorker::spawn(Arc::clone(&store), Arc::clone(&catalog)).unwrap();
    for i in 0..200 {
        catalog.apply(WalEntry::insert("c", format!("d{}", i), json!(i), Utc::now()));
        worker.request();
    }
    worker.shutdown();

    // At most one save per request, and the last save saw every insert
    assert!(worker.saves_completed() >= 1);
    assert!(worker.saves_completed() <= 200);
    assert_eq!(store.load().unwrap().unwrap().document_count(), 200);
}

#[test]
fn test_worker_rejects_requests_after_shutdown() {
    let (_temp, store) = setup_store();
    let mut worker =
        SnapshotWorker::spawn(Arc::new(store), Arc::new(Catalog::new())).unwrap();

    worker.shutdown();

    assert!(!worker.request());
    assert_eq!(worker.saves_completed(), 0);
}
