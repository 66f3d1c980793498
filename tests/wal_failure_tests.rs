#![cfg(unix)]
//! Tests for WAL appends that fail at the OS level
//!
//! These tests verify:
//! - A write cut short by the file size limit is rolled back
//! - A failed insert/delete leaves memory and the log untouched
//! - Writes acknowledged after a failure survive a strict reopen
//!
//! The file size limit is process-wide, so every test here holds
//! `FSIZE_LOCK` for its whole body.

use std::fs;

use chrono::Utc;
use helixdb::config::{Config, RecoveryPolicy};
use helixdb::wal::{WalEntry, WalRecovery, WalWriter};
use helixdb::{Engine, HelixError};
use parking_lot::Mutex;
use serde_json::json;
use tempfile::TempDir;

static FSIZE_LOCK: Mutex<()> = parking_lot::const_mutex(());

// =============================================================================
// Helper Functions
// =============================================================================

/// Caps the size any file may grow to until dropped
///
/// SIGXFSZ is ignored so an oversized write fails with EFBIG instead of
/// killing the process.
struct FileSizeCap {
    previous: libc::rlimit,
}

impl FileSizeCap {
    fn set(max_bytes: u64) -> Self {
        unsafe {
            libc::signal(libc::SIGXFSZ, libc::SIG_IGN);

            let mut previous = libc::rlimit {
                rlim_cur: 0,
                rlim_max: 0,
            };
            assert_eq!(libc::getrlimit(libc::RLIMIT_FSIZE, &mut previous), 0);

            let capped = libc::rlimit {
                rlim_cur: max_bytes as libc::rlim_t,
                rlim_max: previous.rlim_max,
            };
            assert_eq!(libc::setrlimit(libc::RLIMIT_FSIZE, &capped), 0);

            Self { previous }
        }
    }
}

impl Drop for FileSizeCap {
    fn drop(&mut self) {
        unsafe {
            libc::setrlimit(libc::RLIMIT_FSIZE, &self.previous);
        }
    }
}

fn file_len(path: &std::path::Path) -> u64 {
    fs::metadata(path).unwrap().len()
}

// =============================================================================
// Writer Tests
// =============================================================================

#[test]
fn test_writer_rolls_back_partial_append() {
    let _serial = FSIZE_LOCK.lock();
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("current.wal");

    let mut writer = WalWriter::open(&path).unwrap();
    writer.append(&WalEntry::insert("c", "1", json!(1), Utc::now())).unwrap();
    let len = file_len(&path);

    let oversized = WalEntry::insert("c", "2", json!("x".repeat(200)), Utc::now());
    let result = {
        let _cap = FileSizeCap::set(len + 10);
        writer.append(&oversized)
    };

    assert!(matches!(result, Err(HelixError::Io(_))));
    assert_eq!(file_len(&path), len);
    assert_eq!(writer.entries_written(), 1);

    writer.append(&WalEntry::insert("c", "3", json!(3), Utc::now())).unwrap();
    writer.close().unwrap();

    let (entries, result) = WalRecovery::recover(&path, RecoveryPolicy::Strict).unwrap();
    let ids: Vec<&str> = entries.iter().map(|e| e.document_id.as_str()).collect();
    assert_eq!(ids, vec!["1", "3"]);
    assert_eq!(result.entries_corrupted, 0);
    assert!(!result.was_truncated);
}

// =============================================================================
// Engine Tests
// =============================================================================

#[test]
fn test_engine_failed_writes_leave_no_trace() {
    let _serial = FSIZE_LOCK.lock();
    let temp = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp.path())
        .recovery_policy(RecoveryPolicy::Strict)
        .build();

    let engine = Engine::open(config.clone()).unwrap();
    engine.insert_document("c", "a", json!({"v": 1})).unwrap();
    let wal_len = file_len(engine.wal_path());

    let (insert, delete) = {
        let _cap = FileSizeCap::set(wal_len + 40);
        (
            engine.insert_document("c", "big", json!({"blob": "x".repeat(500)})),
            engine.delete_document("c", "a"),
        )
    };

    assert!(matches!(insert, Err(HelixError::Io(_))));
    assert!(matches!(delete, Err(HelixError::Io(_))));
    assert!(engine.get_document("c", "big").is_none());
    assert!(engine.get_document("c", "a").is_some());
    assert_eq!(file_len(engine.wal_path()), wal_len);

    // Acknowledged after the failures; must not be merged into a fragment
    engine.insert_document("c", "b", json!({"v": 2})).unwrap();
    engine.close().unwrap();
    fs::remove_file(engine.snapshot_path()).unwrap();

    let reopened = Engine::open(config).unwrap();

    assert!(reopened.get_document("c", "big").is_none());
    assert_eq!(reopened.get_document("c", "a").unwrap().data, json!({"v": 1}));
    assert_eq!(reopened.get_document("c", "b").unwrap().data, json!({"v": 2}));
    assert_eq!(reopened.recovery_report().wal.entries_recovered, 2);
    assert_eq!(reopened.recovery_report().wal.entries_corrupted, 0);
}
