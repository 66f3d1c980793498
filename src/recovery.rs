//! Startup Recovery
//!
//! Rebuilds in-memory state from the snapshot and the WAL.
//!
//! ## Phases
//! ```text
//! Created ──► LoadSnapshot ──► ReplayWal ──► Ready
//! ```
//! - `Created`: empty catalog, paths known
//! - `LoadSnapshot`: missing file is fine; malformed file is discarded (Lenient)
//!   or fatal (Strict)
//! - `ReplayWal`: always runs, snapshot or not, since the snapshot may be stale
//! - `Ready`: the engine starts serving
//!
//! An unreadable WAL file aborts recovery with an error.

use std::fmt;

use crate::collection::Catalog;
use crate::config::{Config, RecoveryPolicy};
use crate::document::compute_checksum;
use crate::error::{HelixError, Result};
use crate::snapshot::{Snapshot, SnapshotStore};
use crate::wal::{RecoveryResult, WalRecovery, WAL_FILENAME};

/// Recovery progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryPhase {
    Created,
    LoadSnapshot,
    ReplayWal,
    Ready,
}

impl fmt::Display for RecoveryPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecoveryPhase::Created => "created",
            RecoveryPhase::LoadSnapshot => "load-snapshot",
            RecoveryPhase::ReplayWal => "replay-wal",
            RecoveryPhase::Ready => "ready",
        };
        f.write_str(name)
    }
}

/// What happened to the snapshot file during recovery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotStatus {
    /// No snapshot file
    Absent,

    /// Loaded into memory
    Loaded,

    /// Present but malformed; ignored
    Discarded,
}

/// Summary of a completed recovery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryReport {
    pub snapshot: SnapshotStatus,

    /// Documents taken from the snapshot (after checksum filtering)
    pub documents_loaded: usize,

    /// Snapshot documents whose checksum did not match their data
    pub checksum_mismatches: usize,

    /// Snapshot documents stored under a key other than their own id
    pub id_mismatches: usize,

    /// WAL replay statistics
    pub wal: RecoveryResult,
}

/// Run recovery into an empty catalog
pub fn recover(config: &Config, catalog: &Catalog, store: &SnapshotStore) -> Result<RecoveryReport> {
    let mut phase = RecoveryPhase::Created;
    tracing::debug!("Recovery phase: {}", phase);

    // Phase 1: snapshot
    phase = advance(phase, RecoveryPhase::LoadSnapshot);
    let (snapshot, status) = load_snapshot(store, config.recovery_policy)?;

    let mut rejected = Rejected::default();
    let mut documents_loaded = 0;
    if let Some(mut snapshot) = snapshot {
        rejected = verify_documents(&mut snapshot, config)?;
        documents_loaded = snapshot.document_count();
        catalog.restore(snapshot);
    }

    // Phase 2: WAL, unconditionally
    phase = advance(phase, RecoveryPhase::ReplayWal);
    let wal_path = config.wal_dir.join(WAL_FILENAME);
    let (entries, wal) = WalRecovery::recover(&wal_path, config.recovery_policy)?;
    if !entries.is_empty() {
        tracing::info!("Replaying {} WAL entries", entries.len());
    }
    for entry in entries {
        catalog.apply(entry);
    }

    advance(phase, RecoveryPhase::Ready);

    let report = RecoveryReport {
        snapshot: status,
        documents_loaded,
        checksum_mismatches: rejected.checksum,
        id_mismatches: rejected.id,
        wal,
    };

    tracing::info!(
        "Recovery complete: snapshot {:?} ({} documents), {} WAL entries replayed, {} skipped, {} collections",
        report.snapshot,
        report.documents_loaded,
        report.wal.entries_recovered,
        report.wal.entries_corrupted,
        catalog.len()
    );

    Ok(report)
}

fn advance(from: RecoveryPhase, to: RecoveryPhase) -> RecoveryPhase {
    tracing::debug!("Recovery phase: {} -> {}", from, to);
    to
}

fn load_snapshot(
    store: &SnapshotStore,
    policy: RecoveryPolicy,
) -> Result<(Option<Snapshot>, SnapshotStatus)> {
    match store.load() {
        Ok(Some(snapshot)) => Ok((Some(snapshot), SnapshotStatus::Loaded)),
        Ok(None) => {
            tracing::info!("No snapshot at {}, starting fresh", store.path().display());
            Ok((None, SnapshotStatus::Absent))
        }
        Err(HelixError::Serialization(reason)) if policy == RecoveryPolicy::Lenient => {
            tracing::warn!(
                "Ignoring malformed snapshot {}: {}",
                store.path().display(),
                reason
            );
            Ok((None, SnapshotStatus::Discarded))
        }
        Err(e) => Err(e),
    }
}

/// Snapshot documents dropped by `verify_documents`, by reason
#[derive(Default)]
struct Rejected {
    checksum: usize,
    id: usize,
}

/// Drop (Lenient) or reject (Strict) snapshot documents that cannot be trusted
///
/// A document is untrusted when it is keyed under an id other than its own,
/// or, with `verify_checksums`, when its checksum does not match its data.
fn verify_documents(snapshot: &mut Snapshot, config: &Config) -> Result<Rejected> {
    let strict = config.recovery_policy == RecoveryPolicy::Strict;
    let mut rejected = Rejected::default();

    for (collection, documents) in snapshot.collections.iter_mut() {
        let mut dropped = Vec::new();
        for (key, document) in documents.iter() {
            if *key != document.id {
                if strict {
                    return Err(HelixError::SnapshotIdMismatch {
                        collection: collection.clone(),
                        key: key.clone(),
                        id: document.id.clone(),
                    });
                }
                tracing::warn!(
                    "Snapshot key {}/{} holds document {}, dropping document",
                    collection,
                    key,
                    document.id
                );
                rejected.id += 1;
                dropped.push(key.clone());
                continue;
            }

            if !config.verify_checksums || document.verify_checksum() {
                continue;
            }

            let actual = compute_checksum(&document.data);
            if strict {
                return Err(HelixError::ChecksumMismatch {
                    collection: collection.clone(),
                    id: key.clone(),
                    expected: document.checksum.clone(),
                    actual,
                });
            }

            tracing::warn!(
                "Checksum mismatch for {}/{} (stored {}, computed {}), dropping document",
                collection,
                key,
                document.checksum,
                actual
            );
            rejected.checksum += 1;
            dropped.push(key.clone());
        }

        for key in dropped {
            documents.remove(&key);
        }
    }

    Ok(rejected)
}
