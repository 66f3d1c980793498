//! Engine Module
//!
//! The core storage engine that coordinates all components.
//!
//! ## Responsibilities
//! - Own the catalog of collections, the WAL, and the snapshot worker
//! - Enforce write-ahead ordering: WAL fsync before any in-memory change
//! - Answer reads and queries from memory
//! - Drive recovery on startup and a final snapshot on close

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use serde_json::Value;

use crate::collection::Catalog;
use crate::config::Config;
use crate::document::Document;
use crate::error::Result;
use crate::query::Filter;
use crate::recovery::{self, RecoveryReport};
use crate::snapshot::{SnapshotStore, SnapshotWorker};
use crate::wal::{WalEntry, WalWriter, WAL_FILENAME};

/// The main storage engine
///
/// ## Concurrency Model
///
/// - **Catalog**: RwLock held only to look up or lazily create a collection
/// - **Collections**: one RwLock each; unrelated collections proceed in parallel
/// - **WAL**: one Mutex around append+fsync, a single total order for all writes
/// - **Snapshots**: background worker; callers never wait on a save
///
/// Lock order for writes: collection write lock → WAL mutex. Holding the
/// collection lock across the append keeps the in-memory order of writes to
/// a collection identical to their WAL order.
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// Path of the active WAL file
    wal_path: PathBuf,

    /// All collections (shared with the snapshot worker)
    catalog: Arc<Catalog>,

    /// Write-ahead log (exclusive access needed)
    wal: Mutex<WalWriter>,

    /// Snapshot file (shared with the snapshot worker)
    snapshots: Arc<SnapshotStore>,

    /// Background saver; `None` once closed
    snapshotter: Mutex<Option<SnapshotWorker>>,

    /// What recovery found at startup
    recovery: RecoveryReport,

    closed: AtomicBool,
}

impl Engine {
    /// Open or create an engine with the given config
    ///
    /// On startup:
    /// 1. Create the snapshot and WAL directories
    /// 2. Load the snapshot if present
    /// 3. Replay the whole WAL on top of it
    /// 4. Open the WAL for appending
    /// 5. Start the snapshot worker
    pub fn open(config: Config) -> Result<Self> {
        // Step 1: Directories
        if let Some(parent) = config.snapshot_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::create_dir_all(&config.wal_dir)?;
        let wal_path = config.wal_dir.join(WAL_FILENAME);

        let catalog = Arc::new(Catalog::new());
        let snapshots = Arc::new(SnapshotStore::new(&config.snapshot_path));

        // Steps 2-3: Snapshot, then WAL replay
        let recovery = recovery::recover(&config, &catalog, &snapshots)?;

        // Step 4: WAL writer (after recovery, which may cut a torn tail)
        let wal = WalWriter::open(&wal_path)?;

        // Step 5: Snapshot worker
        let worker = SnapshotWorker::spawn(Arc::clone(&snapshots), Arc::clone(&catalog))?;

        tracing::info!(
            "Engine ready: {} collections, {} documents",
            catalog.len(),
            catalog.document_count()
        );

        Ok(Self {
            config,
            wal_path,
            catalog,
            wal: Mutex::new(wal),
            snapshots,
            snapshotter: Mutex::new(Some(worker)),
            recovery,
            closed: AtomicBool::new(false),
        })
    }

    /// Open with explicit paths (convenience method)
    ///
    /// Uses the default config otherwise
    pub fn open_paths(snapshot_path: &Path, wal_dir: &Path) -> Result<Self> {
        let config = Config::builder()
            .snapshot_path(snapshot_path)
            .wal_dir(wal_dir)
            .build();
        Self::open(config)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Insert or overwrite a document
    ///
    /// Steps:
    /// 1. Build the document (timestamps = now, checksum over `data`)
    /// 2. Append an INSERT entry to the WAL and fsync
    /// 3. Store the document in the collection
    /// 4. Schedule a snapshot refresh
    ///
    /// If step 2 fails the error is returned and prior state is untouched.
    pub fn insert_document(&self, collection: &str, id: &str, data: Value) -> Result<Document> {
        let target = self.catalog.get_or_create(collection);

        let now = Utc::now();
        let document = Document::new(id, data, now);
        let entry = WalEntry::insert(collection, id, document.data.clone(), now);

        target.insert_logged(document.clone(), || self.append_wal(&entry))?;

        self.schedule_snapshot();
        Ok(document)
    }

    /// Delete a document
    ///
    /// Returns `Ok(false)` without touching the WAL when the document does not
    /// exist. When it does, the DELETE entry is made durable before removal.
    pub fn delete_document(&self, collection: &str, id: &str) -> Result<bool> {
        let target = self.catalog.get_or_create(collection);
        let entry = WalEntry::delete(collection, id, Utc::now());

        let removed = target.remove_logged(id, || self.append_wal(&entry))?;

        if removed {
            self.schedule_snapshot();
        }
        Ok(removed)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Get a document by ID (memory only)
    pub fn get_document(&self, collection: &str, id: &str) -> Option<Document> {
        self.catalog.get_or_create(collection).get(id)
    }

    /// Documents whose top-level fields equal every pair in `filter`
    ///
    /// Ascending by ID; truncated to `limit` when `limit > 0`.
    pub fn query_documents(&self, collection: &str, filter: &Filter, limit: usize) -> Vec<Document> {
        self.catalog.get_or_create(collection).query(filter, limit)
    }

    /// Every document of a collection, ascending by ID
    pub fn list_documents(&self, collection: &str) -> Vec<Document> {
        self.query_documents(collection, &Filter::new(), 0)
    }

    /// Names of all known collections, in lexical order
    pub fn list_collections(&self) -> Vec<String> {
        self.catalog.names()
    }

    // =========================================================================
    // Snapshots & Lifecycle
    // =========================================================================

    /// Write a snapshot now, on the calling thread
    pub fn snapshot_now(&self) -> Result<()> {
        let documents = self.snapshots.capture(&self.catalog)?;
        tracing::debug!("Snapshot saved on demand ({} documents)", documents);
        Ok(())
    }

    /// Close the engine gracefully
    ///
    /// Stops the snapshot worker, writes a final snapshot, and closes the WAL.
    /// Calling it again is a no-op. Writes after close fail with `WalClosed`.
    pub fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        // Step 1: Stop background saves (finishes a pending one)
        let worker = self.snapshotter.lock().take();
        if let Some(mut worker) = worker {
            worker.shutdown();
        }

        // Step 2: Final snapshot; the WAL is closed even if this fails
        let snapshot_result = self.snapshot_now();
        if let Err(e) = &snapshot_result {
            tracing::warn!("Final snapshot failed: {}", e);
        }

        // Step 3: Close WAL
        self.wal.lock().close()?;

        tracing::info!("Engine closed");
        snapshot_result
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the WAL file path
    pub fn wal_path(&self) -> &Path {
        &self.wal_path
    }

    /// Get the snapshot file path
    pub fn snapshot_path(&self) -> &Path {
        self.snapshots.path()
    }

    /// What recovery found when this engine was opened
    pub fn recovery_report(&self) -> &RecoveryReport {
        &self.recovery
    }

    /// Number of documents in a collection (0 for unknown collections)
    pub fn document_count(&self, collection: &str) -> usize {
        self.catalog.get(collection).map(|c| c.len()).unwrap_or(0)
    }

    /// WAL entries appended since open
    pub fn wal_entries_written(&self) -> u64 {
        self.wal.lock().entries_written()
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn append_wal(&self, entry: &WalEntry) -> Result<()> {
        self.wal.lock().append(entry)
    }

    fn schedule_snapshot(&self) {
        if let Some(worker) = self.snapshotter.lock().as_ref() {
            worker.request();
        }
    }
}
