//! Snapshot Store
//!
//! Reads and atomically writes the snapshot file.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::collection::Catalog;
use crate::error::Result;

use super::Snapshot;

/// Owns the snapshot file
///
/// Saves go through `save_lock`, so two saves never race on the temporary
/// file and a capture is always written after every capture taken before it.
pub struct SnapshotStore {
    path: PathBuf,
    tmp_path: PathBuf,
    save_lock: Mutex<()>,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut tmp = path.clone().into_os_string();
        tmp.push(".tmp");

        Self {
            path,
            tmp_path: PathBuf::from(tmp),
            save_lock: Mutex::new(()),
        }
    }

    /// Write `snapshot` to disk
    ///
    /// Steps:
    /// 1. Serialize to `<path>.tmp` and fsync it
    /// 2. Rename over `<path>` (readers see the old or the new file, never a mix)
    /// 3. fsync the parent directory so the rename itself is durable
    pub fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let _guard = self.save_lock.lock();
        self.write_atomically(snapshot)
    }

    /// Export `catalog` and save it, both under the save lock
    ///
    /// Returns the number of documents written.
    pub fn capture(&self, catalog: &Catalog) -> Result<usize> {
        let _guard = self.save_lock.lock();
        let snapshot = catalog.export();
        self.write_atomically(&snapshot)?;
        Ok(snapshot.document_count())
    }

    /// Load the snapshot file
    ///
    /// Returns:
    /// - `Ok(Some(snapshot))`: file present and well-formed
    /// - `Ok(None)`: no file
    /// - `Err(Serialization)`: file present but malformed
    pub fn load(&self) -> Result<Option<Snapshot>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let snapshot = serde_json::from_slice(&bytes)?;
        Ok(Some(snapshot))
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn write_atomically(&self, snapshot: &Snapshot) -> Result<()> {
        if let Some(parent) = self.parent_dir() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_vec_pretty(snapshot)?;

        let mut tmp = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.tmp_path)?;
        tmp.write_all(&json)?;
        tmp.sync_all()?;
        drop(tmp);

        fs::rename(&self.tmp_path, &self.path)?;

        if let Some(parent) = self.parent_dir() {
            Self::fsync_dir(parent);
        }

        Ok(())
    }

    fn parent_dir(&self) -> Option<&Path> {
        self.path.parent().filter(|p| !p.as_os_str().is_empty())
    }

    /// Best effort: not every platform lets a directory be opened and synced
    fn fsync_dir(dir: &Path) {
        if let Err(e) = File::open(dir).and_then(|d| d.sync_all()) {
            tracing::debug!("Could not fsync {}: {}", dir.display(), e);
        }
    }
}
