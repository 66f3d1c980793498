//! WAL Writer
//!
//! Handles appending entries to the WAL file.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::{HelixError, Result};
use super::WalEntry;

/// Writes entries to the WAL file
///
/// Not internally synchronized: the engine keeps it behind a single mutex so
/// every append+fsync pair is serialized into one total order.
pub struct WalWriter {
    /// Path of the log file
    path: PathBuf,

    /// Open append handle; `None` once closed
    file: Option<File>,

    /// Entries appended through this handle
    entries_written: u64,

    /// A failed append could not be rolled back; the file tail is untrusted
    broken: bool,
}

impl WalWriter {
    /// Open or create a WAL file for appending
    ///
    /// Creates the parent directory if needed. If the last line lacks its
    /// newline, one is written so the next entry starts on a line of its own.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;

        if Self::ends_mid_line(&mut file)? {
            file.write_all(b"\n")?;
            file.sync_data()?;
        }

        Ok(Self {
            path: path.to_path_buf(),
            file: Some(file),
            entries_written: 0,
            broken: false,
        })
    }

    /// Append an entry and fsync it
    ///
    /// Returns only after the entry is durable. On error the caller must not
    /// apply the corresponding mutation.
    ///
    /// A failed write or fsync is rolled back to the previous file length, so
    /// neither a fragment nor an unacknowledged entry survives to be replayed.
    /// If the rollback itself fails, every later append is refused.
    pub fn append(&mut self, entry: &WalEntry) -> Result<()> {
        if self.broken {
            return Err(HelixError::WalBroken);
        }
        let file = self.file.as_mut().ok_or(HelixError::WalClosed)?;

        let line = entry.serialize()?;
        let start = file.metadata()?.len();

        if let Err(e) = Self::write_durably(file, &line) {
            match file.set_len(start).and_then(|()| file.sync_data()) {
                Ok(()) => {
                    tracing::warn!("WAL append failed, rolled back to byte {}: {}", start, e);
                }
                Err(rollback) => {
                    tracing::error!(
                        "WAL append failed ({}) and rollback to byte {} failed ({}), refusing further writes",
                        e,
                        start,
                        rollback
                    );
                    self.broken = true;
                }
            }
            return Err(e.into());
        }

        self.entries_written += 1;
        Ok(())
    }

    /// Sync and release the file handle; closing twice is a no-op
    pub fn close(&mut self) -> Result<()> {
        if let Some(file) = self.file.take() {
            file.sync_all()?;
        }
        Ok(())
    }

    fn write_durably(file: &mut File, line: &[u8]) -> io::Result<()> {
        file.write_all(line)?;
        file.sync_data()
    }

    fn ends_mid_line(file: &mut File) -> Result<bool> {
        if file.metadata()?.len() == 0 {
            return Ok(false);
        }

        let mut last = [0u8; 1];
        file.seek(SeekFrom::End(-1))?;
        file.read_exact(&mut last)?;
        Ok(last[0] != b'\n')
    }

    pub fn is_closed(&self) -> bool {
        self.file.is_none()
    }

    /// Number of entries appended since this writer was opened
    pub fn entries_written(&self) -> u64 {
        self.entries_written
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
