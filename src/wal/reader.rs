//! WAL Reader
//!
//! Handles reading entries from the WAL file.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use crate::error::Result;
use super::WalEntry;

/// One non-blank line of the WAL
#[derive(Debug, Clone)]
pub enum WalRecord {
    /// A well-formed entry
    Entry(WalEntry),

    /// A line that failed to parse
    Malformed {
        /// 1-based line number
        line: u64,
        /// Byte offset where the line starts
        offset: u64,
        /// Parser message
        reason: String,
        /// Whether the line ended with a newline (false = torn final write)
        terminated: bool,
    },
}

/// Reads records from the WAL file, front to back
pub struct WalReader {
    reader: BufReader<File>,

    /// Bytes consumed so far
    position: u64,

    /// Lines consumed so far (including blank ones)
    line: u64,

    buffer: Vec<u8>,
}

impl WalReader {
    /// Open a WAL file for reading
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            reader: BufReader::new(file),
            position: 0,
            line: 0,
            buffer: Vec::new(),
        })
    }

    /// Read the next non-blank record
    ///
    /// Returns `Ok(None)` at end of file.
    pub fn next_record(&mut self) -> Result<Option<WalRecord>> {
        loop {
            self.buffer.clear();
            let offset = self.position;
            let read = self.reader.read_until(b'\n', &mut self.buffer)?;
            if read == 0 {
                return Ok(None);
            }

            self.position += read as u64;
            self.line += 1;

            if self.buffer.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            let record = match WalEntry::deserialize(&self.buffer) {
                Ok(entry) => WalRecord::Entry(entry),
                Err(e) => WalRecord::Malformed {
                    line: self.line,
                    offset,
                    reason: e.to_string(),
                    terminated: self.buffer.ends_with(b"\n"),
                },
            };
            return Ok(Some(record));
        }
    }

    /// Iterate over all records
    pub fn records(self) -> WalIterator {
        WalIterator { reader: self }
    }

    /// Every well-formed entry in append order; malformed lines are skipped
    ///
    /// A missing file reads as empty.
    pub fn read_all(path: &Path) -> Result<Vec<WalEntry>> {
        let reader = match Self::open(path) {
            Ok(reader) => reader,
            Err(crate::HelixError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
                return Ok(Vec::new())
            }
            Err(e) => return Err(e),
        };

        let mut entries = Vec::new();
        for record in reader.records() {
            if let WalRecord::Entry(entry) = record? {
                entries.push(entry);
            }
        }
        Ok(entries)
    }
}

/// Iterator over WAL records
pub struct WalIterator {
    reader: WalReader,
}

impl Iterator for WalIterator {
    type Item = Result<WalRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.reader.next_record().transpose()
    }
}
