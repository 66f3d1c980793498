//! Write-Ahead Log (WAL) Module
//!
//! Provides durability guarantees through append-only logging.
//!
//! ## Responsibilities
//! - Append log entries before any in-memory mutation
//! - fsync every entry before acknowledging it
//! - Total order across all collections (append order)
//! - Crash recovery and replay
//!
//! ## File Format
//! Newline-delimited JSON, one entry per line:
//! ```text
//! {"operation":"INSERT","collection":"users","documentId":"u1","data":{...},"timestamp":"2024-01-01T00:00:00Z"}
//! {"operation":"DELETE","collection":"users","documentId":"u1","timestamp":"2024-01-01T00:00:05Z"}
//! ```
//! No rotation or truncation: the log grows for the lifetime of the data set.

mod entry;
mod writer;
mod reader;
mod recovery;

pub use entry::{WalEntry, Operation};
pub use writer::WalWriter;
pub use reader::{WalReader, WalRecord, WalIterator};
pub use recovery::{WalRecovery, RecoveryResult};

/// File name of the active log inside the WAL directory
pub const WAL_FILENAME: &str = "current.wal";
