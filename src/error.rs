//! Error types for HelixDB
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using HelixError
pub type Result<T> = std::result::Result<T, HelixError>;

/// Unified error type for HelixDB operations
///
/// A missing document is not an error: lookups return `Option` and deletes
/// return `bool`.
#[derive(Debug, Error)]
pub enum HelixError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // WAL Errors
    // -------------------------------------------------------------------------
    #[error("WAL is closed")]
    WalClosed,

    #[error("WAL is unusable: a failed append could not be rolled back")]
    WalBroken,

    #[error("WAL corruption at line {line}: {reason}")]
    WalCorruption { line: u64, reason: String },

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Integrity Errors
    // -------------------------------------------------------------------------
    #[error("Checksum mismatch for {collection}/{id}: stored {expected}, computed {actual}")]
    ChecksumMismatch {
        collection: String,
        id: String,
        expected: String,
        actual: String,
    },

    #[error("Snapshot key {collection}/{key} holds document with id {id}")]
    SnapshotIdMismatch {
        collection: String,
        key: String,
        id: String,
    },

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for HelixError {
    fn from(err: serde_json::Error) -> Self {
        HelixError::Serialization(err.to_string())
    }
}
