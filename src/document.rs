//! Document Model
//!
//! The unit of stored data: a caller-supplied JSON value plus identity,
//! timestamps, and an integrity checksum.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Number of digest bytes kept in a checksum (rendered as 16 hex chars)
pub const CHECKSUM_BYTES: usize = 8;

/// A stored document
///
/// `checksum` is always a pure function of `data`: it is recomputed on every
/// insert and on every WAL replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Unique within its collection
    pub id: String,

    /// Caller payload
    pub data: Value,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    /// Truncated SHA-256 of the serialized payload
    pub checksum: String,
}

impl Document {
    /// Build a document written at `at`
    ///
    /// Both timestamps are set to `at`, so an overwrite produced live and the
    /// same overwrite reconstructed from the WAL are identical.
    pub fn new(id: impl Into<String>, data: Value, at: DateTime<Utc>) -> Self {
        let checksum = compute_checksum(&data);
        Self {
            id: id.into(),
            data,
            created_at: at,
            updated_at: at,
            checksum,
        }
    }

    /// Recompute the checksum and compare it with the stored one
    pub fn verify_checksum(&self) -> bool {
        compute_checksum(&self.data) == self.checksum
    }
}

/// Compute the checksum of a payload
///
/// serde_json writes object keys in sorted order, so equal values always
/// serialize (and hash) identically.
pub fn compute_checksum(data: &Value) -> String {
    let serialized = data.to_string();
    let digest = Sha256::digest(serialized.as_bytes());

    digest[..CHECKSUM_BYTES]
        .iter()
        .map(|byte| format!("{:02x}", byte))
        .collect()
}
