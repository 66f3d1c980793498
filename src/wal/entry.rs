//! WAL Entry definitions
//!
//! Defines the structure of individual WAL log entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{HelixError, Result};

/// A single entry in the WAL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalEntry {
    /// The operation to perform
    pub operation: Operation,

    /// Target collection
    pub collection: String,

    /// Target document
    pub document_id: String,

    /// Payload (INSERT only); an explicit `null` is `Some(Value::Null)`
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub data: Option<Value>,

    /// When the operation was accepted (UTC)
    pub timestamp: DateTime<Utc>,
}

/// Operations that can be logged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
    /// Insert or overwrite a document
    Insert,

    /// Delete a document
    Delete,
}

impl WalEntry {
    /// INSERT entry
    pub fn insert(
        collection: impl Into<String>,
        document_id: impl Into<String>,
        data: Value,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            operation: Operation::Insert,
            collection: collection.into(),
            document_id: document_id.into(),
            data: Some(data),
            timestamp,
        }
    }

    /// DELETE entry
    pub fn delete(
        collection: impl Into<String>,
        document_id: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            operation: Operation::Delete,
            collection: collection.into(),
            document_id: document_id.into(),
            data: None,
            timestamp,
        }
    }

    /// Serialize to one newline-terminated line
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let mut line = serde_json::to_vec(self)?;
        line.push(b'\n');
        Ok(line)
    }

    /// Parse one line (surrounding whitespace ignored)
    ///
    /// An INSERT without a `data` field is rejected like any other
    /// malformed line.
    pub fn deserialize(line: &[u8]) -> Result<Self> {
        let entry: Self = serde_json::from_slice(line)?;
        if entry.operation == Operation::Insert && entry.data.is_none() {
            return Err(HelixError::Serialization(format!(
                "INSERT of {}/{} has no data",
                entry.collection, entry.document_id
            )));
        }
        Ok(entry)
    }
}

/// Distinguish a present `null` from an absent field
fn present<'de, D>(deserializer: D) -> std::result::Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}
