//! Snapshot Module
//!
//! Full-state copies of every collection, used to shorten recovery.
//!
//! ## Responsibilities
//! - Serialize all collections into one file, atomically
//! - Load that file back at startup
//! - Refresh it in the background after mutations, one save at a time
//!
//! The snapshot is an optimization: the WAL stays the system of record and is
//! replayed in full on top of whatever snapshot was loaded.
//!
//! ## File Format
//! ```text
//! {
//!   "collections": {
//!     "<name>": {
//!       "<id>": {"id", "data", "createdAt", "updatedAt", "checksum"}
//!     }
//!   }
//! }
//! ```

mod store;
mod worker;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::document::Document;

pub use store::SnapshotStore;
pub use worker::SnapshotWorker;

/// Point-in-time copy of all collections
///
/// BTreeMaps keep the file output stable between saves of the same state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub collections: BTreeMap<String, BTreeMap<String, Document>>,
}

impl Snapshot {
    /// Total number of documents across all collections
    pub fn document_count(&self) -> usize {
        self.collections.values().map(BTreeMap::len).sum()
    }
}
