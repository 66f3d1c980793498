//! Catalog
//!
//! Maps collection names to collections.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

use crate::document::Document;
use crate::snapshot::Snapshot;
use crate::wal::{Operation, WalEntry};

use super::Collection;

/// Every collection known to an engine
///
/// ## Concurrency:
/// - Read lock for lookups (the common path)
/// - Write lock only to create a collection the first time its name is seen
/// - Never held while a collection lock is held
pub struct Catalog {
    collections: RwLock<HashMap<String, Arc<Collection>>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
        }
    }

    /// Look up a collection, creating it on first reference
    pub fn get_or_create(&self, name: &str) -> Arc<Collection> {
        if let Some(collection) = self.collections.read().get(name) {
            return Arc::clone(collection);
        }

        // Re-check: another caller may have created it between the two locks
        let mut collections = self.collections.write();
        let collection = collections
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Collection::new(name)));
        Arc::clone(collection)
    }

    /// Look up a collection without creating it
    pub fn get(&self, name: &str) -> Option<Arc<Collection>> {
        self.collections.read().get(name).cloned()
    }

    /// Collection names in lexical order
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.collections.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.read().is_empty()
    }

    /// Total number of documents across all collections
    pub fn document_count(&self) -> usize {
        self.collections.read().values().map(|c| c.len()).sum()
    }

    /// Point-in-time copy of every collection
    ///
    /// Each collection is copied under its own read lock; the copy is
    /// consistent per collection, not across collections.
    pub fn export(&self) -> Snapshot {
        let collections: Vec<Arc<Collection>> =
            self.collections.read().values().cloned().collect();

        let collections = collections
            .iter()
            .map(|collection| {
                let documents: BTreeMap<String, Document> =
                    collection.documents().into_iter().collect();
                (collection.name().to_string(), documents)
            })
            .collect();

        Snapshot { collections }
    }

    /// Replace state with the contents of a snapshot
    pub fn restore(&self, snapshot: Snapshot) {
        let restored = snapshot
            .collections
            .into_iter()
            .map(|(name, documents)| {
                let collection = Collection::with_documents(&name, documents.into_iter().collect());
                (name, Arc::new(collection))
            })
            .collect();

        *self.collections.write() = restored;
    }

    /// Apply one replayed WAL entry
    ///
    /// Idempotent: INSERT overwrites by ID, DELETE of an absent ID is a no-op.
    pub fn apply(&self, entry: WalEntry) {
        let collection = self.get_or_create(&entry.collection);
        match entry.operation {
            Operation::Insert => {
                let data = entry.data.unwrap_or(Value::Null);
                collection.put(Document::new(entry.document_id, data, entry.timestamp));
            }
            Operation::Delete => {
                collection.remove(&entry.document_id);
            }
        }
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}
