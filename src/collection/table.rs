//! Collection implementation
//!
//! HashMap-based document table with RwLock for concurrency.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::document::Document;
use crate::error::Result;
use crate::query::{self, Filter};

/// A named group of documents
pub struct Collection {
    name: String,

    /// Document ID → Document
    documents: RwLock<HashMap<String, Document>>,
}

impl Collection {
    /// Create a new empty collection
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_documents(name, HashMap::new())
    }

    /// Create a collection pre-populated with documents (snapshot restore)
    pub fn with_documents(name: impl Into<String>, documents: HashMap<String, Document>) -> Self {
        Self {
            name: name.into(),
            documents: RwLock::new(documents),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get a document by ID (read lock)
    pub fn get(&self, id: &str) -> Option<Document> {
        self.documents.read().get(id).cloned()
    }

    /// Insert or overwrite a document, running `log` first
    ///
    /// `log` runs under the write lock. If it fails the map is left untouched
    /// and the error is returned.
    pub fn insert_logged<F>(&self, document: Document, log: F) -> Result<()>
    where
        F: FnOnce() -> Result<()>,
    {
        let mut documents = self.documents.write();
        log()?;
        documents.insert(document.id.clone(), document);
        Ok(())
    }

    /// Remove a document if present, running `log` first
    ///
    /// `log` only runs when the document exists. Returns whether a document
    /// was removed.
    pub fn remove_logged<F>(&self, id: &str, log: F) -> Result<bool>
    where
        F: FnOnce() -> Result<()>,
    {
        let mut documents = self.documents.write();
        if !documents.contains_key(id) {
            return Ok(false);
        }
        log()?;
        documents.remove(id);
        Ok(true)
    }

    /// Insert or overwrite without logging (replay)
    pub fn put(&self, document: Document) {
        self.documents.write().insert(document.id.clone(), document);
    }

    /// Remove without logging (replay); absent IDs are a no-op
    pub fn remove(&self, id: &str) -> Option<Document> {
        self.documents.write().remove(id)
    }

    /// Documents matching `filter`, ascending by ID, truncated to `limit` when non-zero
    pub fn query(&self, filter: &Filter, limit: usize) -> Vec<Document> {
        let documents = self.documents.read();
        query::select(documents.values(), filter, limit)
    }

    /// Clone of every document, keyed by ID
    pub fn documents(&self) -> HashMap<String, Document> {
        self.documents.read().clone()
    }

    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }
}
