//! Collection Module
//!
//! In-memory document state.
//!
//! ## Responsibilities
//! - Hold every document of a collection behind its own RwLock
//! - Create collections lazily on first reference
//! - Apply replayed WAL entries
//! - Export and restore full state for snapshots
//!
//! ## Locking
//! ```text
//! Catalog   RwLock<HashMap<name, Arc<Collection>>>   (lookup / lazy create only)
//!    │
//!    ▼
//! Collection RwLock<HashMap<id, Document>>           (one per collection)
//! ```
//! The catalog lock is released before a collection lock is taken, so
//! unrelated collections are mutated fully in parallel.

mod table;
mod catalog;

pub use table::Collection;
pub use catalog::Catalog;
