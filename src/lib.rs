//! # HelixDB
//!
//! An embedded JSON document store with:
//! - Write-Ahead Logging (WAL) for durability, fsync before acknowledge
//! - Full-state snapshots refreshed by a background worker
//! - Crash recovery: snapshot load, then full WAL replay
//! - Per-collection reader/writer locking
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Caller (HTTP layer, CLI)                    │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                        Engine                                │
//! │        insert / get / delete / query / list / close          │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │     WAL     │  then    │   Catalog   │
//!   │(append+sync)│ ───────► │ Collections │
//!   └─────────────┘          └──────┬──────┘
//!                                   │ background
//!                                   ▼
//!                           ┌─────────────┐
//!                           │  Snapshot   │
//!                           │ (tmp+rename)│
//!                           └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod document;
pub mod query;
pub mod collection;
pub mod wal;
pub mod snapshot;
pub mod recovery;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{HelixError, Result};
pub use config::{Config, RecoveryPolicy};
pub use document::Document;
pub use query::Filter;
pub use engine::Engine;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of HelixDB
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
