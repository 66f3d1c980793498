//! Configuration for HelixDB
//!
//! Centralized configuration with sensible defaults, a builder for programmatic
//! use, and a loader for the JSON configuration file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{HelixError, Result};

/// Default configuration file name, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "helixdb.config.json";

/// Main configuration for a HelixDB engine
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Snapshot file holding the full state of every collection
    pub snapshot_path: PathBuf,

    /// Directory holding the write-ahead log
    /// Internal structure:
    ///   {wal_dir}/
    ///     └── current.wal
    pub wal_dir: PathBuf,

    // -------------------------------------------------------------------------
    // Recovery Configuration
    // -------------------------------------------------------------------------
    /// What to do with malformed WAL lines, snapshots, and checksum mismatches
    pub recovery_policy: RecoveryPolicy,

    /// Re-hash every document loaded from the snapshot
    pub verify_checksums: bool,

    // -------------------------------------------------------------------------
    // Logging Configuration
    // -------------------------------------------------------------------------
    /// Default log filter for the binary (overridden by `RUST_LOG`)
    pub log_level: String,
}

/// How recovery treats data it cannot trust
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecoveryPolicy {
    /// Abort startup on the first malformed record
    Strict,

    /// Log a warning, skip the record, keep going
    #[default]
    Lenient,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            snapshot_path: PathBuf::from("./data/helix.db"),
            wal_dir: PathBuf::from("./data/wal"),
            recovery_policy: RecoveryPolicy::Lenient,
            verify_checksums: true,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Load configuration from a JSON file
    ///
    /// A missing file yields the defaults. Keys absent from the file keep
    /// their default values.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("No config file at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(HelixError::Config(format!(
                    "reading {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        let file: FileConfig = serde_json::from_str(&raw).map_err(|e| {
            HelixError::Config(format!("parsing {}: {}", path.display(), e))
        })?;

        Ok(file.into_config())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the snapshot file path
    pub fn snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.snapshot_path = path.into();
        self
    }

    /// Set the WAL directory
    pub fn wal_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.wal_dir = path.into();
        self
    }

    /// Place both the snapshot (`helix.db`) and the WAL (`wal/`) under one directory
    pub fn data_dir(self, path: impl AsRef<Path>) -> Self {
        let dir = path.as_ref();
        self.snapshot_path(dir.join("helix.db")).wal_dir(dir.join("wal"))
    }

    /// Set the recovery policy
    pub fn recovery_policy(mut self, policy: RecoveryPolicy) -> Self {
        self.config.recovery_policy = policy;
        self
    }

    /// Enable or disable checksum verification of snapshot documents
    pub fn verify_checksums(mut self, verify: bool) -> Self {
        self.config.verify_checksums = verify;
        self
    }

    /// Set the default log level
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.log_level = level.into();
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

// =============================================================================
// File Format
// =============================================================================

/// On-disk shape of the configuration file
///
/// Sections this crate does not own (server, backup, security) are ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    storage: StorageSection,
    recovery: RecoverySection,
    logging: LoggingSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct StorageSection {
    data_file: Option<PathBuf>,
    wal_directory: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RecoverySection {
    verify_checksums: Option<bool>,
    policy: Option<RecoveryPolicy>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LoggingSection {
    level: Option<String>,
}

impl FileConfig {
    fn into_config(self) -> Config {
        let mut builder = Config::builder();

        if let Some(path) = self.storage.data_file {
            builder = builder.snapshot_path(path);
        }
        if let Some(dir) = self.storage.wal_directory {
            builder = builder.wal_dir(dir);
        }
        if let Some(verify) = self.recovery.verify_checksums {
            builder = builder.verify_checksums(verify);
        }
        if let Some(policy) = self.recovery.policy {
            builder = builder.recovery_policy(policy);
        }
        if let Some(level) = self.logging.level {
            builder = builder.log_level(level);
        }

        builder.build()
    }
}
