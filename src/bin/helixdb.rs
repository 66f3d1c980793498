//! HelixDB CLI
//!
//! Opens the store in-process and runs one operation against it.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use helixdb::config::DEFAULT_CONFIG_FILE;
use helixdb::{Config, Engine, Filter, HelixError};
use serde::Serialize;
use serde_json::{json, Value};
use tracing_subscriber::{fmt, EnvFilter};

/// HelixDB
#[derive(Parser, Debug)]
#[command(name = "helixdb")]
#[command(about = "Embedded JSON document store")]
#[command(version)]
struct Args {
    /// Configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Snapshot file (overrides the config file)
    #[arg(long)]
    data_file: Option<PathBuf>,

    /// WAL directory (overrides the config file)
    #[arg(long)]
    wal_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Insert or overwrite a document
    Insert {
        /// Target collection
        collection: String,

        /// Document body as JSON
        data: String,

        /// Document ID (generated when omitted)
        #[arg(long)]
        id: Option<String>,
    },

    /// Get a document by ID
    Get { collection: String, id: String },

    /// Delete a document by ID
    Delete { collection: String, id: String },

    /// Find documents by exact field match
    Query {
        collection: String,

        /// JSON object of field → value
        #[arg(short, long)]
        filter: Option<String>,

        /// Maximum number of results (0 = all)
        #[arg(short, long, default_value = "0")]
        limit: usize,
    },

    /// List every document of a collection
    List { collection: String },

    /// List collection names
    Collections,

    /// Run recovery and print what it found
    Recover,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let mut config = match Config::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(path) = args.data_file {
        config.snapshot_path = path;
    }
    if let Some(dir) = args.wal_dir {
        config.wal_dir = dir;
    }

    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("HelixDB v{}", helixdb::VERSION);

    let engine = match Engine::open(config) {
        Ok(engine) => engine,
        Err(e) => {
            tracing::error!("Failed to open engine: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let outcome = run(&engine, args.command);

    if let Err(e) = engine.close() {
        tracing::error!("Failed to close engine: {}", e);
        return ExitCode::FAILURE;
    }

    match outcome {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

/// Execute one command; `Ok(false)` means "not found"
fn run(engine: &Engine, command: Commands) -> helixdb::Result<bool> {
    match command {
        Commands::Insert { collection, data, id } => {
            let data: Value = serde_json::from_str(&data)?;
            let id = id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            print_json(&engine.insert_document(&collection, &id, data)?)?;
        }
        Commands::Get { collection, id } => match engine.get_document(&collection, &id) {
            Some(document) => print_json(&document)?,
            None => {
                print_json(&json!({ "error": "document not found" }))?;
                return Ok(false);
            }
        },
        Commands::Delete { collection, id } => {
            let deleted = engine.delete_document(&collection, &id)?;
            print_json(&json!({ "deleted": deleted }))?;
            return Ok(deleted);
        }
        Commands::Query { collection, filter, limit } => {
            let filter = parse_filter(filter.as_deref())?;
            let documents = engine.query_documents(&collection, &filter, limit);
            print_json(&json!({
                "collection": collection,
                "count": documents.len(),
                "documents": documents,
            }))?;
        }
        Commands::List { collection } => {
            let documents = engine.list_documents(&collection);
            print_json(&json!({
                "collection": collection,
                "count": documents.len(),
                "documents": documents,
            }))?;
        }
        Commands::Collections => {
            print_json(&json!({ "collections": engine.list_collections() }))?;
        }
        Commands::Recover => {
            let report = engine.recovery_report();
            print_json(&json!({
                "snapshot": format!("{:?}", report.snapshot),
                "documentsLoaded": report.documents_loaded,
                "checksumMismatches": report.checksum_mismatches,
                "idMismatches": report.id_mismatches,
                "walEntriesRecovered": report.wal.entries_recovered,
                "walEntriesSkipped": report.wal.entries_corrupted,
                "walTruncated": report.wal.was_truncated,
            }))?;
        }
    }
    Ok(true)
}

fn parse_filter(raw: Option<&str>) -> helixdb::Result<Filter> {
    let Some(raw) = raw else {
        return Ok(Filter::new());
    };

    match serde_json::from_str(raw)? {
        Value::Object(filter) => Ok(filter),
        other => Err(HelixError::Serialization(format!(
            "filter must be a JSON object, got {}",
            other
        ))),
    }
}

fn print_json<T: Serialize>(value: &T) -> helixdb::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
