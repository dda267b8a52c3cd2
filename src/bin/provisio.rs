//! provisio command-line tool.
//!
//! Validates and applies schema manifests against a store.
//!
//! # Examples
//!
//! ```bash
//! # Check a manifest without touching any store
//! provisio validate --schema demos/rev_analyzer.json
//!
//! # Apply to the on-disk catalog
//! provisio apply --schema demos/rev_analyzer.json --data-dir data/provisio
//!
//! # Dry-run against an in-memory catalog
//! provisio apply --schema demos/rev_analyzer.json --backend memory
//!
//! # Show what a database currently contains
//! provisio inspect --db rev_analyzer --data-dir data/provisio
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use provisio::{BackendConfig, DbHandle, Manifest, Provisioner, Result, StoreBackend};
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Declarative schema provisioning for document stores
#[derive(Parser, Debug)]
#[command(name = "provisio")]
#[command(version)]
#[command(about = "Declarative schema provisioning for document stores", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info", env = "PROVISIO_LOG")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Parse and validate a schema manifest without touching any store
    Validate {
        /// Path to the schema manifest (JSON)
        #[arg(long, env = "PROVISIO_SCHEMA")]
        schema: PathBuf,
    },

    /// Apply a schema manifest to a store
    Apply {
        /// Path to the schema manifest (JSON)
        #[arg(long, env = "PROVISIO_SCHEMA")]
        schema: PathBuf,

        /// Target database (defaults to the manifest's database)
        #[arg(long, env = "PROVISIO_DB")]
        db: Option<String>,

        /// Store backend to apply against
        #[arg(long, value_enum, default_value_t = BackendKind::Fs)]
        backend: BackendKind,

        /// Data directory for the fs backend
        #[arg(long, default_value = "data/provisio", env = "PROVISIO_DATA_DIR")]
        data_dir: PathBuf,
    },

    /// Show the collections and indexes recorded for a database
    Inspect {
        /// Database to inspect
        #[arg(long, env = "PROVISIO_DB")]
        db: String,

        /// Data directory of the fs backend
        #[arg(long, default_value = "data/provisio", env = "PROVISIO_DATA_DIR")]
        data_dir: PathBuf,
    },
}

/// Store backends selectable from the command line.
#[derive(ValueEnum, Debug, Clone, Copy)]
enum BackendKind {
    /// Ephemeral in-memory catalog (dry runs)
    Memory,
    /// JSON catalog on local disk
    Fs,
}

impl BackendKind {
    fn config(self, data_dir: PathBuf) -> BackendConfig {
        match self {
            BackendKind::Memory => BackendConfig::Memory,
            BackendKind::Fs => BackendConfig::Fs { data_dir },
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    if let Err(e) = run(cli).await {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

fn init_logging(log_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Validate { schema } => validate_command(schema),
        Commands::Apply { schema, db, backend, data_dir } => {
            apply_command(schema, db, backend, data_dir).await
        }
        Commands::Inspect { db, data_dir } => inspect_command(db, data_dir).await,
    }
}

/// Validate command: parse the manifest and check every descriptor.
fn validate_command(schema: PathBuf) -> Result<()> {
    let manifest = Manifest::from_path(&schema)?;
    manifest.schema.validate()?;
    println!(
        "{}: ok ({} collections, {} indexes, database '{}')",
        schema.display(),
        manifest.schema.collections.len(),
        manifest.schema.index_count(),
        manifest.database,
    );
    Ok(())
}

/// Apply command: run a provisioning pass against the chosen backend.
async fn apply_command(
    schema: PathBuf,
    db: Option<String>,
    backend: BackendKind,
    data_dir: PathBuf,
) -> Result<()> {
    let manifest = Manifest::from_path(&schema)?;
    let db = DbHandle::new(db.unwrap_or_else(|| manifest.database.clone()));

    let prov = Provisioner::connect(&backend.config(data_dir))?;
    let report = prov.provision(&db, &manifest.schema).await?;
    if !prov.backend().capabilities().persistent {
        warn!("the applied state was not persisted; re-run against a persistent backend");
    }

    println!("{report}");
    Ok(())
}

/// Inspect command: print the on-disk catalog for one database.
async fn inspect_command(db: String, data_dir: PathBuf) -> Result<()> {
    let prov = Provisioner::open_fs(&data_dir)?;
    let db = DbHandle::new(db);
    let collections = prov.backend().list_collections(&db).await?;

    if collections.is_empty() {
        println!("database '{db}': no collections");
        return Ok(());
    }

    println!("database '{db}' ({} collections)", collections.len());
    for name in &collections {
        let indexes = prov.backend().list_indexes(&db, name).await?;
        println!("  {name}");
        for index in &indexes {
            println!("    {} {}", index.name, index.describe());
        }
    }
    Ok(())
}
