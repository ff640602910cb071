//! lockbadge: reference host for the lock status overlay.
//!
//! Plays the rendering collaborator's part: seeds the cache at startup, asks
//! it for status, prints badges, and flushes it at shutdown.
//!
//! ## Subcommands
//!
//! - `status`: print a badge line for each subject id
//! - `cached`: print the durable cache as stored on disk
//! - `set-key`: store the API key in settings.json

mod cached;
mod logging;
mod status;

use clap::{Parser, Subcommand};
use lockbadge_core::{Settings, StorageConfig};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "lockbadge")]
#[command(about = "Lock status overlay with a cached remote lookup")]
#[command(version)]
struct Cli {
    /// Base data directory (default: LOCKBADGE_DATA_DIR, DATA_DIR, or the platform data dir)
    #[arg(long, global = true, value_name = "PATH")]
    data_dir: Option<PathBuf>,

    /// API key for this run; overrides settings.json and LOCKBADGE_API_KEY
    #[arg(long, global = true, value_name = "KEY")]
    api_key: Option<String>,

    /// Lookup service base URL
    #[arg(long, global = true, value_name = "URL")]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print lock status for one or more subject ids
    Status {
        /// External subject ids to look up
        #[arg(value_name = "ID", required = true)]
        ids: Vec<String>,

        /// Print from the current snapshot without waiting for refreshes
        #[arg(long)]
        no_wait: bool,
    },

    /// Print the persisted cache without contacting the service
    Cached,

    /// Save the API key to settings.json
    SetKey {
        #[arg(value_name = "KEY")]
        key: String,
    },
}

fn main() {
    let cli = Cli::parse();
    let storage = match cli.data_dir {
        Some(dir) => StorageConfig::with_root(dir),
        None => StorageConfig::default(),
    };
    let _logging_guard = logging::init(&storage);

    let mut settings = Settings::load(&storage);
    if let Some(key) = cli.api_key {
        settings.api_key = key;
    }
    if let Some(url) = cli.base_url {
        settings.base_url = url;
    }

    let result = match cli.command {
        Commands::Status { ids, no_wait } => {
            let runtime = match tokio::runtime::Runtime::new() {
                Ok(runtime) => runtime,
                Err(err) => {
                    tracing::error!(error = %err, "Failed to start async runtime");
                    std::process::exit(1);
                }
            };
            status::run(&runtime, &storage, settings, &ids, !no_wait)
        }
        Commands::Cached => cached::run(&storage),
        Commands::SetKey { key } => {
            settings.api_key = key;
            settings.save(&storage)
        }
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "lockbadge failed");
        std::process::exit(1);
    }
}
