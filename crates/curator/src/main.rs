//! Curator CLI - bulk image ingestion into object storage and a catalog.
//!
//! Curator walks a folder of source images, derives a preview and a download
//! artifact for each, uploads both to an S3-compatible bucket and inserts one
//! catalog record per image. Re-running a command skips everything already
//! cataloged.
//!
//! # Usage
//!
//! ```bash
//! # Ingest one category
//! curator ingest ./wallpapers/nature --category nature --device desktop
//!
//! # Every subfolder is a category; transform only, keep the artifacts
//! curator ingest ./wallpapers --all-categories --device mobile \
//!     --dry-run --output-dir ./out
//!
//! # Upload what a previous dry run produced
//! curator ingest ./out/nature --category nature --device mobile --from-output
//!
//! # View configuration
//! curator config show
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;
mod logging;

/// Curator - transcode, upload and catalog images in bulk.
#[derive(Parser, Debug)]
#[command(name = "curator")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    /// Config file to use instead of the default location
    #[arg(long, global = true, env = "CURATOR_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Transform, upload and catalog a folder of images
    Ingest(cli::ingest::IngestArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so config warnings go through eprintln.
    let config = match cli::load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) if cli.config.is_some() => return Err(e),
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `curator config path`."
            );
            curator_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Curator v{}", curator_core::VERSION);

    match cli.command {
        Commands::Ingest(args) => cli::ingest::execute(args, config).await,
        Commands::Config(args) => cli::config::execute(args, cli.config.as_deref()).await,
    }
}
