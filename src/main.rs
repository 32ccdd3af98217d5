mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use shelfsense::config;

#[derive(Parser)]
#[command(name = "shelfsense", version, about = "Shelf analysis and visual product search")]
struct Cli {
    /// Config file (defaults to ~/.shelfsense/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze a JSON file of detector output and print the shelf analysis
    Analyze {
        /// Detections file: an array of candidates or {"detections": [...]}
        file: PathBuf,
    },
    /// Manage the product similarity index
    Index {
        #[command(subcommand)]
        action: IndexAction,
    },
    /// Verify the index snapshot and print a health report
    Doctor,
}

#[derive(Subcommand)]
enum IndexAction {
    /// Add catalog embeddings from a JSON file and save the snapshot
    Import { file: PathBuf },
    /// Search with a query embedding stored as a JSON array
    Search {
        file: PathBuf,
        #[arg(long, default_value_t = 5)]
        top_k: usize,
        /// Minimum cosine similarity (defaults to index.similarity_threshold)
        #[arg(long)]
        min_similarity: Option<f32>,
        /// Treat the query as a text embedding
        #[arg(long)]
        text: bool,
    },
    /// Dump every record as JSON
    Export,
    /// Show snapshot statistics
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config (for log level)
    let config = match &cli.config {
        Some(path) => config::ShelfConfig::load_from(path)?,
        None => config::ShelfConfig::load()?,
    };

    // Log to stderr so stdout stays clean for JSON output.
    let filter = EnvFilter::try_new(&config.logging.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Ctrl-C aborts an in-flight snapshot save or load without corrupting it.
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling");
            token.cancel();
        }
    });

    match cli.command {
        Command::Analyze { file } => cli::analyze::analyze(&config, &file)?,
        Command::Index { action } => match action {
            IndexAction::Import { file } => cli::import::import(&config, &file, &cancel).await?,
            IndexAction::Search {
                file,
                top_k,
                min_similarity,
                text,
            } => {
                cli::search::search(&config, &file, top_k, min_similarity, text, &cancel).await?
            }
            IndexAction::Export => cli::export::export(&config, &cancel).await?,
            IndexAction::Stats => cli::stats::stats(&config)?,
        },
        Command::Doctor => cli::doctor::doctor(&config, &cancel).await?,
    }

    Ok(())
}
