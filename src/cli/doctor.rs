//! CLI `doctor` command: verify the index snapshot and print a health report.

use anyhow::Result;
use tokio_util::sync::CancellationToken;

use shelfsense::config::ShelfConfig;
use shelfsense::index::{snapshot, LoadOutcome};

/// Verify the snapshot loads cleanly and print a health report.
pub async fn doctor(config: &ShelfConfig, cancel: &CancellationToken) -> Result<()> {
    let path = config.resolved_snapshot_path();

    if !path.exists() {
        println!("Snapshot: not found at {}", path.display());
        println!("Run `shelfsense index import <catalog.json>` to create one.");
        return Ok(());
    }

    let file_size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);

    println!("ShelfSense Health Report");
    println!("========================");
    println!();
    println!("Snapshot:          {}", path.display());
    println!("File size:         {}", super::format_bytes(file_size));

    match snapshot::inspect(&path) {
        Ok(info) => {
            println!("Format version:    {}", info.format_version);
            println!("Records (header):  {}", info.record_count);
            println!("Dimension:");
            println!("  Stored:          {}", info.dimension);
            println!("  Configured:      {}", config.index.embedding_dimension);
            if info.dimension != config.index.embedding_dimension {
                println!("  WARNING: dimension mismatch! Re-import the catalog with the configured model.");
            }
            println!("Saved at:          {}", info.saved_at);
        }
        Err(e) => println!("Header:            UNREADABLE ({e})"),
    }
    println!();

    let (index, outcome) = super::open_index_lenient(config, cancel).await?;
    match outcome {
        LoadOutcome::Loaded(info) => {
            println!("Full load check:   PASSED ({} records)", info.record_count);
            println!("In memory:         {} records", index.len());
        }
        LoadOutcome::Empty { reason } => {
            println!("Full load check:   FAILED ({reason})");
            println!();
            println!("Recovery steps:");
            println!("  1. Restore the snapshot from a backup copy.");
            println!("  2. Or rebuild it from the catalog:");
            println!("     rm {}", path.display());
            println!("     shelfsense index import catalog.json");
        }
    }

    Ok(())
}
