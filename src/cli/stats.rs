use anyhow::{Context, Result};

use shelfsense::config::ShelfConfig;
use shelfsense::index::snapshot;

/// Display snapshot statistics in the terminal.
pub fn stats(config: &ShelfConfig) -> Result<()> {
    let path = config.resolved_snapshot_path();

    if !path.exists() {
        println!("No snapshot at {}", path.display());
        println!("Run `shelfsense index import <catalog.json>` to create one.");
        return Ok(());
    }

    let info = snapshot::inspect(&path)
        .with_context(|| format!("failed to read snapshot header {}", path.display()))?;
    let size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);

    println!("Index Statistics");
    println!("{}", "=".repeat(40));
    println!("  Snapshot:            {}", path.display());
    println!("  File size:           {}", super::format_bytes(size));
    println!("  Format version:      {}", info.format_version);
    println!("  Records:             {}", info.record_count);
    println!("  Dimension:           {}", info.dimension);
    println!("  Configured dim:      {}", config.index.embedding_dimension);
    println!("  Saved at:            {}", info.saved_at);
    println!("  Default threshold:   {}", config.index.similarity_threshold);

    Ok(())
}
