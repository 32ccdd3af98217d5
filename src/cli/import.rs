use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;
use std::path::Path;
use tokio_util::sync::CancellationToken;

use shelfsense::config::ShelfConfig;
use shelfsense::index::Metadata;

/// One catalog entry. Embeddings come from the external embedding model.
#[derive(Debug, Deserialize)]
struct CatalogEntry {
    product_id: String,
    embedding: Vec<f32>,
    #[serde(default)]
    metadata: Metadata,
}

/// Import catalog embeddings from a JSON file and save the snapshot.
///
/// Entries that fail validation (wrong dimension, zero vector) are skipped
/// with a warning. Existing records are kept; new ones get the next slots.
pub async fn import(config: &ShelfConfig, file: &Path, cancel: &CancellationToken) -> Result<()> {
    let entries: Vec<CatalogEntry> = super::read_json(file)?;
    let index = super::open_index(config, cancel).await?;
    let before = index.len();

    println!("Importing {} catalog entries...", entries.len());

    let pb = ProgressBar::new(entries.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  {bar:40.cyan/blue} {pos}/{len} ({eta})")?
            .progress_chars("##-"),
    );

    let mut imported = 0u64;
    let mut skipped = 0u64;
    for entry in entries {
        anyhow::ensure!(!cancel.is_cancelled(), "import cancelled");
        match index.add_product(&entry.product_id, &entry.embedding, entry.metadata) {
            Ok(_) => imported += 1,
            Err(e) => {
                pb.suspend(|| eprintln!("Warning: skipping {}: {e}", entry.product_id));
                skipped += 1;
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    super::save_index(&index, &config.resolved_snapshot_path(), cancel).await?;

    println!("Import complete:");
    println!("  Records before:    {before}");
    println!("  Products imported: {imported}");
    if skipped > 0 {
        println!("  Products skipped:  {skipped}");
    }
    println!("  Records now:       {}", index.len());

    Ok(())
}
