use anyhow::Result;
use std::path::Path;
use tokio_util::sync::CancellationToken;

use shelfsense::config::ShelfConfig;

/// Search the index with a query embedding read from a JSON array file.
pub async fn search(
    config: &ShelfConfig,
    file: &Path,
    top_k: usize,
    min_similarity: Option<f32>,
    text: bool,
    cancel: &CancellationToken,
) -> Result<()> {
    let query: Vec<f32> = super::read_json(file)?;
    let index = super::open_index(config, cancel).await?;

    let hits = if text {
        index.search_by_text(&query, top_k, min_similarity)?
    } else {
        index.search(&query, top_k, min_similarity)?
    };

    if hits.is_empty() {
        println!("No results found.");
        return Ok(());
    }

    println!("Found {} result(s) in {} records\n", hits.len(), index.len());

    for (i, hit) in hits.iter().enumerate() {
        println!(
            "  {}. {} (slot {}, similarity: {:.4}, score: {:.4})",
            i + 1,
            hit.product_id,
            hit.slot,
            hit.similarity,
            hit.score,
        );
        if !hit.metadata.is_empty() {
            println!("     {}", serde_json::to_string(&hit.metadata)?);
        }
        println!();
    }

    Ok(())
}
