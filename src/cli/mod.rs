pub mod analyze;
pub mod doctor;
pub mod export;
pub mod import;
pub mod search;
pub mod stats;

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use shelfsense::config::ShelfConfig;
use shelfsense::index::{LoadOutcome, SimilarityIndex};

/// Open the configured index, loading the snapshot if one exists.
///
/// A missing snapshot yields an empty index. A snapshot that exists but does
/// not load is an error; `doctor` explains what is wrong with it.
pub async fn open_index(
    config: &ShelfConfig,
    cancel: &CancellationToken,
) -> Result<Arc<SimilarityIndex>> {
    let index = Arc::new(SimilarityIndex::from_config(&config.index)?);
    let path = config.resolved_snapshot_path();

    if !path.exists() {
        tracing::info!(path = %path.display(), "no snapshot yet, starting with an empty index");
        return Ok(index);
    }

    let idx = Arc::clone(&index);
    let token = cancel.clone();
    let load_path = path.clone();
    tokio::task::spawn_blocking(move || idx.load(&load_path, &token))
        .await
        .context("snapshot load task failed")?
        .with_context(|| format!("failed to load snapshot {}", path.display()))?;

    Ok(index)
}

/// Load the snapshot, falling back to an empty index if it is unusable.
pub async fn open_index_lenient(
    config: &ShelfConfig,
    cancel: &CancellationToken,
) -> Result<(Arc<SimilarityIndex>, LoadOutcome)> {
    let index = Arc::new(SimilarityIndex::from_config(&config.index)?);
    let path = config.resolved_snapshot_path();

    let idx = Arc::clone(&index);
    let token = cancel.clone();
    let outcome = tokio::task::spawn_blocking(move || idx.load_or_empty(&path, &token))
        .await
        .context("snapshot load task failed")?;

    Ok((index, outcome))
}

/// Save the index to `path` on the blocking pool.
pub async fn save_index(
    index: &Arc<SimilarityIndex>,
    path: &Path,
    cancel: &CancellationToken,
) -> Result<()> {
    let idx = Arc::clone(index);
    let token = cancel.clone();
    let save_path = path.to_path_buf();
    let info = tokio::task::spawn_blocking(move || idx.save(&save_path, &token))
        .await
        .context("snapshot save task failed")?
        .with_context(|| format!("failed to save snapshot {}", path.display()))?;

    eprintln!(
        "Saved {} records ({} dims) to {}",
        info.record_count,
        info.dimension,
        path.display()
    );
    Ok(())
}

/// Read and parse a JSON input file.
pub fn read_json<T: serde::de::DeserializeOwned>(file: &Path) -> Result<T> {
    let json = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    serde_json::from_str(&json).with_context(|| format!("failed to parse {}", file.display()))
}

pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
