use anyhow::Result;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use shelfsense::config::ShelfConfig;
use shelfsense::index::VectorRecord;

/// Export format: the index header plus every record in slot order.
#[derive(Debug, Serialize)]
struct ExportData {
    dimension: usize,
    records: Vec<VectorRecord>,
}

/// Export all records as JSON to stdout.
pub async fn export(config: &ShelfConfig, cancel: &CancellationToken) -> Result<()> {
    let index = super::open_index(config, cancel).await?;

    let data = ExportData {
        dimension: index.dimension(),
        records: index.records(),
    };

    let json = serde_json::to_string_pretty(&data)?;
    println!("{json}");

    eprintln!("Exported {} records.", data.records.len());

    Ok(())
}
