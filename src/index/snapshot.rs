//! Single-file index snapshots.
//!
//! A snapshot is a small SQLite database with two tables: `snapshot_meta`
//! (format version, dimension, record count, save time) and `vector_records`
//! (one row per slot, embedding stored as little-endian `f32` bytes).
//!
//! Writes go to a sibling `*.tmp` file inside one transaction and are renamed
//! over the destination only after commit. Reads stage and validate the whole
//! snapshot before anything is handed back to the index.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OpenFlags};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use super::store::{Metadata, VectorStore};
use crate::error::PersistenceError;

/// Snapshot layout version written by this build.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// Stored embeddings must be unit length within this tolerance.
const NORM_TOLERANCE: f64 = 1e-3;

const SCHEMA_SQL: &str = r#"
CREATE TABLE snapshot_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE vector_records (
    slot INTEGER PRIMARY KEY,
    product_id TEXT NOT NULL,
    metadata TEXT NOT NULL,
    embedding BLOB NOT NULL
);
"#;

/// Header of a snapshot file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotInfo {
    pub format_version: u32,
    pub dimension: usize,
    pub record_count: usize,
    /// RFC 3339 timestamp of the save.
    pub saved_at: String,
}

/// Result of [`SimilarityIndex::load_or_empty`](super::SimilarityIndex::load_or_empty).
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    Loaded(SnapshotInfo),
    /// The snapshot was unusable and the index was reset to empty.
    Empty { reason: String },
}

impl LoadOutcome {
    pub fn record_count(&self) -> usize {
        match self {
            Self::Loaded(info) => info.record_count,
            Self::Empty { .. } => 0,
        }
    }
}

type SnapshotResult<T> = Result<T, PersistenceError>;

/// Write `store` to `destination`, replacing any previous snapshot atomically.
pub(crate) fn write(
    store: &VectorStore,
    destination: &Path,
    cancel: &CancellationToken,
) -> SnapshotResult<SnapshotInfo> {
    if let Some(parent) = destination.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let tmp = temp_path(destination);
    if tmp.exists() {
        std::fs::remove_file(&tmp)?;
    }

    let result = write_temp(store, &tmp, cancel)
        .and_then(|info| std::fs::rename(&tmp, destination).map(|()| info).map_err(Into::into));
    if result.is_err() {
        remove_temp(&tmp);
    }
    result
}

fn remove_temp(tmp: &Path) {
    if let Err(e) = std::fs::remove_file(tmp) {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::debug!(path = %tmp.display(), error = %e, "temp snapshot not removed");
        }
    }
}

/// Write the full snapshot into `tmp`. The connection is closed on return.
fn write_temp(
    store: &VectorStore,
    tmp: &Path,
    cancel: &CancellationToken,
) -> SnapshotResult<SnapshotInfo> {
    let mut conn = Connection::open(tmp)?;
    conn.execute_batch(SCHEMA_SQL)?;

    let info = SnapshotInfo {
        format_version: SNAPSHOT_FORMAT_VERSION,
        dimension: store.dim(),
        record_count: store.len(),
        saved_at: chrono::Utc::now().to_rfc3339(),
    };

    let tx = conn.transaction()?;
    {
        let mut meta =
            tx.prepare("INSERT INTO snapshot_meta (key, value) VALUES (?1, ?2)")?;
        meta.execute(params!["format_version", info.format_version.to_string()])?;
        meta.execute(params!["dimension", info.dimension.to_string()])?;
        meta.execute(params!["record_count", info.record_count.to_string()])?;
        meta.execute(params!["saved_at", info.saved_at])?;

        let mut insert = tx.prepare(
            "INSERT INTO vector_records (slot, product_id, metadata, embedding) \
             VALUES (?1, ?2, ?3, ?4)",
        )?;
        for record in store.records() {
            if cancel.is_cancelled() {
                return Err(PersistenceError::Cancelled);
            }
            let metadata = serde_json::to_string(&record.metadata)?;
            insert.execute(params![
                record.slot as i64,
                record.product_id,
                metadata,
                encode_embedding(&record.embedding),
            ])?;
        }
    }
    if cancel.is_cancelled() {
        return Err(PersistenceError::Cancelled);
    }
    tx.commit()?;

    Ok(info)
}

/// Read and validate the snapshot at `source` into a fresh store.
pub(crate) fn read(
    source: &Path,
    expected_dim: usize,
    cancel: &CancellationToken,
) -> SnapshotResult<(VectorStore, SnapshotInfo)> {
    let conn = open_read_only(source)?;
    let info = read_info(&conn)?;

    if info.format_version != SNAPSHOT_FORMAT_VERSION {
        return Err(PersistenceError::UnsupportedVersion {
            found: info.format_version,
            expected: SNAPSHOT_FORMAT_VERSION,
        });
    }
    if info.dimension != expected_dim {
        return Err(PersistenceError::DimensionMismatch {
            found: info.dimension,
            expected: expected_dim,
        });
    }

    let mut store = VectorStore::new(info.dimension);
    let mut stmt = conn.prepare(
        "SELECT slot, product_id, metadata, embedding FROM vector_records ORDER BY slot",
    )?;
    let mut rows = stmt.query([])?;

    while let Some(row) = rows.next()? {
        if cancel.is_cancelled() {
            return Err(PersistenceError::Cancelled);
        }

        let slot: i64 = row.get(0)?;
        if slot != store.len() as i64 {
            return Err(PersistenceError::Corrupt(format!(
                "expected slot {}, found {slot}",
                store.len()
            )));
        }

        let product_id: String = row.get(1)?;
        let metadata_json: String = row.get(2)?;
        let metadata: Metadata = serde_json::from_str(&metadata_json)?;
        let blob: Vec<u8> = row.get(3)?;
        let embedding = decode_embedding(&blob, info.dimension).ok_or_else(|| {
            PersistenceError::Corrupt(format!(
                "slot {slot}: embedding blob is {} bytes, want {}",
                blob.len(),
                info.dimension * 4
            ))
        })?;
        check_unit_norm(slot, &embedding)?;

        store
            .push(product_id, metadata, &embedding)
            .map_err(|e| PersistenceError::Corrupt(format!("slot {slot}: {e}")))?;
    }

    if store.len() != info.record_count {
        return Err(PersistenceError::Corrupt(format!(
            "header promises {} records, found {}",
            info.record_count,
            store.len()
        )));
    }

    Ok((store, info))
}

/// Read only the header of a snapshot.
pub fn inspect(source: &Path) -> SnapshotResult<SnapshotInfo> {
    let conn = open_read_only(source)?;
    read_info(&conn)
}

fn open_read_only(source: &Path) -> SnapshotResult<Connection> {
    if !source.exists() {
        return Err(PersistenceError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("no snapshot at {}", source.display()),
        )));
    }
    let conn = Connection::open_with_flags(
        source,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    Ok(conn)
}

fn read_info(conn: &Connection) -> SnapshotResult<SnapshotInfo> {
    Ok(SnapshotInfo {
        format_version: parse_meta(conn, "format_version")?,
        dimension: parse_meta(conn, "dimension")?,
        record_count: parse_meta(conn, "record_count")?,
        saved_at: get_meta(conn, "saved_at")?,
    })
}

fn get_meta(conn: &Connection, key: &str) -> SnapshotResult<String> {
    match conn.query_row(
        "SELECT value FROM snapshot_meta WHERE key = ?1",
        [key],
        |row| row.get::<_, String>(0),
    ) {
        Ok(val) => Ok(val),
        Err(rusqlite::Error::QueryReturnedNoRows) => Err(PersistenceError::Corrupt(format!(
            "snapshot header missing {key}"
        ))),
        Err(e) => Err(e.into()),
    }
}

fn parse_meta<T: std::str::FromStr>(conn: &Connection, key: &str) -> SnapshotResult<T> {
    let raw = get_meta(conn, key)?;
    raw.parse()
        .map_err(|_| PersistenceError::Corrupt(format!("snapshot header {key}={raw:?} is not a number")))
}

fn check_unit_norm(slot: i64, embedding: &[f32]) -> SnapshotResult<()> {
    let norm = embedding
        .iter()
        .map(|x| (*x as f64) * (*x as f64))
        .sum::<f64>()
        .sqrt();
    if !norm.is_finite() || (norm - 1.0).abs() > NORM_TOLERANCE {
        return Err(PersistenceError::Corrupt(format!(
            "slot {slot}: embedding norm {norm} is not unit length"
        )));
    }
    Ok(())
}

fn temp_path(destination: &Path) -> PathBuf {
    let mut name = OsString::from(destination.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn decode_embedding(bytes: &[u8], dim: usize) -> Option<Vec<f32>> {
    if bytes.len() != dim * 4 {
        return None;
    }
    Some(
        bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
    )
}
