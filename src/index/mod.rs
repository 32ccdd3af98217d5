//! Visual similarity index over product embeddings.
//!
//! [`SimilarityIndex`] is an exact inner-product index: every query is scored
//! against every stored embedding, so top-k results and tie order are fully
//! deterministic. Embeddings are normalized on the way in, which makes the
//! inner product a cosine similarity in `[-1, 1]`.
//!
//! State lives behind a reader-writer lock. Searches share the read side;
//! adds, clears, and the final swap of a [`load`](SimilarityIndex::load) take
//! the write side. Snapshot I/O is in [`snapshot`].

pub mod snapshot;
pub mod store;

use std::cmp::Ordering;
use std::path::Path;

use parking_lot::RwLock;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::embedding::{normalized, similarity_to_score};
use crate::error::{Error, Result};
pub use snapshot::{LoadOutcome, SnapshotInfo};
pub use store::{Metadata, VectorRecord};
use store::VectorStore;

/// A single search result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub product_id: String,
    pub slot: usize,
    /// Cosine similarity in `[-1, 1]`.
    pub similarity: f32,
    /// `similarity` remapped to `[0, 1]`.
    pub score: f32,
    pub metadata: Metadata,
}

/// One entry of a batch add.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub product_id: String,
    pub embedding: Vec<f32>,
    pub metadata: Metadata,
}

/// Which embedding space a query came from. Only used for logging; both
/// spaces share the index dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QueryKind {
    Image,
    Text,
}

impl QueryKind {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Text => "text",
        }
    }
}

pub struct SimilarityIndex {
    state: RwLock<VectorStore>,
    default_min_similarity: f32,
}

impl SimilarityIndex {
    /// Create an empty index for `dimension`-wide embeddings.
    ///
    /// `default_min_similarity` applies to searches that pass no threshold.
    pub fn new(dimension: usize, default_min_similarity: f32) -> Result<Self> {
        if dimension == 0 {
            return Err(Error::InvalidArgument(
                "embedding dimension must be positive".into(),
            ));
        }
        Ok(Self {
            state: RwLock::new(VectorStore::new(dimension)),
            default_min_similarity,
        })
    }

    /// Create an empty index sized from the `[index]` config section.
    pub fn from_config(config: &crate::config::IndexConfig) -> Result<Self> {
        Self::new(config.embedding_dimension, config.similarity_threshold)
    }

    pub fn dimension(&self) -> usize {
        self.state.read().dim()
    }

    pub fn len(&self) -> usize {
        self.state.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn default_min_similarity(&self) -> f32 {
        self.default_min_similarity
    }

    /// Append a product embedding and return its slot.
    ///
    /// The embedding is L2-normalized before storage. Slots are handed out in
    /// call order starting at 0.
    pub fn add_product(
        &self,
        product_id: &str,
        embedding: &[f32],
        metadata: Metadata,
    ) -> Result<usize> {
        let mut state = self.state.write();
        let vector = check_embedding(embedding, state.dim())?;
        let slot = state.push(product_id.to_string(), metadata, &vector)?;
        tracing::debug!(slot, product_id, "product added to index");
        Ok(slot)
    }

    /// Append several products. The whole batch is validated before any
    /// record is appended, so either every product is added or none is.
    pub fn add_products(&self, products: Vec<NewProduct>) -> Result<Vec<usize>> {
        let mut state = self.state.write();
        let dim = state.dim();
        let vectors = products
            .iter()
            .map(|p| check_embedding(&p.embedding, dim))
            .collect::<Result<Vec<_>>>()?;

        let mut slots = Vec::with_capacity(products.len());
        for (product, vector) in products.into_iter().zip(vectors) {
            slots.push(state.push(product.product_id, product.metadata, &vector)?);
        }
        tracing::info!(added = slots.len(), total = state.len(), "product batch added to index");
        Ok(slots)
    }

    /// Return up to `top_k` products most similar to an image embedding.
    ///
    /// Results are ordered by descending similarity, then ascending slot.
    /// Hits below `min_similarity` (or the index default when `None`) are
    /// dropped. An empty index, or one with nothing above the threshold,
    /// yields an empty list.
    pub fn search(
        &self,
        query: &[f32],
        top_k: usize,
        min_similarity: Option<f32>,
    ) -> Result<Vec<SearchHit>> {
        self.rank(QueryKind::Image, query, top_k, min_similarity)
    }

    /// Cross-modal search with a text embedding. Same contract as [`search`](Self::search).
    pub fn search_by_text(
        &self,
        query: &[f32],
        top_k: usize,
        min_similarity: Option<f32>,
    ) -> Result<Vec<SearchHit>> {
        self.rank(QueryKind::Text, query, top_k, min_similarity)
    }

    fn rank(
        &self,
        kind: QueryKind,
        query: &[f32],
        top_k: usize,
        min_similarity: Option<f32>,
    ) -> Result<Vec<SearchHit>> {
        if top_k == 0 {
            return Err(Error::InvalidArgument("top_k must be positive".into()));
        }
        let threshold = min_similarity.unwrap_or(self.default_min_similarity);

        let state = self.state.read();
        if query.len() != state.dim() {
            return Err(Error::InvalidArgument(format!(
                "query dimension {} does not match index dimension {}",
                query.len(),
                state.dim()
            )));
        }
        let query = normalized(query).map_err(|e| Error::InvalidArgument(e.to_string()))?;

        if state.len() == 0 {
            return Ok(vec![]);
        }

        let scores = state.scores(&query);
        let mut ranked: Vec<(usize, f32)> = scores
            .iter()
            .enumerate()
            .map(|(slot, s)| (slot, s.clamp(-1.0, 1.0)))
            .filter(|(_, s)| *s >= threshold)
            .collect();

        ranked.sort_by(|a, b| match b.1.total_cmp(&a.1) {
            Ordering::Equal => a.0.cmp(&b.0),
            other => other,
        });
        ranked.truncate(top_k);

        tracing::debug!(
            query = kind.as_str(),
            top_k,
            threshold,
            hits = ranked.len(),
            "index search"
        );

        Ok(ranked
            .into_iter()
            .map(|(slot, similarity)| SearchHit {
                product_id: state.product_id(slot).to_string(),
                slot,
                similarity,
                score: similarity_to_score(similarity),
                metadata: state.metadata(slot).clone(),
            })
            .collect())
    }

    /// Fetch one record by slot.
    pub fn get(&self, slot: usize) -> Result<VectorRecord> {
        self.state
            .read()
            .record(slot)
            .ok_or_else(|| Error::NotFound(format!("no record at slot {slot}")))
    }

    /// Copy of every record in slot order.
    pub fn records(&self) -> Vec<VectorRecord> {
        self.state.read().records().collect()
    }

    /// Drop every record. The next add starts again at slot 0.
    pub fn clear(&self) {
        let mut state = self.state.write();
        let dim = state.dim();
        *state = VectorStore::new(dim);
        tracing::info!("index cleared");
    }

    /// Write every record to a snapshot at `destination`.
    ///
    /// The read lock is held for the whole write, so no add can interleave.
    /// The previous snapshot at `destination` survives any failure or
    /// cancellation.
    pub fn save(&self, destination: &Path, cancel: &CancellationToken) -> Result<SnapshotInfo> {
        let state = self.state.read();
        let info = snapshot::write(&state, destination, cancel)?;
        tracing::info!(
            path = %destination.display(),
            records = info.record_count,
            "index snapshot saved"
        );
        Ok(info)
    }

    /// Replace the in-memory state with the snapshot at `source`.
    ///
    /// The snapshot is read and validated before the write lock is taken.
    /// On any failure the index keeps exactly what it had before.
    pub fn load(&self, source: &Path, cancel: &CancellationToken) -> Result<SnapshotInfo> {
        let dim = self.dimension();
        let (staged, info) = snapshot::read(source, dim, cancel)?;
        *self.state.write() = staged;
        tracing::info!(
            path = %source.display(),
            records = info.record_count,
            "index snapshot loaded"
        );
        Ok(info)
    }

    /// Like [`load`](Self::load), but falls back to an empty index when the
    /// snapshot cannot be loaded. The failure is reported in the outcome.
    pub fn load_or_empty(&self, source: &Path, cancel: &CancellationToken) -> LoadOutcome {
        match self.load(source, cancel) {
            Ok(info) => LoadOutcome::Loaded(info),
            Err(e) => {
                tracing::warn!(
                    path = %source.display(),
                    error = %e,
                    "index snapshot unusable, starting empty"
                );
                self.clear();
                LoadOutcome::Empty { reason: e.to_string() }
            }
        }
    }
}

fn check_embedding(embedding: &[f32], dim: usize) -> Result<Vec<f32>> {
    if embedding.len() != dim {
        return Err(Error::EmbeddingDimension {
            got: embedding.len(),
            want: dim,
        });
    }
    normalized(embedding)
}
