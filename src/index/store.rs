//! Slot-addressed record storage backing the similarity index.
//!
//! Product ids and metadata sit in a `Vec` indexed by slot; embeddings sit in
//! one row-major `(len, dim)` matrix so a query is scored against every slot
//! with a single matrix-vector product. Slots are dense and append-only.

use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Free-form product attributes (name, SKU, price, category, ...).
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// A stored product embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    /// Dense 0-based insertion position. Never reused.
    pub slot: usize,
    pub product_id: String,
    #[serde(default)]
    pub metadata: Metadata,
    /// L2-normalized embedding.
    pub embedding: Vec<f32>,
}

#[derive(Debug, Clone)]
struct Entry {
    product_id: String,
    metadata: Metadata,
}

#[derive(Debug, Clone)]
pub(crate) struct VectorStore {
    dim: usize,
    entries: Vec<Entry>,
    matrix: Array2<f32>,
}

impl VectorStore {
    pub(crate) fn new(dim: usize) -> Self {
        Self {
            dim,
            entries: Vec::new(),
            matrix: Array2::zeros((0, dim)),
        }
    }

    pub(crate) fn dim(&self) -> usize {
        self.dim
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Append a normalized embedding. The caller has checked its dimension.
    pub(crate) fn push(
        &mut self,
        product_id: String,
        metadata: Metadata,
        embedding: &[f32],
    ) -> Result<usize> {
        self.matrix
            .push_row(ArrayView1::from(embedding))
            .map_err(|e| Error::InvalidEmbedding(format!("matrix append failed: {e}")))?;
        self.entries.push(Entry {
            product_id,
            metadata,
        });
        Ok(self.entries.len() - 1)
    }

    /// Inner product of `query` against every stored row, indexed by slot.
    pub(crate) fn scores(&self, query: &[f32]) -> Array1<f32> {
        self.matrix.dot(&ArrayView1::from(query))
    }

    pub(crate) fn product_id(&self, slot: usize) -> &str {
        &self.entries[slot].product_id
    }

    pub(crate) fn metadata(&self, slot: usize) -> &Metadata {
        &self.entries[slot].metadata
    }

    pub(crate) fn embedding(&self, slot: usize) -> Vec<f32> {
        self.matrix.index_axis(Axis(0), slot).to_vec()
    }

    pub(crate) fn record(&self, slot: usize) -> Option<VectorRecord> {
        let entry = self.entries.get(slot)?;
        Some(VectorRecord {
            slot,
            product_id: entry.product_id.clone(),
            metadata: entry.metadata.clone(),
            embedding: self.embedding(slot),
        })
    }

    pub(crate) fn records(&self) -> impl Iterator<Item = VectorRecord> + '_ {
        (0..self.len()).filter_map(move |slot| self.record(slot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_assigns_dense_slots() {
        let mut store = VectorStore::new(3);
        assert_eq!(store.push("a".into(), Metadata::new(), &[1.0, 0.0, 0.0]).unwrap(), 0);
        assert_eq!(store.push("b".into(), Metadata::new(), &[0.0, 1.0, 0.0]).unwrap(), 1);
        assert_eq!(store.len(), 2);
        assert_eq!(store.product_id(1), "b");
    }

    #[test]
    fn scores_follow_slot_order() {
        let mut store = VectorStore::new(2);
        store.push("x".into(), Metadata::new(), &[1.0, 0.0]).unwrap();
        store.push("y".into(), Metadata::new(), &[0.0, 1.0]).unwrap();
        let scores = store.scores(&[0.6, 0.8]);
        assert!((scores[0] - 0.6).abs() < 1e-6);
        assert!((scores[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn empty_store_scores_nothing() {
        let store = VectorStore::new(4);
        assert_eq!(store.scores(&[1.0, 0.0, 0.0, 0.0]).len(), 0);
        assert!(store.record(0).is_none());
    }

    #[test]
    fn record_round_trips_fields() {
        let mut store = VectorStore::new(2);
        let mut meta = Metadata::new();
        meta.insert("sku".into(), serde_json::json!("123"));
        store.push("p".into(), meta.clone(), &[0.0, 1.0]).unwrap();
        let rec = store.record(0).unwrap();
        assert_eq!(rec.slot, 0);
        assert_eq!(rec.metadata, meta);
        assert_eq!(rec.embedding, vec![0.0, 1.0]);
        assert_eq!(store.records().count(), 1);
    }
}
