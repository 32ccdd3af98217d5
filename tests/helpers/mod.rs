#![allow(dead_code)]

use std::sync::Arc;

use shelfsense::index::{Metadata, SimilarityIndex};
use shelfsense::shelf::{BoundingBox, DetectionCandidate};

pub const DIM: usize = 64;

/// A fresh index of [`DIM`] dimensions with no default similarity floor.
pub fn test_index() -> Arc<SimilarityIndex> {
    Arc::new(SimilarityIndex::new(DIM, -1.0).unwrap())
}

/// Generate a deterministic embedding with a spike at position `seed`.
/// Distinct seeds produce orthogonal vectors.
pub fn test_embedding(seed: usize) -> Vec<f32> {
    let mut v = vec![0.0f32; DIM];
    v[seed % DIM] = 1.0;
    v
}

/// Generate an embedding close to `base` (cosine similarity well above 0.9).
pub fn similar_embedding(base: &[f32]) -> Vec<f32> {
    let mut v = base.to_vec();
    let n = v.len();
    for i in 0..5 {
        v[(i * 13 + 7) % n] += 0.05;
    }
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    for x in &mut v {
        *x /= norm;
    }
    v
}

pub fn metadata(name: &str) -> Metadata {
    let mut m = Metadata::new();
    m.insert("name".into(), serde_json::json!(name));
    m
}

/// Add `n` products with spike embeddings at seeds `0..n`.
pub fn seed_products(index: &SimilarityIndex, n: usize) {
    for i in 0..n {
        index
            .add_product(&format!("sku-{i}"), &test_embedding(i), metadata(&format!("Product {i}")))
            .unwrap();
    }
}

pub fn detection(label: &str, confidence: f32) -> DetectionCandidate {
    DetectionCandidate::new(label, confidence, BoundingBox::new(0.1, 0.2, 0.3, 0.6))
}
