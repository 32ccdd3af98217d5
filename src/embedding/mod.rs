//! Embedding collaborator boundary and vector primitives.
//!
//! The embedding model itself lives outside this crate. It is reached through
//! the [`EmbeddingProvider`] trait, which maps an image or a text query into
//! a vector of the index dimension. Everything compared by inner product is
//! L2-normalized first, so inner product and cosine similarity coincide.

use crate::error::{Error, Result};
use crate::shelf::types::ImageFrame;

/// Default embedding width (CLIP ViT-B/32).
pub const DEFAULT_EMBEDDING_DIM: usize = 512;

/// Maps images and text into a shared embedding space.
///
/// Implementations should return vectors of exactly [`dimensions`](Self::dimensions)
/// components. They need not be normalized; the index normalizes on the way in.
/// All methods are synchronous. Callers in async contexts should use
/// `tokio::task::spawn_blocking`.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a product image (typically a detection crop).
    fn embed_image(&self, image: &ImageFrame) -> anyhow::Result<Vec<f32>>;

    /// Embed a text query into the same space as images.
    fn embed_text(&self, text: &str) -> anyhow::Result<Vec<f32>>;

    /// Embed a batch of texts. Implementations may override for batched inference.
    fn embed_text_batch(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed_text(t)).collect()
    }

    /// Number of dimensions this provider produces.
    fn dimensions(&self) -> usize {
        DEFAULT_EMBEDDING_DIM
    }
}

/// L2-normalize a vector. Returns the input unchanged if its norm is zero.
pub fn l2_normalize(v: &[f32]) -> Vec<f32> {
    let norm = l2_norm(v);
    if norm > 0.0 {
        v.iter().map(|x| (*x as f64 / norm) as f32).collect()
    } else {
        v.to_vec()
    }
}

/// Normalize a vector that is about to be stored or compared.
///
/// Fails for empty, zero-norm, or non-finite input, none of which have a
/// direction to compare.
pub fn normalized(v: &[f32]) -> Result<Vec<f32>> {
    if v.is_empty() {
        return Err(Error::InvalidEmbedding("empty vector".into()));
    }
    if v.iter().any(|x| !x.is_finite()) {
        return Err(Error::InvalidEmbedding("vector contains NaN or infinity".into()));
    }
    let norm = l2_norm(v);
    if norm == 0.0 || !norm.is_finite() {
        return Err(Error::InvalidEmbedding("vector has zero norm".into()));
    }
    Ok(v.iter().map(|x| (*x as f64 / norm) as f32).collect())
}

fn l2_norm(v: &[f32]) -> f64 {
    v.iter().map(|x| (*x as f64) * (*x as f64)).sum::<f64>().sqrt()
}

/// Inner product of two vectors of equal length, in f64 and clamped to `[-1, 1]`.
///
/// Both inputs must already be normalized.
pub(crate) fn inner_product(a: &[f32], b: &[f32]) -> f32 {
    let dot: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| *x as f64 * *y as f64)
        .sum();
    dot.clamp(-1.0, 1.0) as f32
}

/// Remap a cosine similarity in `[-1, 1]` to a score in `[0, 1]`.
pub fn similarity_to_score(similarity: f32) -> f32 {
    ((similarity + 1.0) / 2.0).clamp(0.0, 1.0)
}

/// Compare two embeddings and return the remapped similarity score in `[0, 1]`.
///
/// Pure: neither input is modified and no index state is involved. Both
/// vectors are normalized before the inner product, so `compare_embeddings(e, e)`
/// is 1.0 for any non-zero `e`.
pub fn compare_embeddings(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(Error::InvalidArgument(format!(
            "cannot compare embeddings of dimension {} and {}",
            a.len(),
            b.len()
        )));
    }
    let a = normalized(a).map_err(|e| Error::InvalidArgument(e.to_string()))?;
    let b = normalized(b).map_err(|e| Error::InvalidArgument(e.to_string()))?;
    Ok(similarity_to_score(inner_product(&a, &b)))
}
