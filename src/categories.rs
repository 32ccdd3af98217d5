//! Zero-shot product category classification.
//!
//! Each category is turned into a text prompt ("a photo of beverages products
//! on a shelf"), embedded once through the [`EmbeddingProvider`], and kept as
//! a row of a normalized matrix. Classifying an image embedding is then a
//! single matrix-vector product against those rows.

use std::cmp::Ordering;

use ndarray::{Array2, ArrayView1};
use serde::Serialize;

use crate::embedding::{normalized, similarity_to_score, EmbeddingProvider};
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryPrediction {
    pub category: String,
    /// Cosine similarity between the image and the category prompt.
    pub confidence: f32,
    /// `confidence` remapped to `[0, 1]`.
    pub score: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct Classification {
    pub predictions: Vec<CategoryPrediction>,
    pub top_category: String,
    pub top_confidence: f32,
}

pub struct CategoryClassifier {
    categories: Vec<String>,
    prompts: Array2<f32>,
}

impl CategoryClassifier {
    /// Embed one prompt per category through `provider`.
    ///
    /// `{}` in `prompt_template` is replaced with the category label.
    pub fn new(
        categories: Vec<String>,
        prompt_template: &str,
        provider: &dyn EmbeddingProvider,
    ) -> Result<Self> {
        let prompts: Vec<String> = categories
            .iter()
            .map(|c| prompt_template.replace("{}", c))
            .collect();
        let refs: Vec<&str> = prompts.iter().map(String::as_str).collect();
        let embeddings = provider
            .embed_text_batch(&refs)
            .map_err(|e| Error::Embedding(format!("{e:#}")))?;

        tracing::info!(categories = categories.len(), "category prompts encoded");
        Self::from_embeddings(categories, embeddings)
    }

    /// Build from the `[categories]` config section.
    pub fn from_config(
        config: &crate::config::CategoriesConfig,
        provider: &dyn EmbeddingProvider,
    ) -> Result<Self> {
        Self::new(config.labels.clone(), &config.prompt_template, provider)
    }

    /// Build from precomputed prompt embeddings, one per category in order.
    pub fn from_embeddings(categories: Vec<String>, embeddings: Vec<Vec<f32>>) -> Result<Self> {
        if categories.is_empty() {
            return Err(Error::InvalidArgument("category list is empty".into()));
        }
        if categories.len() != embeddings.len() {
            return Err(Error::InvalidArgument(format!(
                "{} categories but {} prompt embeddings",
                categories.len(),
                embeddings.len()
            )));
        }

        let dim = embeddings[0].len();
        let mut flat = Vec::with_capacity(categories.len() * dim);
        for embedding in &embeddings {
            if embedding.len() != dim {
                return Err(Error::EmbeddingDimension {
                    got: embedding.len(),
                    want: dim,
                });
            }
            flat.extend(normalized(embedding)?);
        }
        let prompts = Array2::from_shape_vec((categories.len(), dim), flat)
            .map_err(|e| Error::InvalidEmbedding(e.to_string()))?;

        Ok(Self {
            categories,
            prompts,
        })
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn dimension(&self) -> usize {
        self.prompts.ncols()
    }

    /// Rank categories for one image embedding, most similar first.
    pub fn classify(&self, image_embedding: &[f32], top_k: usize) -> Result<Classification> {
        if top_k == 0 {
            return Err(Error::InvalidArgument("top_k must be positive".into()));
        }
        if image_embedding.len() != self.dimension() {
            return Err(Error::InvalidArgument(format!(
                "image embedding dimension {} does not match prompt dimension {}",
                image_embedding.len(),
                self.dimension()
            )));
        }
        let query =
            normalized(image_embedding).map_err(|e| Error::InvalidArgument(e.to_string()))?;

        let sims = self.prompts.dot(&ArrayView1::from(query.as_slice()));
        let mut ranked: Vec<(usize, f32)> = sims
            .iter()
            .enumerate()
            .map(|(i, s)| (i, s.clamp(-1.0, 1.0)))
            .collect();
        ranked.sort_by(|a, b| match b.1.total_cmp(&a.1) {
            Ordering::Equal => a.0.cmp(&b.0),
            other => other,
        });
        ranked.truncate(top_k);

        let predictions: Vec<CategoryPrediction> = ranked
            .into_iter()
            .map(|(i, sim)| CategoryPrediction {
                category: self.categories[i].clone(),
                confidence: sim,
                score: similarity_to_score(sim),
            })
            .collect();

        // at least one category exists and top_k >= 1
        let top = &predictions[0];
        Ok(Classification {
            top_category: top.category.clone(),
            top_confidence: top.confidence,
            predictions,
        })
    }

    pub fn classify_batch(
        &self,
        image_embeddings: &[Vec<f32>],
        top_k: usize,
    ) -> Result<Vec<Classification>> {
        image_embeddings
            .iter()
            .map(|e| self.classify(e, top_k))
            .collect()
    }
}
