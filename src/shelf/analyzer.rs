//! Shelf analysis orchestration.
//!
//! [`ShelfAnalyzer`] composes validation, classification, and alerting into a
//! single call per frame. Collaborators (detector, embedding model,
//! similarity index) are handed in at construction; the analyzer holds no
//! mutable state and can be shared across threads.

use std::sync::Arc;

use rayon::prelude::*;

use crate::embedding::EmbeddingProvider;
use crate::error::{Error, Result};
use crate::index::{SearchHit, SimilarityIndex};
use crate::shelf::alerts::{generate_alerts, AlertThresholds};
use crate::shelf::classifier::{classify, validate_detections};
use crate::shelf::types::{DetectionCandidate, DetectionMatch, ImageFrame, ShelfAnalysis, ShelfLabel};

/// Tuning knobs forwarded to the detector. The core does not interpret them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorParams {
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.5,
            iou_threshold: 0.45,
        }
    }
}

impl From<&crate::config::DetectorConfig> for DetectorParams {
    fn from(config: &crate::config::DetectorConfig) -> Self {
        Self {
            confidence_threshold: config.confidence_threshold,
            iou_threshold: config.iou_threshold,
        }
    }
}

/// Object detector boundary: one frame in, candidates out.
///
/// Candidates should carry normalized boxes and, where available, crops.
pub trait Detector: Send + Sync {
    fn detect(
        &self,
        image: &ImageFrame,
        params: &DetectorParams,
    ) -> anyhow::Result<Vec<DetectionCandidate>>;
}

struct Resolver {
    index: Arc<SimilarityIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
}

pub struct ShelfAnalyzer {
    thresholds: AlertThresholds,
    detector_params: DetectorParams,
    detector: Option<Arc<dyn Detector>>,
    resolver: Option<Resolver>,
    resolve_ambiguous: bool,
}

impl ShelfAnalyzer {
    pub fn new(thresholds: AlertThresholds) -> Self {
        Self {
            thresholds,
            detector_params: DetectorParams::default(),
            detector: None,
            resolver: None,
            resolve_ambiguous: true,
        }
    }

    /// Build from config. Resolution still needs [`with_resolver`](Self::with_resolver).
    pub fn from_config(config: &crate::config::ShelfConfig) -> Self {
        Self::new(AlertThresholds::from(&config.analysis))
            .with_detector_params(DetectorParams::from(&config.detector))
            .with_resolution(config.analysis.resolve_ambiguous)
    }

    pub fn with_detector(mut self, detector: Arc<dyn Detector>) -> Self {
        self.detector = Some(detector);
        self
    }

    pub fn with_detector_params(mut self, params: DetectorParams) -> Self {
        self.detector_params = params;
        self
    }

    /// Enable catalog lookup for ambiguous detections.
    pub fn with_resolver(
        mut self,
        index: Arc<SimilarityIndex>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        self.resolver = Some(Resolver { index, embedder });
        self
    }

    /// Turn catalog lookup on or off without dropping the resolver.
    pub fn with_resolution(mut self, enabled: bool) -> Self {
        self.resolve_ambiguous = enabled;
        self
    }

    pub fn thresholds(&self) -> &AlertThresholds {
        &self.thresholds
    }

    /// Run the detector on one frame and analyze what it found.
    pub fn analyze_frame(&self, image: &ImageFrame) -> Result<ShelfAnalysis> {
        let detector = self
            .detector
            .as_ref()
            .ok_or_else(|| Error::InvalidArgument("no detector configured".into()))?;
        let detections = detector
            .detect(image, &self.detector_params)
            .map_err(|e| Error::Detector(format!("{e:#}")))?;
        self.analyze_detections(detections)
    }

    /// Analyze frames independently, in parallel. Results keep input order.
    pub fn analyze_batch(&self, images: &[ImageFrame]) -> Vec<Result<ShelfAnalysis>> {
        images
            .par_iter()
            .map(|image| self.analyze_frame(image))
            .collect()
    }

    /// Validate, classify, alert, and optionally resolve one detection list.
    pub fn analyze_detections(&self, detections: Vec<DetectionCandidate>) -> Result<ShelfAnalysis> {
        validate_detections(&detections)?;

        let classified = classify(&detections);
        let alerts = generate_alerts(&classified, &self.thresholds);
        let resolutions = match &self.resolver {
            Some(resolver) if self.resolve_ambiguous => {
                self.resolve(resolver, &classified.products, &classified.misplaced)
            }
            _ => Vec::new(),
        };

        tracing::debug!(
            detections = detections.len(),
            products = classified.summary.total_products,
            empty_slots = classified.summary.empty_slots,
            misplaced = classified.summary.misplaced_items,
            occupancy = classified.occupancy_rate,
            alerts = alerts.len(),
            resolved = resolutions.len(),
            "shelf analyzed"
        );

        Ok(ShelfAnalysis {
            detections,
            products: classified.products,
            empty_slots: classified.empty_slots,
            misplaced: classified.misplaced,
            summary: classified.summary,
            occupancy_rate: classified.occupancy_rate,
            out_of_stock_rate: classified.out_of_stock_rate,
            alerts,
            resolutions,
        })
    }

    /// Look up low-confidence products and misplaced items that carry a crop.
    ///
    /// Best effort: a crop that fails to embed or search is logged and skipped.
    fn resolve(
        &self,
        resolver: &Resolver,
        products: &[DetectionCandidate],
        misplaced: &[DetectionCandidate],
    ) -> Vec<DetectionMatch> {
        if resolver.index.is_empty() {
            return Vec::new();
        }

        let ambiguous = products
            .iter()
            .enumerate()
            .filter(|(_, d)| d.confidence < self.thresholds.min_product_confidence)
            .map(|(i, d)| (ShelfLabel::Product, i, d))
            .chain(
                misplaced
                    .iter()
                    .enumerate()
                    .map(|(i, d)| (ShelfLabel::Misplaced, i, d)),
            );

        ambiguous
            .filter_map(|(label, position, det)| {
                let crop = det.crop.as_ref()?;
                match lookup(resolver, crop) {
                    Ok(hit) => hit.map(|hit| DetectionMatch {
                        label,
                        position,
                        hit,
                    }),
                    Err(e) => {
                        tracing::warn!(%label, position, error = %e, "catalog lookup failed, skipping");
                        None
                    }
                }
            })
            .collect()
    }
}

fn lookup(resolver: &Resolver, crop: &ImageFrame) -> Result<Option<SearchHit>> {
    let embedding = resolver
        .embedder
        .embed_image(crop)
        .map_err(|e| Error::Embedding(format!("{e:#}")))?;
    Ok(resolver.index.search(&embedding, 1, None)?.into_iter().next())
}
