//! Detection partitioning and occupancy metrics.
//!
//! [`classify`] splits a detection list into products, empty slots, and
//! misplaced items in one pass and derives the occupancy rates.
//! [`validate_detections`] is the boundary check run before classification.

use crate::error::{Error, Result};
use crate::shelf::types::{DetectionCandidate, ShelfLabel, ShelfSummary};

/// Detections split by label, with the derived metrics.
#[derive(Debug, Clone, Default)]
pub struct Classified {
    pub products: Vec<DetectionCandidate>,
    pub empty_slots: Vec<DetectionCandidate>,
    pub misplaced: Vec<DetectionCandidate>,
    pub summary: ShelfSummary,
    pub occupancy_rate: f64,
    pub out_of_stock_rate: f64,
}

/// Reject malformed candidates before they reach classification.
///
/// Confidence and every box coordinate must be finite and within `[0, 1]`,
/// and the box corners must be ordered.
pub fn validate_detections(detections: &[DetectionCandidate]) -> Result<()> {
    for (index, det) in detections.iter().enumerate() {
        let invalid = |reason: String| Error::InvalidDetection { index, reason };

        if !det.confidence.is_finite() || !(0.0..=1.0).contains(&det.confidence) {
            return Err(invalid(format!(
                "confidence {} outside [0, 1]",
                det.confidence
            )));
        }

        let b = &det.bbox;
        for (name, v) in [("x1", b.x1), ("y1", b.y1), ("x2", b.x2), ("y2", b.y2)] {
            if !v.is_finite() || !(0.0..=1.0).contains(&v) {
                return Err(invalid(format!("box {name}={v} outside [0, 1]")));
            }
        }
        if b.x1 > b.x2 || b.y1 > b.y2 {
            return Err(invalid(format!(
                "box corners out of order: ({}, {}) .. ({}, {})",
                b.x1, b.y1, b.x2, b.y2
            )));
        }
    }
    Ok(())
}

/// Partition detections and compute occupancy.
///
/// Unrecognized labels land in no partition and are only counted.
/// Both rates are 0.0 when no product or empty slot was seen.
pub fn classify(detections: &[DetectionCandidate]) -> Classified {
    let mut out = Classified::default();

    for det in detections {
        match det.label() {
            Some(ShelfLabel::Product) => out.products.push(det.clone()),
            Some(ShelfLabel::EmptySlot) => out.empty_slots.push(det.clone()),
            Some(ShelfLabel::Misplaced) => out.misplaced.push(det.clone()),
            None => out.summary.unrecognized += 1,
        }
    }

    let total_slots = out.products.len() + out.empty_slots.len();
    out.summary.total_products = out.products.len();
    out.summary.empty_slots = out.empty_slots.len();
    out.summary.misplaced_items = out.misplaced.len();
    out.summary.total_slots = total_slots;

    if total_slots > 0 {
        out.occupancy_rate = out.products.len() as f64 / total_slots as f64;
        out.out_of_stock_rate = out.empty_slots.len() as f64 / total_slots as f64;
    }

    out
}
