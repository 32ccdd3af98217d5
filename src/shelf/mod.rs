//! Shelf detection analysis: partitioning, occupancy metrics, alerting, and
//! the orchestrator that ties them to the detector and similarity index.

pub mod alerts;
pub mod analyzer;
pub mod classifier;
pub mod types;

pub use alerts::{generate_alerts, AlertThresholds};
pub use analyzer::{Detector, DetectorParams, ShelfAnalyzer};
pub use classifier::{classify, validate_detections, Classified};
pub use types::{
    Alert, AlertType, BoundingBox, DetectionCandidate, DetectionMatch, ImageFrame, Severity,
    ShelfAnalysis, ShelfLabel, ShelfSummary,
};
