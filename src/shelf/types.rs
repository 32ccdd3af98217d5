//! Shelf analysis type definitions.
//!
//! Defines the collaborator-facing input types ([`ImageFrame`],
//! [`DetectionCandidate`], [`BoundingBox`]), the label taxonomy
//! ([`ShelfLabel`]), and the derived outputs ([`ShelfAnalysis`], [`Alert`]).

use serde::{Deserialize, Serialize};

use crate::index::SearchHit;

/// An opaque image buffer handed to the detector and embedding collaborators.
///
/// The core never inspects pixels; it only carries frames and crops between
/// collaborators.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageFrame {
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub data: Vec<u8>,
}

impl ImageFrame {
    pub fn new(width: u32, height: u32, channels: u8, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            channels,
            data,
        }
    }
}

/// Axis-aligned box with corners normalized to `[0, 1]` image coordinates.
///
/// Deserializes from either `{"x1", "y1", "x2", "y2"}` or the detector's
/// `[x1, y1, x2, y2]` array. Always serializes as the named form.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "BoxRepr")]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BoxRepr {
    Corners([f32; 4]),
    Named { x1: f32, y1: f32, x2: f32, y2: f32 },
}

impl From<BoxRepr> for BoundingBox {
    fn from(repr: BoxRepr) -> Self {
        match repr {
            BoxRepr::Corners(corners) => corners.into(),
            BoxRepr::Named { x1, y1, x2, y2 } => Self { x1, y1, x2, y2 },
        }
    }
}

impl From<[f32; 4]> for BoundingBox {
    fn from([x1, y1, x2, y2]: [f32; 4]) -> Self {
        Self { x1, y1, x2, y2 }
    }
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }
}

/// One object reported by the detector. Immutable once received.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionCandidate {
    /// Detector class name, e.g. `"product"` or `"empty_slot"`.
    #[serde(alias = "class_name")]
    pub class_label: String,
    /// Detector confidence in `[0.0, 1.0]`.
    pub confidence: f32,
    #[serde(alias = "box")]
    pub bbox: BoundingBox,
    /// Pixels inside `bbox`, when the detector was asked for crops.
    #[serde(skip)]
    pub crop: Option<ImageFrame>,
}

impl DetectionCandidate {
    pub fn new(class_label: impl Into<String>, confidence: f32, bbox: BoundingBox) -> Self {
        Self {
            class_label: class_label.into(),
            confidence,
            bbox,
            crop: None,
        }
    }

    pub fn with_crop(mut self, crop: ImageFrame) -> Self {
        self.crop = Some(crop);
        self
    }

    /// The recognized label, or `None` for classes outside the taxonomy.
    pub fn label(&self) -> Option<ShelfLabel> {
        self.class_label.parse().ok()
    }
}

/// The fixed detection label taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShelfLabel {
    /// An occupied facing.
    Product,
    /// A facing with nothing on it.
    EmptySlot,
    /// A product sitting where it does not belong.
    Misplaced,
}

impl ShelfLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Product => "product",
            Self::EmptySlot => "empty_slot",
            Self::Misplaced => "misplaced",
        }
    }
}

impl std::fmt::Display for ShelfLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ShelfLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "product" => Ok(Self::Product),
            "empty_slot" => Ok(Self::EmptySlot),
            "misplaced" => Ok(Self::Misplaced),
            _ => Err(format!("unknown shelf label: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    LowStock,
    MisplacedItems,
    LowConfidence,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LowStock => "low_stock",
            Self::MisplacedItems => "misplaced_items",
            Self::LowConfidence => "low_confidence",
        }
    }
}

impl std::fmt::Display for AlertType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Alert urgency. Ordered: `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Alert {
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub severity: Severity,
    pub message: String,
    pub details: serde_json::Map<String, serde_json::Value>,
}

/// Counts behind the occupancy metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ShelfSummary {
    pub total_products: usize,
    pub empty_slots: usize,
    pub misplaced_items: usize,
    /// `total_products + empty_slots`; misplaced items are not slots.
    pub total_slots: usize,
    /// Detections whose label is outside the taxonomy.
    pub unrecognized: usize,
}

/// Best catalog match for an ambiguous detection.
#[derive(Debug, Clone, Serialize)]
pub struct DetectionMatch {
    /// Partition the detection was classified into.
    pub label: ShelfLabel,
    /// Position within that partition (`products[i]` or `misplaced[i]`).
    pub position: usize,
    pub hit: SearchHit,
}

/// The full result of analyzing one shelf frame.
#[derive(Debug, Clone, Serialize)]
pub struct ShelfAnalysis {
    /// Every candidate as received, including unrecognized labels.
    pub detections: Vec<DetectionCandidate>,
    pub products: Vec<DetectionCandidate>,
    pub empty_slots: Vec<DetectionCandidate>,
    pub misplaced: Vec<DetectionCandidate>,
    pub summary: ShelfSummary,
    pub occupancy_rate: f64,
    pub out_of_stock_rate: f64,
    pub alerts: Vec<Alert>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub resolutions: Vec<DetectionMatch>,
}

impl ShelfAnalysis {
    /// Highest severity among the alerts, if any were raised.
    pub fn max_severity(&self) -> Option<Severity> {
        self.alerts.iter().map(|a| a.severity).max()
    }
}
