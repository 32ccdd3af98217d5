//! Severity-tiered alert rules.
//!
//! Stateless: alerts are a pure function of one classification. Rules are
//! evaluated in a fixed order and every rule that applies emits its alert.

use serde_json::{json, Map, Value};

use crate::shelf::classifier::Classified;
use crate::shelf::types::{Alert, AlertType, DetectionCandidate, Severity};

/// Cutoffs for the alert rules.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertThresholds {
    /// Occupancy below this is a high-severity low-stock alert.
    pub critical_occupancy: f64,
    /// Occupancy below this (and not critical) is a medium-severity low-stock alert.
    pub low_occupancy: f64,
    /// Products detected below this confidence raise a low-confidence alert.
    pub min_product_confidence: f32,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            critical_occupancy: 0.2,
            low_occupancy: 0.5,
            min_product_confidence: 0.6,
        }
    }
}

impl From<&crate::config::AnalysisConfig> for AlertThresholds {
    fn from(config: &crate::config::AnalysisConfig) -> Self {
        Self {
            critical_occupancy: config.critical_occupancy_threshold,
            low_occupancy: config.low_occupancy_threshold,
            min_product_confidence: config.min_product_confidence,
        }
    }
}

/// Evaluate all alert rules against one classification.
///
/// Output order: low stock, misplaced items, low confidence.
pub fn generate_alerts(classified: &Classified, thresholds: &AlertThresholds) -> Vec<Alert> {
    let mut alerts = Vec::new();
    let occupancy = classified.occupancy_rate;

    if occupancy < thresholds.critical_occupancy {
        alerts.push(low_stock(
            Severity::High,
            format!("Critical low stock: {} occupancy", percent(occupancy)),
            classified,
        ));
    } else if occupancy < thresholds.low_occupancy {
        alerts.push(low_stock(
            Severity::Medium,
            format!("Low stock warning: {} occupancy", percent(occupancy)),
            classified,
        ));
    }

    if !classified.misplaced.is_empty() {
        let count = classified.misplaced.len();
        let items: Vec<Value> = classified.misplaced.iter().map(detection_json).collect();
        alerts.push(Alert {
            alert_type: AlertType::MisplacedItems,
            severity: Severity::Medium,
            message: format!("{count} misplaced items detected"),
            details: details([("count", json!(count)), ("items", Value::Array(items))]),
        });
    }

    let low_confidence = classified
        .products
        .iter()
        .filter(|p| p.confidence < thresholds.min_product_confidence)
        .count();
    if low_confidence > 0 {
        alerts.push(Alert {
            alert_type: AlertType::LowConfidence,
            severity: Severity::Low,
            message: format!("{low_confidence} products detected with low confidence"),
            details: details([("count", json!(low_confidence))]),
        });
    }

    alerts
}

fn low_stock(severity: Severity, message: String, classified: &Classified) -> Alert {
    Alert {
        alert_type: AlertType::LowStock,
        severity,
        message,
        details: details([
            ("occupancy_rate", json!(classified.occupancy_rate)),
            ("empty_slots", json!(classified.empty_slots.len())),
        ]),
    }
}

fn details<const N: usize>(entries: [(&str, Value); N]) -> Map<String, Value> {
    entries
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

fn detection_json(det: &DetectionCandidate) -> Value {
    json!({
        "class_label": det.class_label,
        "confidence": det.confidence,
        "bbox": {
            "x1": det.bbox.x1,
            "y1": det.bbox.y1,
            "x2": det.bbox.x2,
            "y2": det.bbox.y2,
        },
    })
}

fn percent(rate: f64) -> String {
    format!("{:.1}%", rate * 100.0)
}
