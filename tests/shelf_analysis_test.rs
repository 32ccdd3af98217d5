mod helpers;

use std::sync::Arc;

use helpers::{detection, metadata, test_embedding, test_index, DIM};
use shelfsense::embedding::EmbeddingProvider;
use shelfsense::shelf::{
    AlertThresholds, AlertType, ImageFrame, Severity, ShelfAnalyzer, ShelfLabel,
};
use shelfsense::config::ShelfConfig;
use shelfsense::Error;

/// Maps a crop's first pixel to a spike embedding.
struct SpikeEmbedder;

impl EmbeddingProvider for SpikeEmbedder {
    fn embed_image(&self, image: &ImageFrame) -> anyhow::Result<Vec<f32>> {
        Ok(test_embedding(image.data[0] as usize))
    }

    fn embed_text(&self, _text: &str) -> anyhow::Result<Vec<f32>> {
        anyhow::bail!("text embedding not available")
    }

    fn dimensions(&self) -> usize {
        DIM
    }
}

fn analyzer() -> ShelfAnalyzer {
    ShelfAnalyzer::new(AlertThresholds::default())
}

#[test]
fn one_product_two_empty_slots() {
    let analysis = analyzer()
        .analyze_detections(vec![
            detection("product", 0.9),
            detection("empty_slot", 0.8),
            detection("empty_slot", 0.85),
        ])
        .unwrap();

    assert_eq!(analysis.summary.total_products, 1);
    assert_eq!(analysis.summary.empty_slots, 2);
    assert_eq!(analysis.summary.total_slots, 3);
    assert!((analysis.occupancy_rate - 1.0 / 3.0).abs() < 1e-9);
    assert!((analysis.out_of_stock_rate - 2.0 / 3.0).abs() < 1e-9);

    assert_eq!(analysis.alerts.len(), 1);
    let alert = &analysis.alerts[0];
    assert_eq!(alert.alert_type, AlertType::LowStock);
    assert_eq!(alert.severity, Severity::Medium);
    assert_eq!(alert.message, "Low stock warning: 33.3% occupancy");
}

#[test]
fn misplaced_only_raises_stock_and_misplacement_alerts() {
    let analysis = analyzer()
        .analyze_detections(vec![detection("misplaced", 0.7)])
        .unwrap();

    assert_eq!(analysis.summary.total_slots, 0);
    assert_eq!(analysis.occupancy_rate, 0.0);
    assert_eq!(analysis.out_of_stock_rate, 0.0);

    let kinds: Vec<(AlertType, Severity)> = analysis
        .alerts
        .iter()
        .map(|a| (a.alert_type, a.severity))
        .collect();
    assert_eq!(
        kinds,
        vec![
            (AlertType::LowStock, Severity::High),
            (AlertType::MisplacedItems, Severity::Medium),
        ]
    );
    assert_eq!(analysis.max_severity(), Some(Severity::High));
}

#[test]
fn empty_detection_list_is_critical() {
    let analysis = analyzer().analyze_detections(vec![]).unwrap();
    assert_eq!(analysis.summary.total_slots, 0);
    assert_eq!(analysis.alerts.len(), 1);
    assert_eq!(analysis.alerts[0].severity, Severity::High);
}

#[test]
fn full_confident_shelf_has_no_alerts() {
    let analysis = analyzer()
        .analyze_detections(vec![detection("product", 0.9), detection("product", 0.8)])
        .unwrap();
    assert_eq!(analysis.occupancy_rate, 1.0);
    assert!(analysis.alerts.is_empty());
    assert_eq!(analysis.max_severity(), None);
}

#[test]
fn low_confidence_products_are_flagged() {
    let analysis = analyzer()
        .analyze_detections(vec![
            detection("product", 0.9),
            detection("product", 0.4),
            detection("product", 0.55),
        ])
        .unwrap();
    assert_eq!(analysis.alerts.len(), 1);
    assert_eq!(analysis.alerts[0].alert_type, AlertType::LowConfidence);
    assert_eq!(analysis.alerts[0].severity, Severity::Low);
    assert_eq!(analysis.alerts[0].message, "2 products detected with low confidence");
}

#[test]
fn rates_sum_to_one_when_slots_exist() {
    let cases = [(1, 0), (0, 1), (3, 4), (10, 1), (7, 7)];
    for (products, empties) in cases {
        let mut dets = Vec::new();
        dets.extend((0..products).map(|_| detection("product", 0.9)));
        dets.extend((0..empties).map(|_| detection("empty_slot", 0.9)));
        dets.push(detection("misplaced", 0.9));

        let analysis = analyzer().analyze_detections(dets).unwrap();
        assert_eq!(analysis.summary.total_slots, products + empties);
        let sum = analysis.occupancy_rate + analysis.out_of_stock_rate;
        assert!((sum - 1.0).abs() < 1e-9, "{products}/{empties}: {sum}");
    }
}

#[test]
fn unknown_labels_are_counted_not_classified() {
    let analysis = analyzer()
        .analyze_detections(vec![detection("product", 0.9), detection("price_tag", 0.9)])
        .unwrap();
    assert_eq!(analysis.detections.len(), 2);
    assert_eq!(analysis.summary.unrecognized, 1);
    assert_eq!(analysis.summary.total_slots, 1);
}

#[test]
fn invalid_detections_are_rejected() {
    let err = analyzer()
        .analyze_detections(vec![detection("product", 0.9), detection("product", 1.5)])
        .unwrap_err();
    assert!(matches!(err, Error::InvalidDetection { index: 1, .. }));
    assert!(err.is_validation());
}

#[test]
fn config_thresholds_drive_alerts() {
    let mut config = ShelfConfig::default();
    config.analysis.low_occupancy_threshold = 0.9;
    config.analysis.critical_occupancy_threshold = 0.1;

    let analysis = ShelfAnalyzer::from_config(&config)
        .analyze_detections(vec![
            detection("product", 0.9),
            detection("product", 0.9),
            detection("product", 0.9),
            detection("empty_slot", 0.9),
        ])
        .unwrap();
    assert_eq!(analysis.alerts.len(), 1);
    assert_eq!(analysis.alerts[0].message, "Low stock warning: 75.0% occupancy");
}

#[test]
fn ambiguous_crops_resolve_against_catalog() {
    let index = test_index();
    index.add_product("cola", &test_embedding(5), metadata("Cola")).unwrap();
    index.add_product("chips", &test_embedding(6), metadata("Chips")).unwrap();

    let analyzer = analyzer().with_resolver(Arc::clone(&index), Arc::new(SpikeEmbedder));
    let crop = |tag: u8| ImageFrame::new(1, 1, 1, vec![tag]);

    let analysis = analyzer
        .analyze_detections(vec![
            detection("product", 0.95).with_crop(crop(5)),
            detection("misplaced", 0.9).with_crop(crop(6)),
        ])
        .unwrap();

    assert_eq!(analysis.resolutions.len(), 1);
    let resolved = &analysis.resolutions[0];
    assert_eq!(resolved.label, ShelfLabel::Misplaced);
    assert_eq!(resolved.hit.product_id, "chips");
    assert_eq!(resolved.hit.metadata["name"], "Chips");
    // resolution never changes the alerts
    assert_eq!(analysis.alerts.len(), 1);
    assert_eq!(analysis.alerts[0].alert_type, AlertType::MisplacedItems);
}

#[test]
fn analysis_serializes_with_wire_field_names() {
    let analysis = analyzer()
        .analyze_detections(vec![detection("empty_slot", 0.9)])
        .unwrap();
    let json = serde_json::to_value(&analysis).unwrap();
    assert_eq!(json["alerts"][0]["type"], "low_stock");
    assert_eq!(json["alerts"][0]["severity"], "high");
    assert_eq!(json["summary"]["empty_slots"], 1);
    assert_eq!(json["occupancy_rate"], 0.0);
}
