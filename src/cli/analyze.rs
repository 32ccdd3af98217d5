use anyhow::Result;
use serde::Deserialize;
use std::path::Path;

use shelfsense::config::ShelfConfig;
use shelfsense::shelf::{DetectionCandidate, ShelfAnalyzer};

/// Accepts either a bare array or the detector's `{"detections": [...]}` envelope.
#[derive(Deserialize)]
#[serde(untagged)]
enum DetectionsFile {
    List(Vec<DetectionCandidate>),
    Envelope { detections: Vec<DetectionCandidate> },
}

/// Analyze a detections file and print the analysis as JSON to stdout.
pub fn analyze(config: &ShelfConfig, file: &Path) -> Result<()> {
    let detections = match super::read_json::<DetectionsFile>(file)? {
        DetectionsFile::List(d) | DetectionsFile::Envelope { detections: d } => d,
    };

    let analyzer = ShelfAnalyzer::from_config(config);
    let analysis = analyzer.analyze_detections(detections)?;

    println!("{}", serde_json::to_string_pretty(&analysis)?);

    eprintln!(
        "Occupancy {:.1}%, {} alert(s)",
        analysis.occupancy_rate * 100.0,
        analysis.alerts.len()
    );
    for alert in &analysis.alerts {
        eprintln!("  [{}] {}: {}", alert.severity, alert.alert_type, alert.message);
    }

    Ok(())
}
