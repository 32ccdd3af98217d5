use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::embedding::DEFAULT_EMBEDDING_DIM;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ShelfConfig {
    pub logging: LoggingConfig,
    pub index: IndexConfig,
    pub analysis: AnalysisConfig,
    pub detector: DetectorConfig,
    pub categories: CategoriesConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct IndexConfig {
    pub embedding_dimension: usize,
    /// Default minimum cosine similarity for searches that pass none.
    pub similarity_threshold: f32,
    pub snapshot_path: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AnalysisConfig {
    pub critical_occupancy_threshold: f64,
    pub low_occupancy_threshold: f64,
    pub min_product_confidence: f32,
    /// Look up low-confidence products and misplaced items in the index.
    pub resolve_ambiguous: bool,
}

/// Tuning knobs forwarded to the detector unchanged.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DetectorConfig {
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CategoriesConfig {
    pub labels: Vec<String>,
    /// `{}` is replaced with the category label.
    pub prompt_template: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        let snapshot_path = default_shelfsense_dir()
            .join("index.db")
            .to_string_lossy()
            .into_owned();
        Self {
            embedding_dimension: DEFAULT_EMBEDDING_DIM,
            similarity_threshold: 0.5,
            snapshot_path,
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            critical_occupancy_threshold: 0.2,
            low_occupancy_threshold: 0.5,
            min_product_confidence: 0.6,
            resolve_ambiguous: true,
        }
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.5,
            iou_threshold: 0.45,
        }
    }
}

impl Default for CategoriesConfig {
    fn default() -> Self {
        Self {
            labels: [
                "beverages",
                "snacks",
                "dairy",
                "bakery",
                "produce",
                "frozen food",
                "household",
                "personal care",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            prompt_template: "a photo of {} products on a shelf".into(),
        }
    }
}

/// Returns `~/.shelfsense/`, or `./.shelfsense/` when no home directory is known.
pub fn default_shelfsense_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".shelfsense")
}

/// Returns the default config file path: `~/.shelfsense/config.toml`
pub fn default_config_path() -> PathBuf {
    default_shelfsense_dir().join("config.toml")
}

impl ShelfConfig {
    /// Load config from TOML file (if it exists), apply env var overrides, validate.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides and validate.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            ShelfConfig::default()
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    /// (SHELFSENSE_INDEX, SHELFSENSE_LOG_LEVEL, SHELFSENSE_EMBEDDING_DIM).
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(val) = std::env::var("SHELFSENSE_INDEX") {
            self.index.snapshot_path = val;
        }
        if let Ok(val) = std::env::var("SHELFSENSE_LOG_LEVEL") {
            self.logging.log_level = val;
        }
        if let Ok(val) = std::env::var("SHELFSENSE_EMBEDDING_DIM") {
            self.index.embedding_dimension = val
                .parse()
                .with_context(|| format!("SHELFSENSE_EMBEDDING_DIM={val:?} is not a number"))?;
        }
        Ok(())
    }

    /// Reject values the core cannot work with.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.index.embedding_dimension > 0,
            "index.embedding_dimension must be positive"
        );
        anyhow::ensure!(
            (-1.0..=1.0).contains(&self.index.similarity_threshold),
            "index.similarity_threshold must be within [-1, 1], got {}",
            self.index.similarity_threshold
        );

        let a = &self.analysis;
        for (name, value) in [
            ("critical_occupancy_threshold", a.critical_occupancy_threshold),
            ("low_occupancy_threshold", a.low_occupancy_threshold),
            ("min_product_confidence", a.min_product_confidence as f64),
            ("detector.confidence_threshold", self.detector.confidence_threshold as f64),
            ("detector.iou_threshold", self.detector.iou_threshold as f64),
        ] {
            anyhow::ensure!(
                (0.0..=1.0).contains(&value),
                "{name} must be within [0, 1], got {value}"
            );
        }
        anyhow::ensure!(
            a.critical_occupancy_threshold <= a.low_occupancy_threshold,
            "analysis.critical_occupancy_threshold ({}) must not exceed low_occupancy_threshold ({})",
            a.critical_occupancy_threshold,
            a.low_occupancy_threshold
        );
        Ok(())
    }

    /// Resolve the snapshot path, expanding `~` if needed.
    pub fn resolved_snapshot_path(&self) -> PathBuf {
        expand_tilde(&self.index.snapshot_path)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = ShelfConfig::default();
        assert_eq!(config.logging.log_level, "info");
        assert_eq!(config.index.embedding_dimension, 512);
        assert_eq!(config.analysis.critical_occupancy_threshold, 0.2);
        assert_eq!(config.analysis.low_occupancy_threshold, 0.5);
        assert!(config.index.snapshot_path.ends_with("index.db"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_toml_config() {
        let toml_str = r#"
[logging]
log_level = "debug"

[index]
embedding_dimension = 768
snapshot_path = "/tmp/shelf.db"

[analysis]
min_product_confidence = 0.75
"#;
        let config: ShelfConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.logging.log_level, "debug");
        assert_eq!(config.index.embedding_dimension, 768);
        assert_eq!(config.index.snapshot_path, "/tmp/shelf.db");
        assert_eq!(config.analysis.min_product_confidence, 0.75);
        // defaults still apply for unset fields
        assert_eq!(config.index.similarity_threshold, 0.5);
        assert_eq!(config.detector.iou_threshold, 0.45);
        assert_eq!(config.categories.labels.len(), 8);
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = ShelfConfig::default();
        std::env::set_var("SHELFSENSE_INDEX", "/tmp/override.db");
        std::env::set_var("SHELFSENSE_LOG_LEVEL", "trace");
        std::env::set_var("SHELFSENSE_EMBEDDING_DIM", "256");

        config.apply_env_overrides().unwrap();

        assert_eq!(config.index.snapshot_path, "/tmp/override.db");
        assert_eq!(config.logging.log_level, "trace");
        assert_eq!(config.index.embedding_dimension, 256);

        // Clean up
        std::env::remove_var("SHELFSENSE_INDEX");
        std::env::remove_var("SHELFSENSE_LOG_LEVEL");
        std::env::remove_var("SHELFSENSE_EMBEDDING_DIM");
    }

    #[test]
    fn validate_rejects_out_of_range() {
        let mut config = ShelfConfig::default();
        config.analysis.min_product_confidence = 1.5;
        assert!(config.validate().is_err());

        let mut config = ShelfConfig::default();
        config.analysis.critical_occupancy_threshold = 0.7;
        assert!(config.validate().is_err());

        let mut config = ShelfConfig::default();
        config.index.embedding_dimension = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_from_missing_file_uses_defaults() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = ShelfConfig::load_from(tmp.path().join("absent.toml")).unwrap();
        assert_eq!(config.analysis.min_product_confidence, 0.6);
    }
}
