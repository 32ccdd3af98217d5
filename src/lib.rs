//! Shelf intelligence core: a visual product similarity index and a shelf
//! detection analyzer.
//!
//! Camera frames go through an external object detector; the resulting
//! detections are partitioned into products, empty slots, and misplaced items,
//! turned into occupancy metrics, and graded into severity-tiered alerts.
//! Ambiguous detections can be resolved against a catalog of product
//! embeddings held in an exact inner-product index.
//!
//! | Rule | Condition | Severity |
//! |------|-----------|----------|
//! | `low_stock` | occupancy < critical threshold (0.2) | high |
//! | `low_stock` | occupancy < low threshold (0.5) | medium |
//! | `misplaced_items` | any misplaced detection | medium |
//! | `low_confidence` | any product below min confidence (0.6) | low |
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from TOML files and environment variables
//! - [`embedding`]: Embedding collaborator trait and vector primitives
//! - [`index`]: Similarity index, record store, and snapshot persistence
//! - [`categories`]: Zero-shot product category classification
//! - [`shelf`]: Detection classification, alert rules, and the shelf analyzer
//! - [`error`]: Error taxonomy

pub mod categories;
pub mod config;
pub mod embedding;
pub mod error;
pub mod index;
pub mod shelf;

pub use error::{Error, PersistenceError, Result};
pub use index::{SearchHit, SimilarityIndex, VectorRecord};
pub use shelf::{ShelfAnalysis, ShelfAnalyzer};
