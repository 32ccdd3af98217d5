//! Error taxonomy for the shelf analysis core.
//!
//! Library operations return [`Result<T>`] with a typed [`Error`]. Binary and
//! CLI code wraps these in `anyhow` with context, the same way collaborator
//! traits (detector, embedding model) report their own failures.

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    /// Bad caller input: `top_k == 0`, query dimension mismatch, zero query vector.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid embedding: dimension mismatch: got {got}, want {want}")]
    EmbeddingDimension { got: usize, want: usize },

    #[error("invalid embedding: {0}")]
    InvalidEmbedding(String),

    /// A detection candidate rejected at the analysis boundary.
    #[error("invalid detection #{index}: {reason}")]
    InvalidDetection { index: usize, reason: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("embedding provider failed: {0}")]
    Embedding(String),

    #[error("detector failed: {0}")]
    Detector(String),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Failures while writing or reading an index snapshot.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("snapshot I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot storage: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("snapshot metadata: {0}")]
    Json(#[from] serde_json::Error),

    #[error("snapshot corrupt: {0}")]
    Corrupt(String),

    #[error("snapshot dimension mismatch: snapshot has {found}, index expects {expected}")]
    DimensionMismatch { found: usize, expected: usize },

    #[error("unsupported snapshot format version {found} (want {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("snapshot operation cancelled")]
    Cancelled,
}

impl Error {
    /// True for errors caused by caller input rather than storage or collaborators.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidArgument(_)
                | Self::EmbeddingDimension { .. }
                | Self::InvalidEmbedding(_)
                | Self::InvalidDetection { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persistence_errors_convert() {
        let err: Error = PersistenceError::Cancelled.into();
        assert!(matches!(err, Error::Persistence(PersistenceError::Cancelled)));
        assert!(!err.is_validation());
        assert_eq!(err.to_string(), "snapshot operation cancelled");
    }

    #[test]
    fn validation_classification() {
        assert!(Error::InvalidArgument("top_k".into()).is_validation());
        assert!(Error::EmbeddingDimension { got: 3, want: 4 }.is_validation());
        assert!(!Error::NotFound("slot 9".into()).is_validation());
    }

    #[test]
    fn dimension_message_names_both_sides() {
        let msg = Error::EmbeddingDimension { got: 3, want: 512 }.to_string();
        assert!(msg.contains("got 3"));
        assert!(msg.contains("want 512"));
    }
}
