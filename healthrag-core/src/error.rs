//! Error types for healthrag-core

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur in the chunk/index/retrieval pipeline
#[derive(Debug, Error)]
pub enum RagError {
    /// Source file could not be read; the file is skipped
    #[error("Cannot read {path}: {reason}")]
    InputDecoding { path: PathBuf, reason: String },

    /// Source file has no text left after cleaning; the file is skipped
    #[error("Empty document: {0}")]
    EmptyDocument(PathBuf),

    /// Embedding provider failed or returned a malformed batch
    #[error("Embedding provider error: {0}")]
    Provider(String),

    /// Index artifact and metadata store do not describe the same build
    #[error("Index/metadata mismatch: {0}")]
    SchemaMismatch(String),

    /// No published index at the configured location
    #[error("No index found: {0}")]
    NotFound(String),

    /// Row index past the end of the metadata store
    #[error("Row {row} out of range (metadata has {len} records)")]
    OutOfRange { row: usize, len: usize },

    /// Rejected configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Malformed line in a chunk or metadata store
    #[error("Invalid record at {path}:{line}: {reason}")]
    InvalidRecord {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    /// Serialization error (bincode)
    #[error("Serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Config file parse error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RagError {
    /// Create a provider error
    pub fn provider(msg: impl Into<String>) -> Self {
        Self::Provider(msg.into())
    }

    /// Create a schema mismatch error
    pub fn schema_mismatch(msg: impl Into<String>) -> Self {
        Self::SchemaMismatch(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create an invalid record error
    pub fn invalid_record(path: impl Into<PathBuf>, line: usize, reason: impl Into<String>) -> Self {
        Self::InvalidRecord {
            path: path.into(),
            line,
            reason: reason.into(),
        }
    }

    /// Per-document errors that skip one file without aborting the run
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::InputDecoding { .. } | Self::EmptyDocument(_))
    }
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, RagError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_range_display() {
        let err = RagError::OutOfRange { row: 7, len: 3 };
        assert_eq!(err.to_string(), "Row 7 out of range (metadata has 3 records)");
    }

    #[test]
    fn test_invalid_record_display() {
        let err = RagError::invalid_record("chunks.jsonl", 4, "missing field `text`");
        assert_eq!(
            err.to_string(),
            "Invalid record at chunks.jsonl:4: missing field `text`"
        );
    }

    #[test]
    fn test_recoverable_classification() {
        assert!(RagError::EmptyDocument(PathBuf::from("a.txt")).is_recoverable());
        assert!(RagError::InputDecoding {
            path: PathBuf::from("a.txt"),
            reason: "denied".into()
        }
        .is_recoverable());
        assert!(!RagError::provider("down").is_recoverable());
        assert!(!RagError::schema_mismatch("rows").is_recoverable());
        assert!(!RagError::config("overlap").is_recoverable());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: RagError = io_err.into();
        match err {
            RagError::Io(_) => {}
            _ => panic!("Expected RagError::Io"),
        }
    }
}
