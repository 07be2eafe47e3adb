//! Indexer error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during indexing operations.
///
/// Per-entry filesystem problems and config parse failures are never
/// surfaced here; they go to the [`Diagnostics`](crate::Diagnostics) sink
/// and the run continues. This enum covers the fatal class: a bad walk
/// root, broken persistence, and worker failures.
#[derive(Debug, Error)]
pub enum IndexerError {
    /// I/O error during file operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Walk root does not exist
    #[error("root directory not found: {0}")]
    RootNotFound(PathBuf),

    /// Walk root exists but is not a directory
    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Persisted state missing (valid initial state for a first run)
    #[error("no stored state: {0}")]
    NotFound(PathBuf),

    /// A hashing worker task failed outright
    #[error("hash worker failed: {0}")]
    Worker(String),
}

impl From<serde_json::Error> for IndexerError {
    fn from(e: serde_json::Error) -> Self {
        IndexerError::Serialization(e.to_string())
    }
}

impl From<rmp_serde::encode::Error> for IndexerError {
    fn from(e: rmp_serde::encode::Error) -> Self {
        IndexerError::Serialization(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for IndexerError {
    fn from(e: rmp_serde::decode::Error) -> Self {
        IndexerError::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = IndexerError::RootNotFound(PathBuf::from("/test/path"));
        assert!(err.to_string().contains("/test/path"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: IndexerError = io_err.into();
        assert!(matches!(err, IndexerError::Io(_)));
    }
}
