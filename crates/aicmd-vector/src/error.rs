//! Vector index error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during vector operations.
#[derive(Debug, Error)]
pub enum VectorError {
    /// usearch index error
    #[error("Index error: {0}")]
    Index(String),

    /// Dimension mismatch
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// No index file at the given path (first run)
    #[error("Index file not found: {0}")]
    NotFound(PathBuf),

    /// Index file exists but cannot be used
    #[error("Corrupt index file: {0}")]
    Corrupt(String),

    /// Reserving more room in the index failed
    #[error("Index capacity could not be grown to {0}")]
    Capacity(usize),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
