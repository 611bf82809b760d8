//! Embedding error types.

use thiserror::Error;

/// Errors that can occur during embedding operations.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// The remote provider failed (network, auth, HTTP status)
    #[error("Provider error: {0}")]
    Provider(String),

    /// The provider cannot produce embeddings
    #[error("Embeddings not supported by provider: {0}")]
    Unsupported(String),

    /// Provider answered without any vector
    #[error("No embedding returned")]
    EmptyResponse,

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Dimension mismatch
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}
