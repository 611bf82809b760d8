//! Cache error types.

use thiserror::Error;

use aicmd_embeddings::EmbeddingError;
use aicmd_storage::StorageError;
use aicmd_vector::VectorError;

/// Errors surfaced by the semantic cache.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The embedding provider failed
    #[error("Embedding provider error: {0}")]
    Provider(#[from] EmbeddingError),

    /// Value store failure
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Vector index failure
    #[error("Vector index error: {0}")]
    Vector(#[from] VectorError),

    /// Embedder and cache disagree on vector length
    #[error("Embedder produces {actual}-dimensional vectors, cache expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CacheError {
    /// Errors that come from the configuration rather than the environment.
    ///
    /// These make the cache unusable on every run, so callers report them
    /// instead of degrading to a miss.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            CacheError::DimensionMismatch { .. }
                | CacheError::Provider(EmbeddingError::DimensionMismatch { .. })
                | CacheError::Storage(StorageError::DimensionMismatch { .. })
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_errors_are_configuration() {
        assert!(CacheError::DimensionMismatch {
            expected: 1536,
            actual: 1024
        }
        .is_configuration());
        assert!(CacheError::Storage(StorageError::DimensionMismatch {
            stored: 1536,
            configured: 1024
        })
        .is_configuration());
        assert!(!CacheError::Provider(EmbeddingError::Provider("timeout".to_string())).is_configuration());
        assert!(!CacheError::Storage(StorageError::Key("bad".to_string())).is_configuration());
    }
}
