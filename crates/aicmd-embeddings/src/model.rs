//! Embedding provider trait and types.
//!
//! Defines the interface for turning instruction text into vectors.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::EmbeddingError;

/// Vector embedding - a normalized float array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    /// The embedding vector (normalized to unit length)
    pub values: Vec<f32>,
}

impl Embedding {
    /// Create a new embedding from a vector.
    /// Normalizes the vector to unit length.
    pub fn new(values: Vec<f32>) -> Self {
        let norm: f32 = values.iter().map(|x| x * x).sum::<f32>().sqrt();
        let normalized = if norm > 0.0 {
            values.iter().map(|x| x / norm).collect()
        } else {
            values
        };
        Self { values: normalized }
    }

    /// Create embedding without normalization (for pre-normalized vectors)
    pub fn from_normalized(values: Vec<f32>) -> Self {
        Self { values }
    }

    /// Get the embedding dimension
    pub fn dimension(&self) -> usize {
        self.values.len()
    }

    /// Fail unless the vector has exactly `expected` components.
    pub fn ensure_dimension(&self, expected: usize) -> Result<(), EmbeddingError> {
        if self.values.len() != expected {
            return Err(EmbeddingError::DimensionMismatch {
                expected,
                actual: self.values.len(),
            });
        }
        Ok(())
    }

    /// Compute cosine similarity with another embedding.
    /// Returns value in [-1, 1] range (1 = identical).
    pub fn cosine_similarity(&self, other: &Embedding) -> f32 {
        if self.values.len() != other.values.len() {
            return 0.0;
        }
        // Since both are normalized, dot product = cosine similarity
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| a * b)
            .sum()
    }

    /// Cosine distance (`1 - similarity`), the metric the vector index uses.
    pub fn cosine_distance(&self, other: &Embedding) -> f32 {
        1.0 - self.cosine_similarity(other)
    }
}

/// Model information
#[derive(Debug, Clone)]
pub struct ModelInfo {
    /// Provider name (e.g., "openai")
    pub provider: String,
    /// Model name (e.g., "text-embedding-3-small")
    pub name: String,
    /// Embedding dimension
    pub dimension: usize,
}

impl ModelInfo {
    pub fn new(provider: impl Into<String>, name: impl Into<String>, dimension: usize) -> Self {
        Self {
            provider: provider.into(),
            name: name.into(),
            dimension,
        }
    }

    /// `provider/model`, recorded alongside cached entries.
    pub fn qualified_name(&self) -> String {
        format!("{}/{}", self.provider, self.name)
    }
}

/// Capability to embed text.
///
/// Calls may block on the network for as long as the provider's own timeout
/// allows. Every failure except a wrong vector length is recoverable.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Get model information
    fn info(&self) -> &ModelInfo;

    /// Generate embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError>;
}

#[async_trait]
impl<T: EmbeddingProvider + ?Sized> EmbeddingProvider for Arc<T> {
    fn info(&self) -> &ModelInfo {
        (**self).info()
    }

    async fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        (**self).embed(text).await
    }
}
