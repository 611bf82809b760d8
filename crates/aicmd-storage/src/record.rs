//! Cached command records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A resolved instruction as stored in the value store.
///
/// The embedding is kept next to the command so the vector index can be
/// rebuilt without calling the embedding provider again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord {
    /// Identifier of the instruction (key in the vector index)
    pub identifier: u64,
    /// Instruction text as typed by the user
    pub instruction: String,
    /// Shell command that executed successfully for it
    pub command: String,
    /// Embedding of the instruction, if known
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
    /// `provider/model` that produced the embedding
    #[serde(default)]
    pub model: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CacheRecord {
    pub fn new(identifier: u64, instruction: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            identifier,
            instruction: instruction.into(),
            command: command.into(),
            embedding: None,
            model: None,
            created_at: Utc::now(),
        }
    }

    /// Attach the embedding and the model that produced it (builder pattern).
    pub fn with_embedding(mut self, embedding: Vec<f32>, model: impl Into<String>) -> Self {
        self.embedding = Some(embedding);
        self.model = Some(model.into());
        self
    }

    /// Whether the stored vector can be reused for a model and dimension.
    pub fn has_embedding_for(&self, model: &str, dimension: usize) -> bool {
        match (&self.embedding, &self.model) {
            (Some(values), Some(m)) => m == model && values.len() == dimension,
            _ => false,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}
