//! Vector index trait and types.
//!
//! Defines the interface for nearest-neighbour search over instruction
//! embeddings.

use crate::error::VectorError;
use aicmd_embeddings::Embedding;

/// Result of a vector search
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    /// Identifier of the stored instruction
    pub identifier: u64,
    /// Cosine distance to the query (lower = more similar)
    pub distance: f32,
}

impl SearchResult {
    pub fn new(identifier: u64, distance: f32) -> Self {
        Self {
            identifier,
            distance,
        }
    }
}

/// Size and shape of an index.
#[derive(Debug, Clone, Default)]
pub struct IndexStats {
    pub vector_count: usize,
    pub dimension: usize,
    /// Vectors the index can hold before it must grow
    pub capacity: usize,
    /// Bytes on disk, 0 before the first save
    pub size_bytes: u64,
}

/// Nearest-neighbour index over instruction embeddings, keyed by identifier.
pub trait VectorIndex: Send + Sync {
    fn dimension(&self) -> usize;

    /// Vectors currently stored
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert a vector, replacing any vector already stored under `id`.
    fn add(&mut self, id: u64, embedding: &Embedding) -> Result<(), VectorError>;

    /// Up to `k` entries ordered by ascending cosine distance.
    /// An empty index yields no results.
    fn search(&self, query: &Embedding, k: usize) -> Result<Vec<SearchResult>, VectorError>;

    /// Returns `false` if `id` was not indexed.
    fn remove(&mut self, id: u64) -> Result<bool, VectorError>;

    fn contains(&self, id: u64) -> bool;

    fn stats(&self) -> IndexStats;

    /// Persist to the index file, replacing it atomically.
    fn save(&self) -> Result<(), VectorError>;

    /// Drop every vector, keeping the dimension.
    fn clear(&mut self) -> Result<(), VectorError>;
}
