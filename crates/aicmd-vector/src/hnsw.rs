//! HNSW index implementation using usearch.
//!
//! Parameters tuned for quality over speed:
//! - M = 16 (connections per layer)
//! - ef_construction = 200 (build-time quality)
//! - ef_search = 100 (search-time quality)
//!
//! Distances are cosine distances (`1 - cos`), so 0 means identical
//! direction and lower is always more similar.

use std::path::{Path, PathBuf};

use aicmd_embeddings::Embedding;
use tracing::{debug, info};
use usearch::{Index, IndexOptions, MetricKind, ScalarKind};

use crate::error::VectorError;
use crate::index::{IndexStats, SearchResult, VectorIndex};

/// File name of the index inside the data directory.
pub const INDEX_FILE_NAME: &str = "index.usearch";

/// Minimum number of slots added whenever the index grows.
const MIN_GROWTH: usize = 64;

/// HNSW index configuration
#[derive(Debug, Clone)]
pub struct HnswConfig {
    /// Embedding dimension (must match model)
    pub dimension: usize,
    /// Number of connections per layer (M parameter)
    pub connectivity: usize,
    /// Build-time search depth (ef_construction)
    pub expansion_add: usize,
    /// Query-time search depth (ef_search)
    pub expansion_search: usize,
    /// Index file path
    pub index_file: PathBuf,
    /// Slots reserved when a new index is created
    pub initial_capacity: usize,
}

impl Default for HnswConfig {
    fn default() -> Self {
        Self {
            dimension: 1536, // text-embedding-3-small
            connectivity: 16,
            expansion_add: 200,
            expansion_search: 100,
            index_file: PathBuf::from(INDEX_FILE_NAME),
            initial_capacity: MIN_GROWTH,
        }
    }
}

impl HnswConfig {
    /// Config for an index stored as `index.usearch` inside `data_dir`.
    pub fn new(dimension: usize, data_dir: impl AsRef<Path>) -> Self {
        Self {
            dimension,
            index_file: data_dir.as_ref().join(INDEX_FILE_NAME),
            ..Default::default()
        }
    }

    fn options(&self) -> IndexOptions {
        IndexOptions {
            dimensions: self.dimension,
            metric: MetricKind::Cos,
            quantization: ScalarKind::F32,
            connectivity: self.connectivity,
            expansion_add: self.expansion_add,
            expansion_search: self.expansion_search,
            multi: false, // Single vector per identifier
        }
    }
}

/// HNSW index wrapper around usearch.
pub struct HnswIndex {
    index: Index,
    config: HnswConfig,
}

impl HnswIndex {
    /// Allocate a new, empty index. Nothing is written until [`save`].
    ///
    /// [`save`]: VectorIndex::save
    pub fn create(config: HnswConfig) -> Result<Self, VectorError> {
        info!(path = ?config.index_file, dim = config.dimension, "Creating new vector index");
        let index = Index::new(&config.options()).map_err(|e| VectorError::Index(e.to_string()))?;
        index
            .reserve(config.initial_capacity.max(1))
            .map_err(|_| VectorError::Capacity(config.initial_capacity))?;
        Ok(Self { index, config })
    }

    /// Restore a previously saved index.
    ///
    /// Returns [`VectorError::NotFound`] when no index file exists yet and
    /// [`VectorError::Corrupt`] when the file cannot be used with this
    /// configuration.
    pub fn load(config: HnswConfig) -> Result<Self, VectorError> {
        let path = &config.index_file;
        if !path.exists() {
            return Err(VectorError::NotFound(path.clone()));
        }

        let path_str = path
            .to_str()
            .ok_or_else(|| VectorError::Index("Invalid path encoding".to_string()))?;
        let index = Index::new(&config.options()).map_err(|e| VectorError::Index(e.to_string()))?;
        index
            .load(path_str)
            .map_err(|e| VectorError::Corrupt(format!("{}: {}", path.display(), e)))?;

        if index.dimensions() != config.dimension {
            return Err(VectorError::Corrupt(format!(
                "{} holds {}-dimensional vectors, expected {}",
                path.display(),
                index.dimensions(),
                config.dimension
            )));
        }

        info!(path = ?path, vectors = index.size(), "Opened existing vector index");
        Ok(Self { index, config })
    }

    fn index_file(&self) -> &Path {
        &self.config.index_file
    }

    /// Reserve more room when the next insertion would not fit.
    fn ensure_capacity(&self) -> Result<(), VectorError> {
        let capacity = self.index.capacity();
        if self.index.size() < capacity {
            return Ok(());
        }
        let target = (capacity * 2).max(capacity + MIN_GROWTH);
        self.index
            .reserve(target)
            .map_err(|_| VectorError::Capacity(target))?;
        debug!(from = capacity, to = target, "Grew vector index capacity");
        Ok(())
    }

    fn check_dimension(&self, embedding: &Embedding) -> Result<(), VectorError> {
        if embedding.dimension() != self.config.dimension {
            return Err(VectorError::DimensionMismatch {
                expected: self.config.dimension,
                actual: embedding.dimension(),
            });
        }
        Ok(())
    }

    fn temp_file(&self) -> PathBuf {
        let mut name = self.config.index_file.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

impl VectorIndex for HnswIndex {
    fn dimension(&self) -> usize {
        self.config.dimension
    }

    fn len(&self) -> usize {
        self.index.size()
    }

    fn add(&mut self, id: u64, embedding: &Embedding) -> Result<(), VectorError> {
        self.check_dimension(embedding)?;

        // usearch rejects duplicate keys in single-vector mode
        if self.index.contains(id) {
            self.index
                .remove(id)
                .map_err(|e| VectorError::Index(e.to_string()))?;
            debug!(id, "Replacing vector");
        }

        self.ensure_capacity()?;
        self.index
            .add(id, &embedding.values)
            .map_err(|e| VectorError::Index(e.to_string()))?;

        debug!(id, "Added vector");
        Ok(())
    }

    fn search(&self, query: &Embedding, k: usize) -> Result<Vec<SearchResult>, VectorError> {
        self.check_dimension(query)?;
        if k == 0 || self.index.size() == 0 {
            return Ok(Vec::new());
        }

        let matches = self
            .index
            .search(&query.values, k)
            .map_err(|e| VectorError::Index(e.to_string()))?;

        let mut results: Vec<SearchResult> = matches
            .keys
            .iter()
            .zip(matches.distances.iter())
            .map(|(&id, &distance)| SearchResult::new(id, distance))
            .collect();
        results.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then(a.identifier.cmp(&b.identifier))
        });
        results.truncate(k);

        debug!(k, found = results.len(), "Search complete");
        Ok(results)
    }

    fn remove(&mut self, id: u64) -> Result<bool, VectorError> {
        let removed = self
            .index
            .remove(id)
            .map_err(|e| VectorError::Index(e.to_string()))?;

        if removed > 0 {
            debug!(id, "Removed vector");
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn contains(&self, id: u64) -> bool {
        self.index.contains(id)
    }

    fn stats(&self) -> IndexStats {
        let size_bytes = std::fs::metadata(self.index_file())
            .map(|m| m.len())
            .unwrap_or(0);

        IndexStats {
            vector_count: self.index.size(),
            dimension: self.config.dimension,
            capacity: self.index.capacity(),
            size_bytes,
        }
    }

    fn save(&self) -> Result<(), VectorError> {
        let path = self.index_file();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // Write next to the target, then rename so a crash never leaves a
        // half-written index behind.
        let temp = self.temp_file();
        let temp_str = temp
            .to_str()
            .ok_or_else(|| VectorError::Index("Invalid path encoding".to_string()))?;
        self.index
            .save(temp_str)
            .map_err(|e| VectorError::Index(format!("Failed to save: {}", e)))?;
        std::fs::rename(&temp, path)?;

        info!(path = ?path, vectors = self.index.size(), "Saved vector index");
        Ok(())
    }

    fn clear(&mut self) -> Result<(), VectorError> {
        let fresh = Index::new(&self.config.options()).map_err(|e| VectorError::Index(e.to_string()))?;
        fresh
            .reserve(self.config.initial_capacity.max(1))
            .map_err(|_| VectorError::Capacity(self.config.initial_capacity))?;

        self.index = fresh;
        info!("Cleared vector index");
        Ok(())
    }
}
