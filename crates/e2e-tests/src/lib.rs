//! End-to-end test infrastructure for the semantic command cache.
//!
//! Provides a shared TestHarness plus embedders and vector helpers for
//! tests that drive the cache through its public API and on-disk files.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use rand::Rng;

use aicmd_cache::{CacheConfig, SemanticCache};
use aicmd_embeddings::{Embedding, EmbeddingError, EmbeddingProvider, MockEmbedder, ModelInfo};
use aicmd_vector::INDEX_FILE_NAME;

/// Dimension used by the scenario tests.
pub const DIM: usize = 1024;

/// Shared test harness for E2E tests.
///
/// Owns the data directory and a mock embedder whose call counter and
/// failure switch tests can inspect.
pub struct TestHarness {
    /// Keeps temp dir alive for the lifetime of the harness
    pub _temp_dir: tempfile::TempDir,
    /// Cache data directory (index file and store live here)
    pub data_dir: PathBuf,
    pub embedder: Arc<MockEmbedder>,
    pub dimension: usize,
}

impl TestHarness {
    /// Create a new test harness with the default dimension.
    pub fn new() -> Self {
        Self::with_dimension(DIM)
    }

    pub fn with_dimension(dimension: usize) -> Self {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let data_dir = temp_dir.path().join("cache");

        Self {
            _temp_dir: temp_dir,
            data_dir,
            embedder: Arc::new(MockEmbedder::new(dimension)),
            dimension,
        }
    }

    pub fn config(&self) -> CacheConfig {
        CacheConfig::new(self.data_dir.clone(), self.dimension)
    }

    /// Open the cache with the harness embedder.
    pub async fn open_cache(&self) -> SemanticCache<Arc<MockEmbedder>> {
        self.open_cache_with(self.config()).await
    }

    pub async fn open_cache_with(&self, config: CacheConfig) -> SemanticCache<Arc<MockEmbedder>> {
        SemanticCache::open(config, self.embedder.clone())
            .await
            .expect("Failed to open semantic cache")
    }

    pub fn index_file(&self) -> PathBuf {
        self.data_dir.join(INDEX_FILE_NAME)
    }

    pub fn store_dir(&self) -> PathBuf {
        self.config().store_path()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Embedder that reports a different model name than the mock it wraps.
///
/// Used to simulate switching embedding models over an existing cache.
pub struct RenamedEmbedder {
    inner: MockEmbedder,
    info: ModelInfo,
}

impl RenamedEmbedder {
    pub fn new(dimension: usize, provider: &str, name: &str) -> Self {
        Self {
            inner: MockEmbedder::new(dimension),
            info: ModelInfo::new(provider, name, dimension),
        }
    }

    pub fn calls(&self) -> usize {
        self.inner.calls()
    }
}

#[async_trait]
impl EmbeddingProvider for RenamedEmbedder {
    fn info(&self) -> &ModelInfo {
        &self.info
    }

    async fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        self.inner.embed(text).await
    }
}

/// Unit vector along axis `i`.
pub fn axis(dimension: usize, i: usize) -> Embedding {
    let mut values = vec![0.0; dimension];
    values[i] = 1.0;
    Embedding::from_normalized(values)
}

/// Unit vector at cosine distance `distance` from `axis(dimension, 0)`.
pub fn at_distance_from_axis(dimension: usize, distance: f32) -> Embedding {
    let cos = 1.0 - distance;
    let mut values = vec![0.0; dimension];
    values[0] = cos;
    values[1] = (1.0 - cos * cos).max(0.0).sqrt();
    Embedding::new(values)
}

/// Random unit vector.
pub fn random_embedding(rng: &mut impl Rng, dimension: usize) -> Embedding {
    Embedding::new(
        (0..dimension)
            .map(|_| rng.random_range(-1.0f32..1.0))
            .collect(),
    )
}

/// Whether `path` exists and is non-empty (files) or present (directories).
pub fn exists_on_disk(path: &Path) -> bool {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_file() => meta.len() > 0,
        Ok(_) => true,
        Err(_) => false,
    }
}
