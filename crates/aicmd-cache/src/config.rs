//! Cache configuration.

use std::path::{Path, PathBuf};

use aicmd_types::Settings;
use aicmd_vector::INDEX_FILE_NAME;

/// Default number of neighbours fetched per lookup
pub const DEFAULT_K: usize = 1;

/// Default acceptance threshold on cosine distance
pub const DEFAULT_MAX_DISTANCE: f32 = 0.5;

/// Subdirectory of the data directory holding the RocksDB store
pub const STORE_DIR_NAME: &str = "store";

/// Semantic cache configuration
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    /// Directory holding the index file and the value store
    pub data_dir: PathBuf,
    /// Embedding dimension
    pub dimension: usize,
    /// Neighbours fetched per lookup (at least 1)
    pub k: usize,
    /// Largest cosine distance accepted as a hit
    pub max_distance: f32,
}

impl CacheConfig {
    pub fn new(data_dir: impl Into<PathBuf>, dimension: usize) -> Self {
        Self {
            data_dir: data_dir.into(),
            dimension,
            k: DEFAULT_K,
            max_distance: DEFAULT_MAX_DISTANCE,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            data_dir: settings.expanded_data_dir(),
            dimension: settings.vector_size,
            k: settings.k.max(1),
            max_distance: settings.max_distance,
        }
    }

    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k.max(1);
        self
    }

    pub fn with_max_distance(mut self, max_distance: f32) -> Self {
        self.max_distance = max_distance;
        self
    }

    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join(STORE_DIR_NAME)
    }

    pub fn index_path(&self) -> PathBuf {
        self.data_dir.join(INDEX_FILE_NAME)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        let config = CacheConfig::new("/tmp/ai", 8);
        assert_eq!(config.store_path(), PathBuf::from("/tmp/ai/store"));
        assert_eq!(config.index_path(), PathBuf::from("/tmp/ai/index.usearch"));
    }

    #[test]
    fn test_k_is_at_least_one() {
        assert_eq!(CacheConfig::new("/tmp", 8).with_k(0).k, 1);
    }

    #[test]
    fn test_from_settings() {
        let settings = Settings {
            vector_size: 1024,
            k: 3,
            max_distance: 0.3,
            data_dir: "/var/lib/ai".to_string(),
            ..Default::default()
        };
        let config = CacheConfig::from_settings(&settings);
        assert_eq!(config.dimension, 1024);
        assert_eq!(config.k, 3);
        assert_eq!(config.max_distance, 0.3);
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/ai"));
    }
}
