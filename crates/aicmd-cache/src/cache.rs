//! Semantic command cache.
//!
//! Writes go to the value store first, then to the index. Index entries
//! without a record are treated as misses.

use std::fs;

use serde::Serialize;
use tracing::{debug, info, warn};

use aicmd_embeddings::{Embedding, EmbeddingError, EmbeddingProvider};
use aicmd_storage::{CacheRecord, ValueStore};
use aicmd_vector::{identifier_of, HnswConfig, HnswIndex, IdentifierMapper, VectorError, VectorIndex};

use crate::config::CacheConfig;
use crate::error::CacheError;

/// A cached command close enough to the queried instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheHit {
    pub identifier: u64,
    /// Instruction the command was originally generated for
    pub instruction: String,
    pub command: String,
    /// Cosine distance between the query and the stored instruction
    pub distance: f32,
}

/// Snapshot of the cache size and settings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    /// Records in the value store
    pub entries: usize,
    /// Vectors in the index
    pub indexed: usize,
    pub dimension: usize,
    pub max_distance: f32,
    /// Size of the serialized index
    pub index_bytes: usize,
}

/// Outcome of an index rebuild.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RebuildStats {
    /// Records read from the store
    pub records: usize,
    /// Vectors reused from the records
    pub reused: usize,
    /// Records embedded again
    pub embedded: usize,
    /// Records left out of the index
    pub failed: usize,
}

/// Acceptance rule for a search result: the threshold itself is a hit.
pub fn within_threshold(distance: f32, max_distance: f32) -> bool {
    distance <= max_distance
}

/// Instruction -> command cache backed by an HNSW index and a value store.
pub struct SemanticCache<E: EmbeddingProvider> {
    config: CacheConfig,
    embedder: E,
    store: ValueStore,
    index: HnswIndex,
    identifiers: IdentifierMapper,
    /// `provider/model` of the embedder
    model: String,
    /// Index changes not yet saved
    dirty: bool,
}

impl<E: EmbeddingProvider> SemanticCache<E> {
    /// Open the cache in `config.data_dir`, creating it if needed.
    ///
    /// A missing or unusable index file, or an embedding model change, leads
    /// to a rebuild from the stored records.
    pub async fn open(config: CacheConfig, embedder: E) -> Result<Self, CacheError> {
        let provided = embedder.info().dimension;
        if provided != config.dimension {
            return Err(CacheError::DimensionMismatch {
                expected: config.dimension,
                actual: provided,
            });
        }

        fs::create_dir_all(&config.data_dir)?;
        let store = ValueStore::open(&config.store_path())?;
        store.check_dimension(config.dimension)?;

        let records = store.entries()?;
        let identifiers = IdentifierMapper::rebuild(
            records
                .iter()
                .map(|r| (r.identifier, r.instruction.clone())),
        );

        let model = embedder.info().qualified_name();
        let model_changed = match store.embedding_model()? {
            Some(previous) if previous != model => {
                warn!(previous = %previous, current = %model, "Embedding model changed, index will be rebuilt");
                true
            }
            Some(_) => false,
            None => {
                store.set_embedding_model(&model)?;
                false
            }
        };

        let hnsw_config = HnswConfig::new(config.dimension, &config.data_dir);
        let (index, needs_rebuild) = match HnswIndex::load(hnsw_config.clone()) {
            Ok(index) => (index, model_changed),
            Err(VectorError::NotFound(_)) => (HnswIndex::create(hnsw_config)?, !records.is_empty()),
            Err(VectorError::Corrupt(reason)) => {
                warn!(reason = %reason, "Vector index unusable, rebuilding from store");
                (HnswIndex::create(hnsw_config)?, true)
            }
            Err(e) => return Err(e.into()),
        };

        let mut cache = Self {
            config,
            embedder,
            store,
            index,
            identifiers,
            model,
            dirty: false,
        };

        if needs_rebuild {
            cache.rebuild_index().await?;
        }

        info!(
            entries = cache.identifiers.len(),
            indexed = cache.index.len(),
            "Semantic cache ready"
        );
        Ok(cache)
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn embedder(&self) -> &E {
        &self.embedder
    }

    /// Embed text with the cache's provider, checking the dimension.
    pub async fn embed(&self, text: &str) -> Result<Embedding, CacheError> {
        let embedding = self.embedder.embed(text).await.map_err(|e| match e {
            EmbeddingError::DimensionMismatch { expected, actual } => {
                CacheError::DimensionMismatch { expected, actual }
            }
            other => CacheError::Provider(other),
        })?;
        self.check_dimension(&embedding)?;
        Ok(embedding)
    }

    /// Find a cached command for `instruction`.
    ///
    /// Any failure (provider, index, store) is logged and reported as a miss.
    pub async fn lookup(&self, instruction: &str) -> Option<CacheHit> {
        match self.embed(instruction).await {
            Ok(embedding) => self.lookup_with_embedding(&embedding),
            Err(e) => {
                warn!(error = %e, "Embedding failed, treating as cache miss");
                None
            }
        }
    }

    /// Find a cached command from an already computed embedding.
    ///
    /// Only the nearest neighbour is considered. If it has no record the
    /// lookup is a miss.
    pub fn lookup_with_embedding(&self, embedding: &Embedding) -> Option<CacheHit> {
        let nearest = match self.index.search(embedding, self.config.k) {
            Ok(results) => results.into_iter().next()?,
            Err(e) => {
                warn!(error = %e, "Vector search failed, treating as cache miss");
                return None;
            }
        };

        if !within_threshold(nearest.distance, self.config.max_distance) {
            debug!(
                distance = nearest.distance,
                max_distance = self.config.max_distance,
                "Nearest entry too far"
            );
            return None;
        }
        if self.identifiers.resolve(nearest.identifier).is_none() {
            debug!(identifier = nearest.identifier, "Indexed entry is not in the store");
            return None;
        }

        match self.store.get(nearest.identifier) {
            Ok(Some(record)) => {
                debug!(identifier = nearest.identifier, distance = nearest.distance, "Cache hit");
                Some(CacheHit {
                    identifier: nearest.identifier,
                    instruction: record.instruction,
                    command: record.command,
                    distance: nearest.distance,
                })
            }
            Ok(None) => {
                debug!(identifier = nearest.identifier, "Indexed entry has no record");
                None
            }
            Err(e) => {
                warn!(identifier = nearest.identifier, error = %e, "Failed to read cache record");
                None
            }
        }
    }

    /// Embed `instruction` and remember `command` for it.
    ///
    /// Nothing is written when the provider fails.
    pub async fn insert(&mut self, instruction: &str, command: &str) -> Result<u64, CacheError> {
        validate_entry(instruction, command)?;
        let embedding = self.embed(instruction).await?;
        self.insert_with_embedding(instruction, command, &embedding)
    }

    /// Remember `command` for `instruction` using a precomputed embedding.
    ///
    /// Inserting the same instruction again replaces its command.
    pub fn insert_with_embedding(
        &mut self,
        instruction: &str,
        command: &str,
        embedding: &Embedding,
    ) -> Result<u64, CacheError> {
        validate_entry(instruction, command)?;
        self.check_dimension(embedding)?;

        let identifier = identifier_of(instruction);
        let record = CacheRecord::new(identifier, instruction, command)
            .with_embedding(embedding.values.clone(), self.model.as_str());
        self.store.set(&record)?;
        self.identifiers.register(instruction, identifier);

        self.index.add(identifier, embedding)?;
        self.dirty = true;
        self.save_index()?;

        info!(identifier, "Cached command");
        Ok(identifier)
    }

    /// Drop an entry from store and index.
    ///
    /// Returns whether anything was removed. Failures are logged only.
    pub fn evict(&mut self, identifier: u64) -> bool {
        let mut removed = self.identifiers.forget(identifier).is_some();

        match self.store.get(identifier) {
            Ok(Some(_)) => removed = true,
            Ok(None) => {}
            Err(e) => debug!(identifier, error = %e, "Evicting unreadable record"),
        }
        if let Err(e) = self.store.delete(identifier) {
            warn!(identifier, error = %e, "Failed to delete cache record");
        }

        match self.index.remove(identifier) {
            Ok(true) => {
                removed = true;
                self.dirty = true;
            }
            Ok(false) => {}
            Err(e) => warn!(identifier, error = %e, "Failed to remove vector"),
        }

        if self.dirty {
            if let Err(e) = self.save_index() {
                warn!(error = %e, "Failed to save vector index after eviction");
            }
        }

        if removed {
            info!(identifier, "Evicted cache entry");
        }
        removed
    }

    /// Evict the entry stored for an exact instruction.
    pub fn forget(&mut self, instruction: &str) -> bool {
        self.evict(identifier_of(instruction))
    }

    /// Rebuild the index from the value store.
    ///
    /// Stored vectors from the current model are reused; other records are
    /// embedded again and written back. Records that cannot be embedded
    /// stay in the store but out of the index.
    pub async fn rebuild_index(&mut self) -> Result<RebuildStats, CacheError> {
        info!("Rebuilding vector index from store");
        self.index.clear()?;

        let records = self.store.entries()?;
        let mut stats = RebuildStats {
            records: records.len(),
            ..Default::default()
        };

        for mut record in records {
            let reusable = record.has_embedding_for(&self.model, self.config.dimension);
            let embedding = match record.embedding.take() {
                Some(values) if reusable => {
                    stats.reused += 1;
                    Embedding::from_normalized(values)
                }
                _ => match self.embed(&record.instruction).await {
                    Ok(embedding) => {
                        stats.embedded += 1;
                        let refreshed = CacheRecord {
                            embedding: Some(embedding.values.clone()),
                            model: Some(self.model.clone()),
                            ..record.clone()
                        };
                        if let Err(e) = self.store.set(&refreshed) {
                            warn!(identifier = record.identifier, error = %e, "Failed to store refreshed embedding");
                        }
                        embedding
                    }
                    Err(e) => {
                        warn!(identifier = record.identifier, error = %e, "Skipping record that cannot be embedded");
                        stats.failed += 1;
                        continue;
                    }
                },
            };

            if let Err(e) = self.index.add(record.identifier, &embedding) {
                warn!(identifier = record.identifier, error = %e, "Failed to index record");
                stats.failed += 1;
            }
        }

        self.identifiers = IdentifierMapper::rebuild(
            self.store
                .entries()?
                .into_iter()
                .map(|r| (r.identifier, r.instruction)),
        );
        self.dirty = true;
        self.save_index()?;
        self.store.set_embedding_model(&self.model)?;

        info!(
            records = stats.records,
            reused = stats.reused,
            embedded = stats.embedded,
            failed = stats.failed,
            "Vector index rebuilt"
        );
        Ok(stats)
    }

    /// All stored records, in identifier order.
    pub fn entries(&self) -> Result<Vec<CacheRecord>, CacheError> {
        Ok(self.store.entries()?)
    }

    pub fn stats(&self) -> Result<CacheStats, CacheError> {
        Ok(CacheStats {
            entries: self.store.count()?,
            indexed: self.index.len(),
            dimension: self.config.dimension,
            max_distance: self.config.max_distance,
            index_bytes: self.index.stats().size_bytes,
        })
    }

    /// Remove every entry. Returns the number of records removed.
    pub fn clear(&mut self) -> Result<usize, CacheError> {
        let removed = self.store.clear()?;
        self.index.clear()?;
        self.identifiers.clear();
        self.dirty = true;
        self.save_index()?;
        info!(removed, "Cleared semantic cache");
        Ok(removed)
    }

    /// Flush the store and save the index, reporting failures.
    pub fn close(mut self) -> Result<(), CacheError> {
        self.persist()
    }

    fn persist(&mut self) -> Result<(), CacheError> {
        self.store.flush()?;
        if self.dirty {
            self.save_index()?;
        }
        Ok(())
    }

    fn check_dimension(&self, embedding: &Embedding) -> Result<(), CacheError> {
        if embedding.dimension() != self.config.dimension {
            return Err(CacheError::DimensionMismatch {
                expected: self.config.dimension,
                actual: embedding.dimension(),
            });
        }
        Ok(())
    }

    fn save_index(&mut self) -> Result<(), CacheError> {
        self.index.save()?;
        self.dirty = false;
        Ok(())
    }
}

impl<E: EmbeddingProvider> Drop for SemanticCache<E> {
    fn drop(&mut self) {
        if let Err(e) = self.persist() {
            warn!(error = %e, "Failed to persist semantic cache");
        }
    }
}

fn validate_entry(instruction: &str, command: &str) -> Result<(), CacheError> {
    if instruction.trim().is_empty() {
        return Err(CacheError::InvalidInput("empty instruction".to_string()));
    }
    if command.trim().is_empty() {
        return Err(CacheError::InvalidInput("empty command".to_string()));
    }
    Ok(())
}
