//! RocksDB wrapper for the command cache.
//!
//! Provides:
//! - Database open/close with column family setup
//! - Single-key reads and writes of cache records
//! - Lazy prefix scans used to rebuild the vector index
//! - Dimension and embedding model bookkeeping in the meta column family

use rocksdb::{ColumnFamily, Direction, IteratorMode, Options, WriteBatch, DB};
use std::path::Path;
use tracing::{debug, info};

use crate::column_families::{build_cf_descriptors, CF_ENTRIES, CF_META};
use crate::error::StorageError;
use crate::keys::{EntryKey, ENTRY_PREFIX, META_DIMENSION};
use crate::record::CacheRecord;

const META_EMBEDDING_MODEL: &[u8] = b"embedding_model";

/// Durable identifier -> command store
pub struct ValueStore {
    db: DB,
}

impl ValueStore {
    /// Open the store at the given path, creating if necessary
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        info!("Opening value store at {:?}", path);

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);
        db_opts.set_max_background_jobs(2);

        let db = DB::open_cf_descriptors(&db_opts, path, build_cf_descriptors())?;
        Ok(Self { db })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily, StorageError> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StorageError::MissingColumnFamily(name.to_string()))
    }

    /// Get the record stored for an identifier
    pub fn get(&self, identifier: u64) -> Result<Option<CacheRecord>, StorageError> {
        let cf = self.cf(CF_ENTRIES)?;
        match self.db.get_cf(cf, EntryKey::new(identifier).to_bytes())? {
            Some(bytes) => Ok(Some(CacheRecord::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Store a record, replacing any previous one with the same identifier
    pub fn set(&self, record: &CacheRecord) -> Result<(), StorageError> {
        let cf = self.cf(CF_ENTRIES)?;
        let bytes = record.to_bytes()?;
        self.db
            .put_cf(cf, EntryKey::new(record.identifier).to_bytes(), bytes)?;
        debug!(identifier = record.identifier, "Stored cache record");
        Ok(())
    }

    /// Delete a record. Deleting an absent identifier is not an error.
    pub fn delete(&self, identifier: u64) -> Result<(), StorageError> {
        let cf = self.cf(CF_ENTRIES)?;
        self.db.delete_cf(cf, EntryKey::new(identifier).to_bytes())?;
        debug!(identifier, "Deleted cache record");
        Ok(())
    }

    /// Lazily iterate entries whose key starts with `prefix`.
    ///
    /// Keys that are not entry keys are reported as `StorageError::Key`
    /// items so callers can skip them.
    pub fn iterate<'a>(
        &'a self,
        prefix: &[u8],
    ) -> Result<impl Iterator<Item = Result<(EntryKey, CacheRecord), StorageError>> + 'a, StorageError>
    {
        let cf = self.cf(CF_ENTRIES)?;
        let prefix = prefix.to_vec();
        let iter = self
            .db
            .iterator_cf(cf, IteratorMode::From(&prefix, Direction::Forward));

        Ok(iter
            .take_while(move |item| match item {
                Ok((key, _)) => key.starts_with(&prefix),
                Err(_) => true,
            })
            .map(|item| -> Result<(EntryKey, CacheRecord), StorageError> {
                let (key, value) = item?;
                let key = EntryKey::from_bytes(&key)?;
                let record = CacheRecord::from_bytes(&value)?;
                Ok((key, record))
            }))
    }

    /// All readable records, in identifier order.
    ///
    /// Undecodable records are skipped.
    pub fn entries(&self) -> Result<Vec<CacheRecord>, StorageError> {
        let mut records = Vec::new();
        for item in self.iterate(ENTRY_PREFIX)? {
            match item {
                Ok((_, record)) => records.push(record),
                Err(StorageError::RocksDb(e)) => return Err(StorageError::RocksDb(e)),
                Err(e) => debug!(error = %e, "Skipping unreadable cache record"),
            }
        }
        Ok(records)
    }

    /// Number of stored entries
    pub fn count(&self) -> Result<usize, StorageError> {
        let cf = self.cf(CF_ENTRIES)?;
        let mut count = 0;
        for item in self.db.prefix_iterator_cf(cf, ENTRY_PREFIX) {
            let (key, _) = item?;
            if !key.starts_with(ENTRY_PREFIX) {
                break;
            }
            count += 1;
        }
        Ok(count)
    }

    /// Remove every entry. Metadata is kept.
    pub fn clear(&self) -> Result<usize, StorageError> {
        let cf = self.cf(CF_ENTRIES)?;
        let mut batch = WriteBatch::default();
        let mut removed = 0;
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (key, _) = item?;
            batch.delete_cf(cf, key);
            removed += 1;
        }
        self.db.write(batch)?;
        info!(removed, "Cleared value store");
        Ok(removed)
    }

    /// Dimension recorded on first open, if any
    pub fn dimension(&self) -> Result<Option<usize>, StorageError> {
        let cf = self.cf(CF_META)?;
        match self.db.get_cf(cf, META_DIMENSION)? {
            Some(bytes) => {
                let raw: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
                    StorageError::Meta {
                        key: "dimension",
                        reason: format!("expected 8 bytes, got {}", bytes.len()),
                    }
                })?;
                Ok(Some(u64::from_le_bytes(raw) as usize))
            }
            None => Ok(None),
        }
    }

    /// Record `dimension` if the store is new, otherwise require it to match.
    pub fn check_dimension(&self, dimension: usize) -> Result<(), StorageError> {
        match self.dimension()? {
            Some(stored) if stored == dimension => Ok(()),
            Some(stored) => Err(StorageError::DimensionMismatch {
                stored,
                configured: dimension,
            }),
            None => {
                let cf = self.cf(CF_META)?;
                self.db
                    .put_cf(cf, META_DIMENSION, (dimension as u64).to_le_bytes())?;
                info!(dimension, "Recorded vector dimension");
                Ok(())
            }
        }
    }

    /// `provider/model` of the embedder that last wrote to the store
    pub fn embedding_model(&self) -> Result<Option<String>, StorageError> {
        let cf = self.cf(CF_META)?;
        match self.db.get_cf(cf, META_EMBEDDING_MODEL)? {
            Some(bytes) => String::from_utf8(bytes)
                .map(Some)
                .map_err(|e| StorageError::Meta {
                    key: "embedding_model",
                    reason: e.to_string(),
                }),
            None => Ok(None),
        }
    }

    pub fn set_embedding_model(&self, model: &str) -> Result<(), StorageError> {
        let cf = self.cf(CF_META)?;
        self.db.put_cf(cf, META_EMBEDDING_MODEL, model.as_bytes())?;
        Ok(())
    }

    /// Flush memtables to disk
    pub fn flush(&self) -> Result<(), StorageError> {
        self.db.flush()?;
        Ok(())
    }
}
