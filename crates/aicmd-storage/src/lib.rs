//! Value store for the semantic command cache.
//!
//! Provides RocksDB-backed storage with:
//! - Column family isolation for cache entries and store metadata
//! - Identifier-keyed records with prefix iteration for index rebuilds
//! - Crash-safe single-key writes (RocksDB WAL)
//! - A recorded vector dimension guarding against config drift

pub mod column_families;
pub mod db;
pub mod error;
pub mod keys;
pub mod record;

pub use db::ValueStore;
pub use error::StorageError;
pub use keys::{EntryKey, ENTRY_PREFIX};
pub use record::CacheRecord;
