//! Value store errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("RocksDB error: {0}")]
    RocksDb(#[from] rocksdb::Error),

    /// The database was opened without one of the cache's column families
    #[error("Missing column family: {0}")]
    MissingColumnFamily(String),

    /// Key bytes that are not `entry:{identifier:016x}`
    #[error("Bad entry key: {0}")]
    Key(String),

    /// A cache record that cannot be encoded or decoded as JSON
    #[error("Bad cache record: {0}")]
    Record(String),

    /// A meta value with the wrong shape
    #[error("Bad meta value for {key}: {reason}")]
    Meta { key: &'static str, reason: String },

    /// The store was built for vectors of another length
    #[error("Store holds {stored}-dimensional vectors but {configured} are configured")]
    DimensionMismatch { stored: usize, configured: usize },
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Record(err.to_string())
    }
}
