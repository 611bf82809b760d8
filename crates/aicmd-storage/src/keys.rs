//! Key encoding and decoding for storage layer.
//!
//! Entry key format: `entry:{identifier:016x}`
//! - fixed-width lowercase hex keeps keys the same length and sorted by
//!   identifier
//!
//! Meta keys are plain names (`dimension`).

use crate::error::StorageError;

/// Prefix shared by all entry keys.
pub const ENTRY_PREFIX: &[u8] = b"entry:";

/// Meta key holding the vector dimension.
pub const META_DIMENSION: &[u8] = b"dimension";

/// Key for a cache entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct EntryKey {
    pub identifier: u64,
}

impl EntryKey {
    pub fn new(identifier: u64) -> Self {
        Self { identifier }
    }

    /// Encode key to bytes for storage
    pub fn to_bytes(&self) -> Vec<u8> {
        format!("entry:{:016x}", self.identifier).into_bytes()
    }

    /// Decode key from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StorageError> {
        let s = std::str::from_utf8(bytes)
            .map_err(|e| StorageError::Key(format!("Invalid UTF-8: {}", e)))?;

        let hex = s
            .strip_prefix("entry:")
            .ok_or_else(|| StorageError::Key(format!("Invalid entry key format: {}", s)))?;
        if hex.len() != 16 {
            return Err(StorageError::Key(format!("Invalid entry key length: {}", s)));
        }

        let identifier = u64::from_str_radix(hex, 16)
            .map_err(|e| StorageError::Key(format!("Invalid identifier: {}", e)))?;
        Ok(Self { identifier })
    }
}
