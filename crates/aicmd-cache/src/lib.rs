//! # aicmd-cache
//!
//! Semantic cache mapping natural-language instructions to shell commands
//! that already worked.
//!
//! A lookup embeds the instruction, asks the HNSW index for the nearest
//! stored instruction and returns its command when the cosine distance is
//! within the configured threshold. Records live in a RocksDB value store;
//! the index only holds vectors and can always be rebuilt from the store.

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{within_threshold, CacheHit, CacheStats, RebuildStats, SemanticCache};
pub use config::CacheConfig;
pub use error::CacheError;
