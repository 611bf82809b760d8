//! # aicmd-vector
//!
//! Vector index for the semantic command cache.
//!
//! Instructions are embedded and stored in an HNSW (Hierarchical Navigable
//! Small World) index via usearch, keyed by a 64-bit identifier derived
//! from the instruction text.
//!
//! ## Features
//! - usearch-powered HNSW index persisted to a single file
//! - Atomic saves (write to a temp file, then rename)
//! - Capacity grown on demand before insertion
//! - FNV-1a identifiers with an in-memory reverse map

pub mod error;
pub mod hnsw;
pub mod identifier;
pub mod index;

pub use error::VectorError;
pub use hnsw::{HnswConfig, HnswIndex, INDEX_FILE_NAME};
pub use identifier::{identifier_of, IdentifierMapper};
pub use index::{IndexStats, SearchResult, VectorIndex};
