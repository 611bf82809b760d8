//! Column family definitions for RocksDB.
//!
//! - entries: identifier -> cached command record
//! - meta: store-wide settings (vector dimension)

use rocksdb::{ColumnFamilyDescriptor, Options};

/// Column family name for cache entries
pub const CF_ENTRIES: &str = "entries";

/// Column family name for store metadata
pub const CF_META: &str = "meta";

/// All column family names
pub const ALL_CF_NAMES: &[&str] = &[CF_ENTRIES, CF_META];

/// Entries are small JSON documents read by point lookup.
fn entries_options() -> Options {
    let mut opts = Options::default();
    opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
    opts
}

/// Build all column family descriptors
pub fn build_cf_descriptors() -> Vec<ColumnFamilyDescriptor> {
    vec![
        ColumnFamilyDescriptor::new(CF_ENTRIES, entries_options()),
        ColumnFamilyDescriptor::new(CF_META, Options::default()),
    ]
}
