//! Instruction identifiers.
//!
//! The index only understands `u64` keys. Each instruction is mapped to one
//! with 64-bit FNV-1a over its UTF-8 bytes. Two instructions that collide
//! share a cache slot.
//!
//! The reverse map (identifier -> instruction) lives in memory only and is
//! rebuilt from the value store on open, so losing it costs cache misses,
//! never data.

use std::collections::HashMap;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Derive the identifier of an instruction.
pub fn identifier_of(instruction: &str) -> u64 {
    instruction
        .as_bytes()
        .iter()
        .fold(FNV_OFFSET_BASIS, |hash, &byte| {
            (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
        })
}

/// In-memory identifier -> instruction map.
#[derive(Debug, Default, Clone)]
pub struct IdentifierMapper {
    reverse: HashMap<u64, String>,
}

impl IdentifierMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the map from `(identifier, instruction)` pairs, typically
    /// the records of the value store.
    pub fn rebuild<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (u64, String)>,
    {
        Self {
            reverse: entries.into_iter().collect(),
        }
    }

    /// Record that `identifier` belongs to `instruction`.
    pub fn register(&mut self, instruction: impl Into<String>, identifier: u64) {
        self.reverse.insert(identifier, instruction.into());
    }

    pub fn resolve(&self, identifier: u64) -> Option<&str> {
        self.reverse.get(&identifier).map(String::as_str)
    }

    pub fn forget(&mut self, identifier: u64) -> Option<String> {
        self.reverse.remove(&identifier)
    }

    pub fn clear(&mut self) {
        self.reverse.clear();
    }

    pub fn len(&self) -> usize {
        self.reverse.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reverse.is_empty()
    }
}
