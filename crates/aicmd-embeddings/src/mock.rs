//! Mock embedder for testing.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tracing::debug;

use crate::error::EmbeddingError;
use crate::model::{Embedding, EmbeddingProvider, ModelInfo};

/// Deterministic bag-of-words embedder.
///
/// Each lowercase word (with a trailing plural `s` dropped) is hashed into
/// one of `dimension` buckets. Texts sharing words end up close under
/// cosine distance, which is enough to exercise approximate matching
/// without network access.
pub struct MockEmbedder {
    info: ModelInfo,
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl MockEmbedder {
    /// Create a new mock embedder producing vectors of `dimension` length.
    pub fn new(dimension: usize) -> Self {
        Self {
            info: ModelInfo::new("mock", "bag-of-words", dimension),
            failing: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    /// Make every following call fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of `embed` calls made so far, failed ones included.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn bucket(&self, word: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        word.hash(&mut hasher);
        (hasher.finish() % self.info.dimension as u64) as usize
    }
}

fn normalize_word(word: &str) -> String {
    let word = word.to_lowercase();
    match word.strip_suffix('s') {
        Some(stem) if stem.len() > 2 && !stem.ends_with('s') => stem.to_string(),
        _ => word,
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbedder {
    fn info(&self) -> &ModelInfo {
        &self.info
    }

    async fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(EmbeddingError::Provider("mock embedder set to fail".to_string()));
        }

        let mut values = vec![0.0f32; self.info.dimension];
        let mut words = 0;
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            values[self.bucket(&normalize_word(word))] += 1.0;
            words += 1;
        }

        if words == 0 {
            return Err(EmbeddingError::InvalidInput("empty text".to_string()));
        }

        debug!(words, "Mock embedding");
        Ok(Embedding::new(values))
    }
}
