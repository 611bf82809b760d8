//! Scripted provider for tests and offline runs.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use aicmd_embeddings::Embedding;

use crate::error::ProviderError;
use crate::provider::{LlmProvider, Message};

/// Provider that answers with pre-recorded replies, in order.
///
/// Every conversation it receives is kept for inspection. Embeddings are
/// unsupported unless a fixed vector is given with [`with_embedding`].
///
/// [`with_embedding`]: MockProvider::with_embedding
pub struct MockProvider {
    replies: Mutex<VecDeque<String>>,
    received: Mutex<Vec<Vec<Message>>>,
    embedding: Option<Vec<f32>>,
}

impl MockProvider {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            received: Mutex::new(Vec::new()),
            embedding: None,
        }
    }

    /// Answer every `embed` call with `values`.
    pub fn with_embedding(mut self, values: Vec<f32>) -> Self {
        self.embedding = Some(values);
        self
    }

    /// Conversations sent to `complete` so far.
    pub fn received(&self) -> Vec<Vec<Message>> {
        match self.received.lock() {
            Ok(received) => received.clone(),
            Err(_) => Vec::new(),
        }
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn model(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, messages: &[Message]) -> Result<String, ProviderError> {
        if let Ok(mut received) = self.received.lock() {
            received.push(messages.to_vec());
        }
        let mut replies = self
            .replies
            .lock()
            .map_err(|_| ProviderError::Api("mock provider poisoned".to_string()))?;
        replies.pop_front().ok_or(ProviderError::EmptyResponse)
    }

    async fn embed(&self, _text: &str) -> Result<Embedding, ProviderError> {
        match &self.embedding {
            Some(values) => Ok(Embedding::new(values.clone())),
            None => Err(ProviderError::Unsupported("mock provider has no embeddings".to_string())),
        }
    }
}
