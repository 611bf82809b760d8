//! Ollama through its OpenAI-compatible endpoints.

use async_trait::async_trait;

use aicmd_embeddings::Embedding;

use crate::error::ProviderError;
use crate::openai::OpenAiProvider;
use crate::provider::{LlmProvider, Message, ProviderConfig};

pub const OLLAMA_BASE_URL: &str = "http://localhost:11434";

/// Local Ollama server. No API key.
pub struct OllamaProvider {
    inner: OpenAiProvider,
}

impl OllamaProvider {
    /// `config.base_url` is the server root; `/v1` is appended.
    pub fn new(mut config: ProviderConfig) -> Result<Self, ProviderError> {
        config.base_url = format!("{}/v1", config.base_url.trim_end_matches('/'));
        config.api_key = None;
        Ok(Self {
            inner: OpenAiProvider::named("ollama", config)?,
        })
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn model(&self) -> &str {
        self.inner.model()
    }

    async fn complete(&self, messages: &[Message]) -> Result<String, ProviderError> {
        self.inner.complete(messages).await
    }

    async fn embed(&self, text: &str) -> Result<Embedding, ProviderError> {
        self.inner.embed(text).await
    }
}
