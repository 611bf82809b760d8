//! Provider trait and chat message types.

use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use aicmd_embeddings::Embedding;

use crate::error::ProviderError;
use crate::http::HttpConfig;

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One turn of a conversation sent to a completion API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Connection settings shared by all providers.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// API base URL, without a trailing slash
    pub base_url: String,
    /// Model used for completions or embeddings
    pub model: String,
    pub api_key: Option<SecretString>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub http: HttpConfig,
}

impl ProviderConfig {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: None,
            max_tokens: 1000,
            temperature: 0.1,
            http: HttpConfig::default(),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::from(api_key.into()));
        self
    }

    pub fn with_sampling(mut self, max_tokens: u32, temperature: f32) -> Self {
        self.max_tokens = max_tokens;
        self.temperature = temperature;
        self
    }

    pub fn with_http(mut self, http: HttpConfig) -> Self {
        self.http = http;
        self
    }
}

/// A vendor API able to complete conversations and, possibly, embed text.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Short lowercase provider name (`openai`, `anthropic`, ...)
    fn name(&self) -> &'static str;

    /// Model requests are sent to
    fn model(&self) -> &str;

    /// Return the assistant's reply to `messages`.
    async fn complete(&self, messages: &[Message]) -> Result<String, ProviderError>;

    /// Embed `text`.
    async fn embed(&self, _text: &str) -> Result<Embedding, ProviderError> {
        Err(ProviderError::Unsupported(format!(
            "{} does not provide embeddings",
            self.name()
        )))
    }
}
