//! Anthropic messages API.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::http::send_json;
use crate::provider::{LlmProvider, Message, ProviderConfig, Role};

pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<&'a Message>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

/// Client for Anthropic's messages API. Completions only.
pub struct AnthropicProvider {
    client: Client,
    config: ProviderConfig,
}

impl AnthropicProvider {
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        let client = config.http.build_client()?;
        Ok(Self { client, config })
    }

    /// System messages go into the top-level `system` field.
    fn build_request<'a>(&'a self, messages: &'a [Message]) -> MessagesRequest<'a> {
        let system: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect();

        MessagesRequest {
            model: &self.config.model,
            system: (!system.is_empty()).then(|| system.join("\n\n")),
            messages: messages.iter().filter(|m| m.role != Role::System).collect(),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        }
    }

    async fn send(&self, messages: &[Message]) -> Result<String, ProviderError> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or_else(|| ProviderError::MissingApiKey {
                provider: "Anthropic".to_string(),
                env: "ANTHROPIC_API_KEY".to_string(),
            })?;

        let request = self
            .client
            .post(format!("{}/messages", self.config.base_url))
            .header("x-api-key", api_key.expose_secret())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&self.build_request(messages));
        let response: MessagesResponse = send_json(request).await?;

        response
            .content
            .into_iter()
            .next()
            .map(|c| c.text)
            .filter(|text| !text.is_empty())
            .ok_or(ProviderError::EmptyResponse)
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn complete(&self, messages: &[Message]) -> Result<String, ProviderError> {
        self.config
            .http
            .with_retry("messages", || self.send(messages))
            .await
    }
}
