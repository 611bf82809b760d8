//! Cloudflare Workers AI.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::http::send_json;
use crate::provider::{LlmProvider, Message, ProviderConfig};

/// Base URL for an account's Workers AI `run` endpoints.
pub fn cloudflare_base_url(account_id: &str) -> String {
    format!(
        "https://api.cloudflare.com/client/v4/accounts/{}/ai/run",
        account_id
    )
}

#[derive(Serialize)]
struct RunRequest<'a> {
    messages: &'a [Message],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct RunResponse {
    result: RunResult,
}

#[derive(Deserialize)]
struct RunResult {
    #[serde(default)]
    response: String,
}

/// Client for Cloudflare Workers AI text generation models.
pub struct CloudflareProvider {
    client: Client,
    config: ProviderConfig,
}

impl CloudflareProvider {
    /// `config.base_url` is usually [`cloudflare_base_url`]; the model name
    /// is appended per request.
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        let client = config.http.build_client()?;
        Ok(Self { client, config })
    }

    async fn run(&self, messages: &[Message]) -> Result<String, ProviderError> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or_else(|| ProviderError::MissingApiKey {
                provider: "Cloudflare".to_string(),
                env: "CLOUDFLARE_API_KEY".to_string(),
            })?;

        let body = RunRequest {
            messages,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };
        let request = self
            .client
            .post(format!("{}/{}", self.config.base_url, self.config.model))
            .bearer_auth(api_key.expose_secret())
            .json(&body);
        let response: RunResponse = send_json(request).await?;

        if response.result.response.is_empty() {
            return Err(ProviderError::EmptyResponse);
        }
        Ok(response.result.response)
    }
}

#[async_trait]
impl LlmProvider for CloudflareProvider {
    fn name(&self) -> &'static str {
        "cloudflare"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn complete(&self, messages: &[Message]) -> Result<String, ProviderError> {
        self.config
            .http
            .with_retry("workers ai run", || self.run(messages))
            .await
    }
}
