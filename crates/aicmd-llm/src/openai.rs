//! OpenAI chat completions and embeddings.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use aicmd_embeddings::Embedding;

use crate::error::ProviderError;
use crate::http::send_json;
use crate::provider::{LlmProvider, Message, ProviderConfig};

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Client for the OpenAI API and OpenAI-compatible servers.
pub struct OpenAiProvider {
    client: Client,
    config: ProviderConfig,
    name: &'static str,
}

impl OpenAiProvider {
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        Self::named("openai", config)
    }

    /// Same wire protocol under another provider name.
    pub(crate) fn named(name: &'static str, config: ProviderConfig) -> Result<Self, ProviderError> {
        let client = config.http.build_client()?;
        Ok(Self {
            client,
            config,
            name,
        })
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        let request = self
            .client
            .post(format!("{}{}", self.config.base_url, path));
        match &self.config.api_key {
            Some(key) => request.bearer_auth(key.expose_secret()),
            None => request,
        }
    }

    async fn chat(&self, messages: &[Message]) -> Result<String, ProviderError> {
        let request = ChatRequest {
            model: &self.config.model,
            messages,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };
        let response: ChatResponse = send_json(self.post("/chat/completions").json(&request)).await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(ProviderError::EmptyResponse)
    }

    async fn embedding(&self, text: &str) -> Result<Embedding, ProviderError> {
        let request = EmbeddingRequest {
            model: &self.config.model,
            input: text,
        };
        let response: EmbeddingResponse = send_json(self.post("/embeddings").json(&request)).await?;

        response
            .data
            .into_iter()
            .next()
            .filter(|d| !d.embedding.is_empty())
            .map(|d| Embedding::new(d.embedding))
            .ok_or_else(|| ProviderError::Parse("No embeddings returned in the API response".to_string()))
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn complete(&self, messages: &[Message]) -> Result<String, ProviderError> {
        self.config
            .http
            .with_retry("chat completion", || self.chat(messages))
            .await
    }

    async fn embed(&self, text: &str) -> Result<Embedding, ProviderError> {
        self.config
            .http
            .with_retry("embedding", || self.embedding(text))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpConfig;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer, model: &str) -> OpenAiProvider {
        let config = ProviderConfig::new(format!("{}/v1", server.uri()), model)
            .with_api_key("sk-test")
            .with_http(HttpConfig {
                initial_backoff: Duration::from_millis(1),
                ..Default::default()
            });
        OpenAiProvider::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_complete() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "gpt-4o",
                "messages": [{"role": "system", "content": "sys"}, {"role": "user", "content": "list files"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "<command>ls</command>"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let reply = provider(&server, "gpt-4o")
            .complete(&[Message::system("sys"), Message::user("list files")])
            .await
            .unwrap();
        assert_eq!(reply, "<command>ls</command>");
    }

    #[tokio::test]
    async fn test_complete_retries_rate_limit() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "pwd"}}]
            })))
            .mount(&server)
            .await;

        let reply = provider(&server, "gpt-4o")
            .complete(&[Message::user("where am i")])
            .await
            .unwrap();
        assert_eq!(reply, "pwd");
    }

    #[tokio::test]
    async fn test_unauthorized_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid key"))
            .expect(1)
            .mount(&server)
            .await;

        let err = provider(&server, "gpt-4o")
            .complete(&[Message::user("x")])
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Status { status: 401, .. }));
    }

    #[tokio::test]
    async fn test_empty_choices() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let err = provider(&server, "gpt-4o")
            .complete(&[Message::user("x")])
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::EmptyResponse));
    }

    #[tokio::test]
    async fn test_embed_normalizes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .and(body_partial_json(json!({"model": "text-embedding-3-small", "input": "list files"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"embedding": [3.0, 4.0]}]
            })))
            .mount(&server)
            .await;

        let embedding = provider(&server, "text-embedding-3-small")
            .embed("list files")
            .await
            .unwrap();
        assert_eq!(embedding.dimension(), 2);
        assert!((embedding.values[0] - 0.6).abs() < 1e-6);
        assert!((embedding.values[1] - 0.8).abs() < 1e-6);
    }
}
