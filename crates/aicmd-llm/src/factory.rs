//! Provider selection from settings, and the embedding adapter.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use aicmd_embeddings::{Embedding, EmbeddingError, EmbeddingProvider, ModelInfo};
use aicmd_types::{ProviderKind, Settings};

use crate::anthropic::{AnthropicProvider, ANTHROPIC_BASE_URL};
use crate::cloudflare::{cloudflare_base_url, CloudflareProvider};
use crate::error::ProviderError;
use crate::http::HttpConfig;
use crate::ollama::OllamaProvider;
use crate::openai::{OpenAiProvider, OPENAI_BASE_URL};
use crate::provider::{LlmProvider, ProviderConfig};

/// What a provider is created for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderRole {
    Completion,
    Embedding,
}

/// Embedding model used when `embedding_model` is not configured.
pub fn default_embedding_model(kind: ProviderKind) -> Option<&'static str> {
    match kind {
        ProviderKind::OpenAi => Some("text-embedding-3-small"),
        ProviderKind::Ollama => Some("bge-m3"),
        ProviderKind::Anthropic | ProviderKind::Cloudflare => None,
    }
}

/// Build the provider configured for `role`.
pub fn create_provider(
    settings: &Settings,
    role: ProviderRole,
) -> Result<Arc<dyn LlmProvider>, ProviderError> {
    let kind = match role {
        ProviderRole::Completion => settings.provider_kind(),
        ProviderRole::Embedding => settings.embedding_provider_kind(),
    }
    .map_err(|e| ProviderError::Config(e.to_string()))?;

    let model = match role {
        ProviderRole::Completion => settings.model.clone(),
        ProviderRole::Embedding if !settings.embedding_model.is_empty() => {
            settings.embedding_model.clone()
        }
        ProviderRole::Embedding => default_embedding_model(kind)
            .ok_or_else(|| {
                ProviderError::Unsupported(format!("{} does not provide embeddings", kind))
            })?
            .to_string(),
    };

    if role == ProviderRole::Embedding && default_embedding_model(kind).is_none() {
        return Err(ProviderError::Unsupported(format!(
            "{} does not provide embeddings",
            kind
        )));
    }

    let http = HttpConfig {
        max_attempts: 3,
        ..Default::default()
    };
    let base = |url: String| {
        ProviderConfig::new(url, model.clone())
            .with_sampling(settings.max_tokens, settings.temperature)
            .with_http(http.clone())
    };

    debug!(provider = %kind, model = %model, ?role, "Creating provider");

    let provider: Arc<dyn LlmProvider> = match kind {
        ProviderKind::OpenAi => Arc::new(OpenAiProvider::new(
            base(OPENAI_BASE_URL.to_string()).with_api_key(require_key(settings, kind)?),
        )?),
        ProviderKind::Anthropic => Arc::new(AnthropicProvider::new(
            base(ANTHROPIC_BASE_URL.to_string()).with_api_key(require_key(settings, kind)?),
        )?),
        ProviderKind::Ollama => Arc::new(OllamaProvider::new(base(settings.ollama_base_url.clone()))?),
        ProviderKind::Cloudflare => {
            let account_id = settings.cloudflare_account_id().ok_or_else(|| {
                ProviderError::Config(
                    "Cloudflare Account ID not set. Use 'ai config set cloudflare_account_id' or set the CLOUDFLARE_ACCOUNT_ID environment variable"
                        .to_string(),
                )
            })?;
            Arc::new(CloudflareProvider::new(
                base(cloudflare_base_url(&account_id)).with_api_key(require_key(settings, kind)?),
            )?)
        }
    };
    Ok(provider)
}

fn require_key(settings: &Settings, kind: ProviderKind) -> Result<String, ProviderError> {
    settings
        .api_key(kind)
        .ok_or_else(|| ProviderError::MissingApiKey {
            provider: kind.to_string(),
            env: kind.api_key_env().unwrap_or_default().to_string(),
        })
}

/// Embedding provider configured in `settings`, ready for the cache.
pub fn create_embedder(settings: &Settings) -> Result<ProviderEmbedder, ProviderError> {
    let provider = create_provider(settings, ProviderRole::Embedding)?;
    Ok(ProviderEmbedder::new(provider, settings.vector_size))
}

/// Exposes an [`LlmProvider`]'s embeddings as an [`EmbeddingProvider`].
pub struct ProviderEmbedder {
    provider: Arc<dyn LlmProvider>,
    info: ModelInfo,
}

impl ProviderEmbedder {
    pub fn new(provider: Arc<dyn LlmProvider>, dimension: usize) -> Self {
        let info = ModelInfo::new(provider.name(), provider.model(), dimension);
        Self { provider, info }
    }
}

#[async_trait]
impl EmbeddingProvider for ProviderEmbedder {
    fn info(&self) -> &ModelInfo {
        &self.info
    }

    async fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::InvalidInput("empty text".to_string()));
        }
        let embedding = self.provider.embed(text).await.map_err(|e| match e {
            ProviderError::Unsupported(msg) => EmbeddingError::Unsupported(msg),
            other => EmbeddingError::Provider(other.to_string()),
        })?;
        embedding.ensure_dimension(self.info.dimension)?;
        Ok(embedding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockProvider;

    fn settings(provider: &str) -> Settings {
        let mut settings = Settings {
            provider: provider.to_string(),
            embedding_provider: provider.to_string(),
            ..Default::default()
        };
        settings.api_keys.openai = Some("sk-test".to_string());
        settings.api_keys.anthropic = Some("ak-test".to_string());
        settings.api_keys.cloudflare = Some("cf-test".to_string());
        settings
    }

    #[test]
    fn test_completion_providers() {
        let p = create_provider(&settings("OpenAI"), ProviderRole::Completion).unwrap();
        assert_eq!(p.name(), "openai");

        let p = create_provider(&settings("anthropic"), ProviderRole::Completion).unwrap();
        assert_eq!(p.name(), "anthropic");
        assert_eq!(p.model(), "claude-3-5-sonnet-20240620");

        let p = create_provider(&settings("ollama"), ProviderRole::Completion).unwrap();
        assert_eq!(p.name(), "ollama");
    }

    #[test]
    fn test_cloudflare_with_account() {
        let mut s = settings("cloudflare");
        s.cloudflare_account_id = Some("acct".to_string());
        let p = create_provider(&s, ProviderRole::Completion).unwrap();
        assert_eq!(p.name(), "cloudflare");
    }

    #[test]
    fn test_default_embedding_model() {
        let p = create_provider(&settings("openai"), ProviderRole::Embedding).unwrap();
        assert_eq!(p.model(), "text-embedding-3-small");

        let p = create_provider(&settings("ollama"), ProviderRole::Embedding).unwrap();
        assert_eq!(p.model(), "bge-m3");

        let mut s = settings("openai");
        s.embedding_model = "text-embedding-3-large".to_string();
        let p = create_provider(&s, ProviderRole::Embedding).unwrap();
        assert_eq!(p.model(), "text-embedding-3-large");
    }

    #[test]
    fn test_embedding_unsupported() {
        for name in ["anthropic", "cloudflare"] {
            let mut s = settings(name);
            s.cloudflare_account_id = Some("acct".to_string());
            let result = create_provider(&s, ProviderRole::Embedding);
            assert!(matches!(result, Err(ProviderError::Unsupported(_))));
        }
    }

    #[test]
    fn test_unknown_provider() {
        let result = create_provider(&settings("gemini"), ProviderRole::Completion);
        assert!(matches!(result, Err(ProviderError::Config(_))));
    }

    #[test]
    fn test_embedder_info() {
        let embedder = create_embedder(&settings("openai")).unwrap();
        assert_eq!(embedder.info().dimension, 1536);
        assert_eq!(embedder.info().qualified_name(), "openai/text-embedding-3-small");
    }

    #[tokio::test]
    async fn test_embedder_maps_unsupported() {
        let embedder = ProviderEmbedder::new(Arc::new(MockProvider::new(Vec::<String>::new())), 8);
        let err = embedder.embed("list files").await.unwrap_err();
        assert!(matches!(err, EmbeddingError::Unsupported(_)));

        let err = embedder.embed("   ").await.unwrap_err();
        assert!(matches!(err, EmbeddingError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_embedder_rejects_wrong_length() {
        let provider = MockProvider::new(Vec::<String>::new()).with_embedding(vec![0.5; 1024]);
        let embedder = ProviderEmbedder::new(Arc::new(provider), 1536);

        let err = embedder.embed("list files").await.unwrap_err();
        assert!(matches!(
            err,
            EmbeddingError::DimensionMismatch {
                expected: 1536,
                actual: 1024
            }
        ));
    }

    #[tokio::test]
    async fn test_embedder_passes_matching_length() {
        let provider = MockProvider::new(Vec::<String>::new()).with_embedding(vec![0.5; 8]);
        let embedder = ProviderEmbedder::new(Arc::new(provider), 8);
        assert_eq!(embedder.embed("list files").await.unwrap().dimension(), 8);
    }
}
