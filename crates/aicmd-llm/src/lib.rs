//! # aicmd-llm
//!
//! Chat completion and embedding providers.
//!
//! Every vendor implements [`LlmProvider`]. [`create_provider`] picks one
//! from [`Settings`](aicmd_types::Settings) and [`ProviderEmbedder`] exposes
//! a provider's `embed` to the semantic cache.
//!
//! ## Providers
//! - OpenAI: chat completions and embeddings
//! - Anthropic: messages API (no embeddings)
//! - Ollama: OpenAI-compatible local server, no API key
//! - Cloudflare Workers AI (no embeddings)

pub mod anthropic;
pub mod cloudflare;
pub mod error;
pub mod factory;
pub mod http;
pub mod mock;
pub mod ollama;
pub mod openai;
pub mod provider;

pub use anthropic::AnthropicProvider;
pub use cloudflare::CloudflareProvider;
pub use error::ProviderError;
pub use factory::{create_embedder, create_provider, default_embedding_model, ProviderEmbedder, ProviderRole};
pub use http::HttpConfig;
pub use mock::MockProvider;
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;
pub use provider::{LlmProvider, Message, ProviderConfig, Role};
