//! Provider error types.

use thiserror::Error;

/// Errors returned by completion and embedding providers.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("API request failed: {0}")]
    Api(String),

    /// Non-success HTTP status
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to parse API response: {0}")]
    Parse(String),

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("The LLM returned an empty response")]
    EmptyResponse,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("{provider} API key not set. Use 'ai config set' or set the {env} environment variable")]
    MissingApiKey { provider: String, env: String },

    /// The provider does not offer this capability
    #[error("{0}")]
    Unsupported(String),
}

impl ProviderError {
    /// Whether the request is worth sending again.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Api(_) | ProviderError::RateLimited => true,
            ProviderError::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
