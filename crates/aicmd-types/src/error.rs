//! Error types shared across the workspace.

use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum AicmdError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unknown provider name
    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid input error
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
