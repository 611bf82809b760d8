//! Configuration loading for the `ai` CLI.
//!
//! Layered config: defaults -> config file -> env vars -> CLI flags.
//! The default config file lives at `<config_dir>/ai/config.toml`.
//! Environment variables use the `AI_` prefix and `__` for nesting,
//! e.g. `AI_MAX_DISTANCE=0.3` or `AI_API_KEYS__OPENAI=sk-...`.

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::error::AicmdError;

/// Application name used for platform directories.
pub const APP_NAME: &str = "ai";

/// File name of the TOML config file inside the config directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Backends that can complete prompts and/or produce embeddings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
    Ollama,
    Cloudflare,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::OpenAi,
        ProviderKind::Anthropic,
        ProviderKind::Ollama,
        ProviderKind::Cloudflare,
    ];

    /// Parse a provider name. Matching is case-insensitive so that
    /// `OpenAI`, `openai` and `OPENAI` all resolve to the same backend.
    pub fn parse(name: &str) -> Result<Self, AicmdError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "anthropic" => Ok(ProviderKind::Anthropic),
            "ollama" => Ok(ProviderKind::Ollama),
            "cloudflare" => Ok(ProviderKind::Cloudflare),
            _ => Err(AicmdError::UnsupportedProvider(name.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Ollama => "ollama",
            ProviderKind::Cloudflare => "cloudflare",
        }
    }

    /// Environment variable consulted when no key is configured.
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            ProviderKind::OpenAi => Some("OPENAI_API_KEY"),
            ProviderKind::Anthropic => Some("ANTHROPIC_API_KEY"),
            ProviderKind::Cloudflare => Some("CLOUDFLARE_API_KEY"),
            ProviderKind::Ollama => None,
        }
    }

    /// Whether requests to this provider need an API key.
    pub fn requires_api_key(&self) -> bool {
        !matches!(self, ProviderKind::Ollama)
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// API keys per provider. Keys set here take precedence over env vars.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiKeys {
    #[serde(default)]
    pub openai: Option<String>,

    #[serde(default)]
    pub anthropic: Option<String>,

    #[serde(default)]
    pub cloudflare: Option<String>,
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Provider used to generate commands
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Completion model name
    #[serde(default = "default_model")]
    pub model: String,

    /// Provider used to embed instructions for the semantic cache
    #[serde(default = "default_embedding_provider")]
    pub embedding_provider: String,

    /// Embedding model name (empty = provider default)
    #[serde(default)]
    pub embedding_model: String,

    #[serde(default)]
    pub api_keys: ApiKeys,

    /// Cloudflare account id (falls back to CLOUDFLARE_ACCOUNT_ID)
    #[serde(default)]
    pub cloudflare_account_id: Option<String>,

    /// Base URL of the local Ollama server
    #[serde(default = "default_ollama_base_url")]
    pub ollama_base_url: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Ask before running a command
    #[serde(default = "default_true")]
    pub require_confirmation: bool,

    /// Embedding vector length, shared by the index and the embedding model
    #[serde(default = "default_vector_size")]
    pub vector_size: usize,

    /// Number of neighbours requested from the index
    #[serde(default = "default_k")]
    pub k: usize,

    /// Largest cosine distance still accepted as a cache hit
    #[serde(default = "default_max_distance")]
    pub max_distance: f32,

    /// Generation attempts before giving up on an instruction
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Directory holding the vector index and the value store
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Use the semantic command cache
    #[serde(default = "default_true")]
    pub cache_enabled: bool,
}

fn default_provider() -> String {
    "anthropic".to_string()
}

fn default_model() -> String {
    "claude-3-5-sonnet-20240620".to_string()
}

fn default_embedding_provider() -> String {
    "openai".to_string()
}

fn default_ollama_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_max_tokens() -> u32 {
    1000
}

fn default_temperature() -> f32 {
    0.1
}

fn default_true() -> bool {
    true
}

fn default_vector_size() -> usize {
    1536 // text-embedding-3-small
}

fn default_k() -> usize {
    1
}

fn default_max_distance() -> f32 {
    0.5
}

fn default_max_retries() -> u32 {
    3
}

fn default_data_dir() -> String {
    ProjectDirs::from("", "", APP_NAME)
        .map(|p| p.data_local_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("./ai-data"))
        .to_string_lossy()
        .to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            embedding_provider: default_embedding_provider(),
            embedding_model: String::new(),
            api_keys: ApiKeys::default(),
            cloudflare_account_id: None,
            ollama_base_url: default_ollama_base_url(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            require_confirmation: true,
            vector_size: default_vector_size(),
            k: default_k(),
            max_distance: default_max_distance(),
            max_retries: default_max_retries(),
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            cache_enabled: true,
        }
    }
}

impl Settings {
    /// Default location of the config file.
    pub fn default_config_path() -> PathBuf {
        ProjectDirs::from("", "", APP_NAME)
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
            .join(CONFIG_FILE_NAME)
    }

    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (`<config_dir>/ai/config.toml`)
    /// 3. CLI-specified config file (optional)
    /// 4. Environment variables (`AI_*`)
    ///
    /// CLI flags should be applied by the caller after this returns.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, AicmdError> {
        Self::load_from(&Self::default_config_path(), cli_config_path)
    }

    /// Same as [`Settings::load`] with an explicit default config file.
    pub fn load_from(
        default_config_path: &std::path::Path,
        cli_config_path: Option<&str>,
    ) -> Result<Self, AicmdError> {
        let mut builder = Config::builder()
            .set_default("provider", default_provider())
            .map_err(|e| AicmdError::Config(e.to_string()))?
            .set_default("model", default_model())
            .map_err(|e| AicmdError::Config(e.to_string()))?
            .set_default("embedding_provider", default_embedding_provider())
            .map_err(|e| AicmdError::Config(e.to_string()))?
            .set_default("vector_size", default_vector_size() as i64)
            .map_err(|e| AicmdError::Config(e.to_string()))?
            .set_default("k", default_k() as i64)
            .map_err(|e| AicmdError::Config(e.to_string()))?
            .set_default("max_distance", default_max_distance() as f64)
            .map_err(|e| AicmdError::Config(e.to_string()))?
            .set_default("data_dir", default_data_dir())
            .map_err(|e| AicmdError::Config(e.to_string()))?
            .set_default("log_level", default_log_level())
            .map_err(|e| AicmdError::Config(e.to_string()))?
            .add_source(File::from(default_config_path).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // AI_MAX_DISTANCE -> max_distance, AI_API_KEYS__OPENAI -> api_keys.openai
        builder = builder.add_source(
            Environment::with_prefix("AI")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| AicmdError::Config(e.to_string()))?;

        let settings: Settings = config
            .try_deserialize()
            .map_err(|e| AicmdError::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), AicmdError> {
        ProviderKind::parse(&self.provider)?;
        ProviderKind::parse(&self.embedding_provider)?;
        if self.vector_size == 0 {
            return Err(AicmdError::Config("vector_size must be > 0".to_string()));
        }
        if self.k == 0 {
            return Err(AicmdError::Config("k must be >= 1".to_string()));
        }
        if self.max_distance.is_nan() || self.max_distance < 0.0 {
            return Err(AicmdError::Config(format!(
                "max_distance must be >= 0, got {}",
                self.max_distance
            )));
        }
        if self.max_retries == 0 {
            return Err(AicmdError::Config("max_retries must be >= 1".to_string()));
        }
        Ok(())
    }

    pub fn provider_kind(&self) -> Result<ProviderKind, AicmdError> {
        ProviderKind::parse(&self.provider)
    }

    pub fn embedding_provider_kind(&self) -> Result<ProviderKind, AicmdError> {
        ProviderKind::parse(&self.embedding_provider)
    }

    /// Resolve the API key for a provider: config first, then env var.
    pub fn api_key(&self, provider: ProviderKind) -> Option<String> {
        let configured = match provider {
            ProviderKind::OpenAi => self.api_keys.openai.clone(),
            ProviderKind::Anthropic => self.api_keys.anthropic.clone(),
            ProviderKind::Cloudflare => self.api_keys.cloudflare.clone(),
            ProviderKind::Ollama => None,
        };
        configured
            .filter(|k| !k.is_empty())
            .or_else(|| {
                provider
                    .api_key_env()
                    .and_then(|var| std::env::var(var).ok())
                    .filter(|k| !k.is_empty())
            })
    }

    /// Cloudflare account id from config or CLOUDFLARE_ACCOUNT_ID.
    pub fn cloudflare_account_id(&self) -> Option<String> {
        self.cloudflare_account_id
            .clone()
            .filter(|id| !id.is_empty())
            .or_else(|| std::env::var("CLOUDFLARE_ACCOUNT_ID").ok())
            .filter(|id| !id.is_empty())
    }

    /// Expand ~ and env vars in data_dir
    pub fn expanded_data_dir(&self) -> PathBuf {
        PathBuf::from(shellexpand::full(&self.data_dir).map_or_else(
            |_| self.data_dir.clone(),
            |expanded| expanded.into_owned(),
        ))
    }
}
