//! Command implementations: instruction flow, config, cache maintenance.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, warn};

use aicmd_cache::{CacheConfig, CacheError, SemanticCache};
use aicmd_embeddings::EmbeddingProvider;
use aicmd_llm::{create_embedder, create_provider, ProviderEmbedder, ProviderRole};
use aicmd_types::Settings;

use crate::cli::{CacheCommands, Cli, Commands, ConfigCommands};
use crate::executor::{ask, ShellRunner};
use crate::flow::{run_instruction, FlowOptions};
use crate::prompt::current_system_prompt;

/// Initialize logging to stderr. `RUST_LOG` wins over `level`.
pub fn init_logging(level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

/// Config file `ai config` reads and writes.
pub fn config_path(cli: &Cli) -> PathBuf {
    cli.config
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(Settings::default_config_path)
}

/// Load settings and apply CLI flag overrides.
pub fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = Settings::load(cli.config.as_deref()).context("Failed to load configuration")?;
    apply_overrides(&mut settings, cli);
    Ok(settings)
}

fn apply_overrides(settings: &mut Settings, cli: &Cli) {
    if let Some(level) = &cli.log_level {
        settings.log_level = level.clone();
    }
    if cli.no_cache {
        settings.cache_enabled = false;
    }
    if cli.yes {
        settings.require_confirmation = false;
    }
}

/// Entry point behind `main`.
pub async fn run(cli: Cli) -> Result<()> {
    match &cli.command {
        Some(Commands::Config {
            command: ConfigCommands::Path,
        }) => {
            println!("{}", config_path(&cli).display());
            Ok(())
        }
        Some(Commands::Config {
            command: ConfigCommands::Set { key, value },
        }) => {
            let path = config_path(&cli);
            set_config_value(&path, key, value)?;
            println!("Set {} in {}", key, path.display());
            Ok(())
        }
        Some(Commands::Config {
            command: ConfigCommands::Show,
        }) => {
            let settings = load_settings(&cli)?;
            print!("{}", render_settings(&settings)?);
            Ok(())
        }
        Some(Commands::Cache { command }) => {
            let settings = load_settings(&cli)?;
            init_logging(&settings.log_level)?;
            handle_cache(command, &settings).await
        }
        None => {
            let settings = load_settings(&cli)?;
            init_logging(&settings.log_level)?;
            let instruction = match cli.instruction_text() {
                text if text.is_empty() => read_instruction().await?,
                text => text,
            };
            handle_instruction(&instruction, &settings).await
        }
    }
}

async fn read_instruction() -> Result<String> {
    print!("Enter your command: ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .context("Error reading input")?;
    Ok(line.trim().to_string())
}

/// Resolve one instruction end to end.
pub async fn handle_instruction(instruction: &str, settings: &Settings) -> Result<()> {
    let provider = create_provider(settings, ProviderRole::Completion)
        .context("Failed to set up completion provider")?;

    let mut cache = if settings.cache_enabled {
        match create_embedder(settings) {
            Ok(embedder) => open_cache_or_skip(CacheConfig::from_settings(settings), embedder)
                .await
                .context("Command cache is misconfigured")?,
            Err(e) => {
                warn!(error = %e, "Embedding provider unavailable, running without cache");
                None
            }
        }
    } else {
        None
    };

    let runner = ShellRunner::new(settings.require_confirmation);
    let options = FlowOptions {
        system_prompt: current_system_prompt(),
        max_attempts: settings.max_retries,
    };

    let outcome = run_instruction(instruction, provider.as_ref(), cache.as_mut(), &runner, &options).await;

    if let Some(cache) = cache {
        if let Err(e) = cache.close() {
            warn!(error = %e, "Failed to close cache");
        }
    }

    match outcome {
        Ok(outcome) => {
            debug!(?outcome, "Instruction resolved");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Instruction failed");
            Err(e.into())
        }
    }
}

/// Open the cache for an instruction run.
///
/// Configuration errors are returned. Any other failure (locked or
/// unreadable files) is logged and the instruction runs without the cache.
pub async fn open_cache_or_skip<E: EmbeddingProvider>(
    config: CacheConfig,
    embedder: E,
) -> Result<Option<SemanticCache<E>>, CacheError> {
    let dir = config.data_dir.clone();
    match SemanticCache::open(config, embedder).await {
        Ok(cache) => Ok(Some(cache)),
        Err(e) if e.is_configuration() => Err(e),
        Err(e) => {
            warn!(error = %e, dir = %dir.display(), "Command cache unavailable, running without cache");
            Ok(None)
        }
    }
}

async fn open_cache_with(
    settings: &Settings,
    embedder: ProviderEmbedder,
) -> Result<SemanticCache<ProviderEmbedder>> {
    let config = CacheConfig::from_settings(settings);
    let dir = config.data_dir.clone();
    SemanticCache::open(config, embedder)
        .await
        .with_context(|| format!("Failed to open command cache in {}", dir.display()))
}

/// `ai cache ...`
pub async fn handle_cache(command: &CacheCommands, settings: &Settings) -> Result<()> {
    let embedder = create_embedder(settings).context("Cache commands need a working embedding provider")?;
    let mut cache = open_cache_with(settings, embedder).await?;

    match command {
        CacheCommands::Stats => {
            let stats = cache.stats()?;
            println!("Data directory:  {}", cache.config().data_dir.display());
            println!("Entries:         {}", stats.entries);
            println!("Indexed vectors: {}", stats.indexed);
            println!("Dimension:       {}", stats.dimension);
            println!("Max distance:    {}", stats.max_distance);
            println!("Index size:      {} bytes", stats.index_bytes);
        }
        CacheCommands::List => {
            let entries = cache.entries()?;
            if entries.is_empty() {
                println!("Cache is empty.");
            }
            for entry in entries {
                println!(
                    "{}  {}\n    {}",
                    entry.created_at.format("%Y-%m-%d %H:%M"),
                    entry.instruction,
                    entry.command
                );
            }
        }
        CacheCommands::Forget { instruction } => {
            let instruction = instruction.join(" ");
            if cache.forget(&instruction) {
                println!("Forgot: {}", instruction);
            } else {
                println!("No cached command for: {}", instruction);
            }
        }
        CacheCommands::Clear => {
            if settings.require_confirmation && !ask("Remove every cached command?").await? {
                println!("Cancelled.");
            } else {
                let removed = cache.clear()?;
                println!("Removed {} cached commands.", removed);
            }
        }
        CacheCommands::Rebuild => {
            let stats = cache.rebuild_index().await?;
            println!(
                "Rebuilt index: {} records, {} reused, {} embedded, {} failed",
                stats.records, stats.reused, stats.embedded, stats.failed
            );
        }
    }

    cache.close()?;
    Ok(())
}

#[derive(Debug, Clone, Copy)]
enum ValueKind {
    Str,
    Int,
    Float,
    Bool,
}

/// Settable keys and their value types.
const SETTABLE_KEYS: &[(&str, ValueKind)] = &[
    ("provider", ValueKind::Str),
    ("model", ValueKind::Str),
    ("embedding_provider", ValueKind::Str),
    ("embedding_model", ValueKind::Str),
    ("api_keys.openai", ValueKind::Str),
    ("api_keys.anthropic", ValueKind::Str),
    ("api_keys.cloudflare", ValueKind::Str),
    ("cloudflare_account_id", ValueKind::Str),
    ("ollama_base_url", ValueKind::Str),
    ("max_tokens", ValueKind::Int),
    ("temperature", ValueKind::Float),
    ("require_confirmation", ValueKind::Bool),
    ("vector_size", ValueKind::Int),
    ("k", ValueKind::Int),
    ("max_distance", ValueKind::Float),
    ("max_retries", ValueKind::Int),
    ("data_dir", ValueKind::Str),
    ("log_level", ValueKind::Str),
    ("cache_enabled", ValueKind::Bool),
];

fn parse_value(key: &str, kind: ValueKind, raw: &str) -> Result<toml::Value> {
    let raw = raw.trim();
    Ok(match kind {
        ValueKind::Str => toml::Value::String(raw.to_string()),
        ValueKind::Int => toml::Value::Integer(
            raw.parse()
                .with_context(|| format!("{} expects an integer, got '{}'", key, raw))?,
        ),
        ValueKind::Float => toml::Value::Float(
            raw.parse()
                .with_context(|| format!("{} expects a number, got '{}'", key, raw))?,
        ),
        ValueKind::Bool => match raw.to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => toml::Value::Boolean(true),
            "false" | "no" | "off" | "0" => toml::Value::Boolean(false),
            _ => bail!("{} expects true or false, got '{}'", key, raw),
        },
    })
}

/// Write `key = value` into the TOML config file at `path`.
///
/// The file is only written when the result is a valid configuration.
pub fn set_config_value(path: &Path, key: &str, value: &str) -> Result<()> {
    let kind = SETTABLE_KEYS
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, kind)| *kind)
        .with_context(|| {
            let names: Vec<&str> = SETTABLE_KEYS.iter().map(|(name, _)| *name).collect();
            format!("Unknown setting '{}'. Known settings: {}", key, names.join(", "))
        })?;
    let value = parse_value(key, kind, value)?;

    let mut table: toml::Table = if path.exists() {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))?
    } else {
        toml::Table::new()
    };

    let mut parts: Vec<&str> = key.split('.').collect();
    let leaf = parts.pop().context("Empty setting name")?;
    let mut current = &mut table;
    for part in parts {
        current = current
            .entry(part)
            .or_insert(toml::Value::Table(toml::Table::new()))
            .as_table_mut()
            .with_context(|| format!("'{}' in {} is not a table", part, path.display()))?;
    }
    current.insert(leaf.to_string(), value);

    let rendered = toml::to_string_pretty(&table).context("Failed to render config")?;
    let settings: Settings = toml::from_str(&rendered).context("Resulting configuration is invalid")?;
    settings.validate().context("Resulting configuration is invalid")?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(path, rendered).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

fn mask(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let head: String = chars[..3].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Settings as TOML with API keys masked.
pub fn render_settings(settings: &Settings) -> Result<String> {
    let mut shown = settings.clone();
    for key in [
        &mut shown.api_keys.openai,
        &mut shown.api_keys.anthropic,
        &mut shown.api_keys.cloudflare,
    ] {
        if let Some(value) = key.as_mut() {
            *value = mask(value);
        }
    }
    toml::to_string_pretty(&shown).context("Failed to render settings")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;
    use aicmd_embeddings::MockEmbedder;

    #[tokio::test]
    async fn test_locked_cache_is_skipped() {
        let dir = TempDir::new().unwrap();
        let config = CacheConfig::new(dir.path(), 16);
        let _holder = SemanticCache::open(config.clone(), MockEmbedder::new(16))
            .await
            .unwrap();

        let second = open_cache_or_skip(config, MockEmbedder::new(16)).await.unwrap();
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn test_dimension_change_still_fatal() {
        let dir = TempDir::new().unwrap();
        SemanticCache::open(CacheConfig::new(dir.path(), 16), MockEmbedder::new(16))
            .await
            .unwrap()
            .close()
            .unwrap();

        let err = open_cache_or_skip(CacheConfig::new(dir.path(), 32), MockEmbedder::new(32))
            .await
            .err()
            .unwrap();
        assert!(err.is_configuration());
    }

    #[tokio::test]
    async fn test_open_cache_or_skip_opens_fresh_dir() {
        let dir = TempDir::new().unwrap();
        let cache = open_cache_or_skip(CacheConfig::new(dir.path().join("cache"), 16), MockEmbedder::new(16))
            .await
            .unwrap();
        assert!(cache.is_some());
    }

    #[test]
    fn test_set_config_value_creates_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        set_config_value(&path, "provider", "openai").unwrap();
        set_config_value(&path, "max_distance", "0.3").unwrap();
        set_config_value(&path, "api_keys.openai", "sk-test").unwrap();
        set_config_value(&path, "require_confirmation", "no").unwrap();

        let settings: Settings = toml::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(settings.provider, "openai");
        assert!((settings.max_distance - 0.3).abs() < 1e-6);
        assert_eq!(settings.api_keys.openai.as_deref(), Some("sk-test"));
        assert!(!settings.require_confirmation);
    }

    #[test]
    fn test_set_config_value_preserves_other_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "model = \"gpt-4o\"\n").unwrap();

        set_config_value(&path, "k", "3").unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("model = \"gpt-4o\""));
        assert!(text.contains("k = 3"));
    }

    #[test]
    fn test_set_config_value_rejects_bad_input() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        assert!(set_config_value(&path, "colour", "blue").is_err());
        assert!(set_config_value(&path, "k", "many").is_err());
        assert!(set_config_value(&path, "provider", "gemini").is_err());
        assert!(set_config_value(&path, "k", "0").is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_render_settings_masks_keys() {
        let mut settings = Settings::default();
        settings.api_keys.openai = Some("sk-proj-abcdefghijkl".to_string());
        settings.api_keys.anthropic = Some("short".to_string());

        let rendered = render_settings(&settings).unwrap();
        assert!(rendered.contains("sk-...ijkl"));
        assert!(!rendered.contains("abcdefgh"));
        assert!(rendered.contains("\"****\""));
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from(["ai", "--yes", "--no-cache", "--log-level", "debug", "x"]);
        let mut settings = Settings::default();
        apply_overrides(&mut settings, &cli);
        assert!(!settings.require_confirmation);
        assert!(!settings.cache_enabled);
        assert_eq!(settings.log_level, "debug");
    }

    #[test]
    fn test_config_path_from_flag() {
        let cli = Cli::parse_from(["ai", "--config", "/tmp/custom.toml", "config", "path"]);
        assert_eq!(config_path(&cli), PathBuf::from("/tmp/custom.toml"));
    }
}
