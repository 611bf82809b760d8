//! # aicmd-types
//!
//! Shared types for the `ai` command generator.
//!
//! - [`Settings`]: layered configuration (defaults, config file, `AI_*` env vars)
//! - [`ProviderKind`]: the LLM / embedding backends the CLI can talk to
//! - [`AicmdError`]: configuration and input errors

pub mod config;
pub mod error;

pub use config::{ApiKeys, ProviderKind, Settings, APP_NAME, CONFIG_FILE_NAME};
pub use error::AicmdError;
