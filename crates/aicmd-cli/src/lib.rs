//! `ai`: natural-language shell commands with a semantic command cache.
//!
//! # Modules
//!
//! - `cli`: Command-line argument parsing with clap
//! - `commands`: Command implementations (instruction, config, cache)
//! - `executor`: Running commands through `sh -c`
//! - `flow`: Cache lookup, generation and retry loop
//! - `prompt`: System prompt and reply parsing

pub mod cli;
pub mod commands;
pub mod executor;
pub mod flow;
pub mod prompt;

pub use cli::{CacheCommands, Cli, Commands, ConfigCommands};
pub use commands::{handle_cache, handle_instruction, init_logging, load_settings, run};
pub use executor::{CommandRunner, ExecutionError, ExecutionOutcome, ShellRunner};
pub use flow::{run_instruction, FlowError, FlowOptions, FlowOutcome};
