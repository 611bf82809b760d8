//! CLI argument parsing for `ai`.
//!
//! CLI flags override config file and environment values.

use clap::{Parser, Subcommand};

/// Turn a natural-language instruction into a shell command and run it.
///
/// Commands that worked are remembered; similar instructions reuse them
/// without asking the model again.
#[derive(Parser, Debug)]
#[command(name = "ai")]
#[command(author, version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// Path to config file (overrides the default config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Neither consult nor update the command cache
    #[arg(long, global = true)]
    pub no_cache: bool,

    /// Run commands without asking for confirmation
    #[arg(short, long, global = true)]
    pub yes: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Instruction, e.g. `ai list the five largest files here`.
    /// Read from stdin when empty.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub instruction: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Inspect or change configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Inspect or maintain the command cache
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the effective settings (API keys masked)
    Show,

    /// Print the config file path
    Path,

    /// Write one setting to the config file
    Set {
        /// Setting name, e.g. `provider` or `api_keys.openai`
        key: String,

        /// New value
        value: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// Show entry counts and index size
    Stats,

    /// List cached instructions and commands
    List,

    /// Remove the entry cached for an exact instruction
    Forget {
        #[arg(required = true, trailing_var_arg = true)]
        instruction: Vec<String>,
    },

    /// Remove every cached entry
    Clear,

    /// Rebuild the vector index from stored entries
    Rebuild,
}

impl Cli {
    /// Instruction words joined with single spaces.
    pub fn instruction_text(&self) -> String {
        self.instruction.join(" ").trim().to_string()
    }
}
