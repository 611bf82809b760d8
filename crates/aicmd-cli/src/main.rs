//! `ai`: turn natural-language instructions into shell commands.
//!
//! # Usage
//!
//! ```bash
//! ai list the five largest files here
//! ai config set provider openai
//! ai cache stats
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (`<config dir>/ai/config.toml`, or `--config`)
//! 3. Environment variables (`AI_*`)
//! 4. CLI flags

use anyhow::Result;
use clap::Parser;

use aicmd_cli::{run, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    run(cli).await
}
