//! Running generated commands in the user's shell.

use std::io::Write;
use std::process::Stdio;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::debug;

/// Why a command did not complete.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// Non-zero exit; carries stderr, or the exit status when stderr is empty
    #[error("{0}")]
    Failed(String),

    /// The user declined to run it
    #[error("Command execution cancelled")]
    Cancelled,

    /// Shell could not be started, or the terminal could not be used
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// What happened when a command was run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// The shell exited successfully
    Completed,
    /// A `cd` the parent shell has to perform itself
    DirectoryChange(String),
}

/// Runs a shell command on the user's behalf.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &str) -> Result<ExecutionOutcome, ExecutionError>;
}

/// `sh -c` runner with optional y/n confirmation on stdin.
pub struct ShellRunner {
    require_confirmation: bool,
}

impl ShellRunner {
    pub fn new(require_confirmation: bool) -> Self {
        Self {
            require_confirmation,
        }
    }
}

/// Print `question` and read a y/n answer from stdin.
pub async fn ask(question: &str) -> std::io::Result<bool> {
    print!("{} (y/n): ", question);
    std::io::stdout().flush()?;

    let mut answer = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut answer)
        .await?;
    Ok(parse_confirmation(&answer))
}

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, command: &str) -> Result<ExecutionOutcome, ExecutionError> {
        if self.require_confirmation && !ask("Do you want to execute this command?").await? {
            return Err(ExecutionError::Cancelled);
        }

        if let Some(dir) = directory_change(command) {
            println!("Your directory cannot be changed. Run: \ncd {}", dir);
            return Ok(ExecutionOutcome::DirectoryChange(dir));
        }

        println!("Executing command...");
        debug!(command, "Spawning shell");
        let output = Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if output.status.success() {
            return Ok(ExecutionOutcome::Completed);
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        debug!(status = %output.status, "Command failed");
        if stderr.is_empty() {
            Err(ExecutionError::Failed(output.status.to_string()))
        } else {
            Err(ExecutionError::Failed(stderr))
        }
    }
}

/// `y` or `yes`, any case.
pub fn parse_confirmation(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Target of a `cd` command, if `command` is one.
pub fn directory_change(command: &str) -> Option<String> {
    let rest = command.trim().strip_prefix("cd ")?;
    Some(rest.trim().to_string())
}
