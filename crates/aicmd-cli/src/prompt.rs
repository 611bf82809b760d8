//! System prompt and reply parsing.

use std::path::Path;

/// Longest error text sent back to the model, in characters.
pub const MAX_ERROR_CHARS: usize = 500;

const COMMAND_OPEN: &str = "<command>";
const COMMAND_CLOSE: &str = "</command>";
const FINAL_OPEN: &str = "<final_command>";
const FINAL_CLOSE: &str = "</final_command>";

/// Prompt asking the model for a single command for `os`, run from `cwd`.
pub fn system_prompt(os: &str, cwd: &Path) -> String {
    format!(
        "Translate the following text command to a CLI command for {}. \
         The current working directory is {}. \
         Output the command within XML tags like this: <command>CLI command</command>",
        os,
        cwd.display()
    )
}

/// [`system_prompt`] for the running platform and working directory.
pub fn current_system_prompt() -> String {
    let cwd = std::env::current_dir().unwrap_or_default();
    system_prompt(std::env::consts::OS, &cwd)
}

/// Pull the command out of a reply. `<command>` wins over
/// `<final_command>`; empty tags count as no command.
pub fn extract_command(reply: &str) -> Option<String> {
    tagged(reply, COMMAND_OPEN, COMMAND_CLOSE).or_else(|| tagged(reply, FINAL_OPEN, FINAL_CLOSE))
}

fn tagged(text: &str, open: &str, close: &str) -> Option<String> {
    let start = text.find(open)? + open.len();
    let end = text[start..].find(close)? + start;
    let content = text[start..end].trim();
    (!content.is_empty()).then(|| content.to_string())
}

/// First `max_chars` characters of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
