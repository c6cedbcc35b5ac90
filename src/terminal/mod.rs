//! Terminal sessions for configured commands

mod pty;
mod runner;

pub use pty::TerminalSession;
pub use runner::{CommandEvent, CommandRunner};

use crate::commands::Launch;
use anyhow::{Context, Result};
use regex::Regex;
use std::borrow::Cow;
use std::sync::OnceLock;

/// Shell used to interpret command strings
pub fn shell() -> String {
    std::env::var("SHELL")
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "/bin/sh".to_string())
}

/// Remove terminal escape sequences from a line of PTY output
pub fn strip_ansi(line: &str) -> Cow<'_, str> {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\x1b\[[0-9;?]*[ -/]*[@-~]|\x1b\][^\x07]*\x07|\r").expect("ansi pattern")
    })
    .replace_all(line, "")
}

/// Run a command attached to the current terminal and return its exit code
pub async fn run_inherited(launch: &Launch) -> Result<i32> {
    log::info!("Running {:?} in {}", launch.label, launch.cwd.display());

    let status = tokio::process::Command::new(shell())
        .arg("-c")
        .arg(&launch.command)
        .current_dir(&launch.cwd)
        .status()
        .await
        .with_context(|| format!("Failed to start {:?}", launch.label))?;

    Ok(status.code().unwrap_or(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_ansi() {
        assert_eq!(strip_ansi("\x1b[32mok\x1b[0m\r"), "ok");
        assert_eq!(strip_ansi("\x1b]0;title\x07plain"), "plain");
        assert_eq!(strip_ansi("untouched"), "untouched");
    }

    #[tokio::test]
    async fn test_run_inherited_exit_code() {
        let launch = Launch {
            label: "fail".to_string(),
            command: "exit 3".to_string(),
            cwd: std::env::temp_dir(),
        };
        assert_eq!(run_inherited(&launch).await.unwrap(), 3);
    }
}
