//! Command execution utilities for scheduler queries.

use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

/// Error type for command execution.
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Failed to execute {command}: {error}")]
    Execution { command: String, error: String },
    #[error("Command {command} failed (exit code {code:?}): {stderr}")]
    Failed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
    #[error("Command {command} did not finish within {}s", timeout.as_secs())]
    TimedOut { command: String, timeout: Duration },
}

impl CommandError {
    /// Stderr of a command that ran but exited non-zero.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            Self::Failed { stderr, .. } => Some(stderr),
            _ => None,
        }
    }
}

/// Execute a command and return stdout as a string.
pub async fn run_command(cmd: &mut Command, name: &str) -> Result<String, CommandError> {
    let output = cmd.output().await.map_err(|e| CommandError::Execution {
        command: name.to_string(),
        error: e.to_string(),
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(CommandError::Failed {
            command: name.to_string(),
            code: output.status.code(),
            stderr: stderr.trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Execute a command, killing it if it runs longer than `timeout`.
pub async fn run_command_with_timeout(
    cmd: &mut Command,
    name: &str,
    timeout: Duration,
) -> Result<String, CommandError> {
    cmd.kill_on_drop(true);
    match tokio::time::timeout(timeout, run_command(cmd, name)).await {
        Ok(result) => result,
        Err(_) => Err(CommandError::TimedOut {
            command: name.to_string(),
            timeout,
        }),
    }
}

/// Check whether a tool can be found on `PATH`.
pub async fn tool_available(tool: &str) -> bool {
    let available = Command::new("which")
        .arg(tool)
        .output()
        .await
        .map(|o| o.status.success())
        .unwrap_or(false);
    tracing::debug!("tool {} available: {}", tool, available);
    available
}
