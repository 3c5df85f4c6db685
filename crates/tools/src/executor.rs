//! Process executor: run one external command under a hard timeout.
//!
//! The executor never returns an error to its caller. Spawn failures, I/O
//! errors and timeouts become an `Error executing tool: ...` line in the
//! returned text; a non-zero exit status is just more output.

use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::Command;
use tracing::{debug, info, warn};
use watchtower_core::error::ToolError;
use watchtower_core::state::AuthMetadata;
use watchtower_security::redact_command;

use crate::truncate::truncate_output;

/// Label placed in front of standard error in combined output.
pub const STDERR_LABEL: &str = "\nStderr: ";

/// Prefix of every execution failure message.
pub const ERROR_PREFIX: &str = "Error executing tool: ";

/// Runs external commands with a per-call timeout.
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    timeout: Duration,
}

impl ProcessExecutor {
    pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

    pub fn new(timeout_secs: u64) -> Self {
        Self {
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// Use a sub-second timeout (tests).
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run `command` (program first) and return truncated combined output.
    ///
    /// `auth` is only used to redact secrets from the log line.
    pub async fn execute(&self, command: &[String], auth: &AuthMetadata) -> String {
        info!("Running command: {}", redact_command(command, auth));
        let started = Instant::now();

        let output = match self.try_execute(command).await {
            Ok(output) => output,
            Err(e) => {
                warn!(error = %e, "Tool execution failed");
                format!("{ERROR_PREFIX}{e}")
            }
        };

        debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            chars = output.chars().count(),
            "Command finished"
        );
        truncate_output(&output)
    }

    async fn try_execute(&self, command: &[String]) -> Result<String, ToolError> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| ToolError::ExecutionFailed {
                tool_name: String::new(),
                reason: "empty command".into(),
            })?;

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: program.clone(),
                reason: e.to_string(),
            })?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| ToolError::Timeout {
                tool_name: program.clone(),
                timeout_secs: self.timeout.as_secs(),
            })?
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: program.clone(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            debug!(program = %program, status = ?output.status.code(), "Non-zero exit");
        }

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.is_empty() {
            text.push_str(STDERR_LABEL);
            text.push_str(&stderr);
        }
        Ok(text)
    }
}

impl Default for ProcessExecutor {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TIMEOUT_SECS)
    }
}
