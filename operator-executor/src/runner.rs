//! Process-backed [`CommandRunner`].
//!
//! Spawns the command directly (no shell), points it at the sandbox through
//! its own environment, and captures stdout and stderr through one shared
//! file descriptor so the output keeps its write order.

use std::io::SeekFrom;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use operator_core::Command;

use crate::{CommandRunner, CredentialSandbox, ExecutionOutput, ExecutorError};

/// Environment variable `osc` reads its config path from.
pub const CONFIG_ENV_VAR: &str = "OSC_CONFIG";

/// Runs commands as child processes.
///
/// # Cancel Safety
/// Cancel safe. Dropping the future kills the child via `kill_on_drop`,
/// so a disconnecting client does not leave `osc` running.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    program: Option<String>,
    timeout: Option<Duration>,
}

impl ProcessRunner {
    /// Runner with no time limit that executes argv as given.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the first argv token at spawn time, e.g. with an absolute
    /// path to `osc`.
    #[must_use]
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = Some(program.into());
        self
    }

    /// Kills commands that run longer than `timeout`.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(
        &self,
        command: &Command,
        sandbox: &CredentialSandbox,
    ) -> Result<ExecutionOutput, ExecutorError> {
        let program = command.program().ok_or(ExecutorError::EmptyCommand)?;
        let program = self.program.as_deref().unwrap_or(program);

        // Unlinked file; the child writes both streams through dups of it.
        let capture = tokio::task::spawn_blocking(tempfile::tempfile).await??;
        let stdout = capture.try_clone()?;
        let stderr = capture.try_clone()?;

        let wall_start = Instant::now();
        let mut child = tokio::process::Command::new(program)
            .args(command.arguments())
            .env(CONFIG_ENV_VAR, sandbox.config_path())
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ExecutorError::SpawnFailed { program: program.to_owned(), source })?;

        let status = match self.timeout {
            None => Some(child.wait().await?),
            Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
                Ok(status) => Some(status?),
                Err(_) => {
                    if let Err(e) = child.kill().await {
                        tracing::warn!(%command, error = %e, "failed to kill timed out command");
                    }
                    None
                }
            },
        };

        let mut capture = tokio::fs::File::from_std(capture);
        capture.seek(SeekFrom::Start(0)).await?;
        let mut output = Vec::new();
        capture.read_to_end(&mut output).await?;

        let elapsed_ms = wall_start.elapsed().as_millis();
        let result = match status {
            Some(status) => ExecutionOutput::new(output, status.code()),
            None => {
                tracing::warn!(%command, elapsed_ms, "command timed out");
                ExecutionOutput::timed_out(output)
            }
        };

        tracing::info!(
            %command,
            exit_code = ?result.exit_code,
            elapsed_ms,
            "command finished"
        );
        Ok(result)
    }
}
