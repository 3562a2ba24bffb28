//! Command execution abstraction.
//!
//! The gateway only needs "run this argv against this sandbox and give me
//! the combined output and whether it succeeded". Keeping that behind a
//! trait lets tests script outcomes without spawning `osc`.

use async_trait::async_trait;

use operator_core::Command;

use crate::{CredentialSandbox, ExecutorError};

/// Captured result of one finished command.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct ExecutionOutput {
    /// Interleaved stdout and stderr in write order.
    pub output: Vec<u8>,

    /// Exit code, `None` if the process was killed by a signal.
    pub exit_code: Option<i32>,

    /// `true` if the process was killed for exceeding its time limit.
    pub timed_out: bool,
}

impl ExecutionOutput {
    #[must_use]
    pub fn new(output: Vec<u8>, exit_code: Option<i32>) -> Self {
        Self { output, exit_code, timed_out: false }
    }

    #[must_use]
    pub fn timed_out(output: Vec<u8>) -> Self {
        Self { output, exit_code: None, timed_out: true }
    }

    /// Exit status zero and not timed out.
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == Some(0) && !self.timed_out
    }
}

/// Runs commands with the credentials of a sandbox.
///
/// Implementations must be `Send + Sync` to be shared across requests.
///
/// # Cancel Safety
/// Implementations must not leave a process running when the returned
/// future is dropped.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs `command` to completion with `sandbox` as its credential source.
    ///
    /// # Errors
    /// Returns [`ExecutorError::EmptyCommand`] for an empty argv,
    /// [`ExecutorError::SpawnFailed`] if the process cannot be started, or
    /// [`ExecutorError::Io`] if its output cannot be collected.
    async fn run(
        &self,
        command: &Command,
        sandbox: &CredentialSandbox,
    ) -> Result<ExecutionOutput, ExecutorError>;
}
