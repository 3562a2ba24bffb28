//! Error types for the executor crate.

/// Errors raised while preparing credentials or launching a command.
///
/// A command that runs and exits non-zero is not an error; see
/// [`crate::ExecutionOutput::success`].
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ExecutorError {
    /// The command had no program token.
    #[error("command is empty")]
    EmptyCommand,

    /// The program could not be started at all.
    #[error("failed to spawn {program}: {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Underlying I/O error while writing or removing sandbox files or
    /// collecting output.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A blocking filesystem task panicked or was cancelled.
    #[error("blocking task failed: {0}")]
    Blocking(#[from] tokio::task::JoinError),
}
