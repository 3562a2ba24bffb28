//! Credential sandboxes and command execution for the OBS operator gateway.
//!
//! Materialises the per-request `osc` config and cookie jar, and runs `osc`
//! against them as a child process with an explicit environment.

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

pub mod artifact;
pub mod backend;
pub mod error;
pub mod runner;
pub mod sandbox;

pub use artifact::{ANONYMOUS_USER, PASSWORD_PLACEHOLDER};
pub use backend::{CommandRunner, ExecutionOutput};
pub use error::ExecutorError;
pub use runner::{ProcessRunner, CONFIG_ENV_VAR};
pub use sandbox::{CredentialSandbox, CONFIG_BACKDATE};
