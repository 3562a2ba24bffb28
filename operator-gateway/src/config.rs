//! Startup flags and the runtime configuration derived from them.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use operator_core::{Endpoint, OriginValidator, SessionToken, OSC_PROGRAM};
use operator_executor::ProcessRunner;

/// Name reported by the root introspection route.
pub const SERVICE_NAME: &str = "OBS Operator";

/// Namespace reported by the root introspection route.
pub const SERVICE_NAMESPACE: &str = "openSUSE-release-tools";

/// Command-line flags.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "obs-operator",
    version,
    about = "OBS Operator server used to perform staging operations."
)]
pub struct Args {
    /// Host name to which to bind (empty binds all interfaces)
    #[arg(long, default_value = "")]
    pub host: String,

    /// Port number to which to bind
    #[arg(long, default_value_t = 8080)]
    pub port: u16,

    /// OBS instance API URL to use instead of basing from request origin
    #[arg(short = 'A', long, value_name = "URL")]
    pub apiurl: Option<String>,

    /// Session cookie value to use instead of any passed cookie
    #[arg(long)]
    pub session: Option<String>,

    /// Log debugging information (overridden by `RUST_LOG`)
    #[arg(short, long)]
    pub debug: bool,

    /// Directory for per-request credential files
    #[arg(long, value_name = "DIR")]
    pub sandbox_dir: Option<PathBuf>,

    /// Build-service client to execute
    #[arg(long, value_name = "PROGRAM", default_value = OSC_PROGRAM)]
    pub osc: String,

    /// Kill commands running longer than this many seconds
    #[arg(long, value_name = "SECONDS")]
    pub command_timeout: Option<u64>,
}

impl Args {
    /// `host:port` to listen on.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        let host = if self.host.is_empty() { "0.0.0.0" } else { self.host.as_str() };
        format!("{host}:{}", self.port)
    }

    #[must_use]
    pub fn gateway_config(&self) -> GatewayConfig {
        let mut config = GatewayConfig::new(
            self.sandbox_dir.clone().unwrap_or_else(std::env::temp_dir),
        );
        config.origin = OriginValidator::new(self.apiurl.clone().map(Endpoint::new));
        config.session_override = self.session.clone().and_then(SessionToken::new);
        config
    }

    #[must_use]
    pub fn runner(&self) -> ProcessRunner {
        let runner = ProcessRunner::new().with_program(self.osc.clone());
        match self.command_timeout {
            Some(secs) => runner.with_timeout(Duration::from_secs(secs)),
            None => runner,
        }
    }
}

/// Per-process settings shared by all requests. Read-only after startup.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct GatewayConfig {
    /// Endpoint derivation and origin trust policy.
    pub origin: OriginValidator,

    /// Session used for every request instead of the caller's cookie.
    pub session_override: Option<SessionToken>,

    /// Where credential sandboxes are created.
    pub sandbox_dir: PathBuf,
}

impl GatewayConfig {
    /// Config deriving endpoints from `Host` and sessions from cookies.
    #[must_use]
    pub fn new(sandbox_dir: PathBuf) -> Self {
        Self {
            origin: OriginValidator::default(),
            session_override: None,
            sandbox_dir,
        }
    }

    /// Pins every request to `endpoint`.
    #[must_use]
    pub fn with_fixed_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.origin = OriginValidator::new(Some(endpoint));
        self
    }

    #[must_use]
    pub fn with_session_override(mut self, session: SessionToken) -> Self {
        self.session_override = Some(session);
        self
    }
}
