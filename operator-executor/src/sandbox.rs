//! Per-request credential sandbox.
//!
//! `osc` reads its endpoint and credentials from a config file and keeps
//! its session in a cookie jar. For each request we write a throwaway pair
//! of both, seeded with the caller's session token, and delete them when the
//! request ends.

use std::fs::FileTimes;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use tempfile::NamedTempFile;

use operator_core::{Endpoint, RequestId, SessionToken, SESSION_COOKIE_NAME};

use crate::artifact::{render_config, render_cookie_jar};
use crate::ExecutorError;

/// How far the config's modification time is pushed into the past.
///
/// `osc` wipes the cookie jar when the config is newer than the jar, which a
/// freshly written config always would be.
pub const CONFIG_BACKDATE: Duration = Duration::from_secs(3600);

/// The two credential files for one request.
///
/// Owned by exactly one request. Both files are removed when the sandbox is
/// dropped, including during unwinding, or explicitly via [`Self::release`].
#[derive(Debug)]
#[non_exhaustive]
pub struct CredentialSandbox {
    config: NamedTempFile,
    cookie_jar: NamedTempFile,

    /// Timestamp when the files were written.
    pub created_at: DateTime<Utc>,
}

impl CredentialSandbox {
    /// Creates and fills both files inside `dir`.
    ///
    /// If anything fails part way, files created so far are removed before
    /// the error is returned.
    ///
    /// # Errors
    /// Returns [`ExecutorError::Io`] if a file cannot be created, written or
    /// have its timestamps changed.
    pub fn acquire(
        dir: &Path,
        request_id: RequestId,
        endpoint: &Endpoint,
        user: &str,
        session: &SessionToken,
    ) -> Result<Self, ExecutorError> {
        let tag = request_id.short();
        let mut cookie_jar = tempfile::Builder::new()
            .prefix(&format!("cookiejar-{tag}-"))
            .tempfile_in(dir)?;
        let mut config = tempfile::Builder::new()
            .prefix(&format!("oscrc-{tag}-"))
            .tempfile_in(dir)?;

        config.write_all(render_config(endpoint, cookie_jar.path(), user).as_bytes())?;
        config.flush()?;
        let recent_past = SystemTime::now()
            .checked_sub(CONFIG_BACKDATE)
            .unwrap_or(SystemTime::UNIX_EPOCH);
        config
            .as_file()
            .set_times(FileTimes::new().set_accessed(recent_past).set_modified(recent_past))?;

        cookie_jar.write_all(render_cookie_jar(SESSION_COOKIE_NAME, session.expose()).as_bytes())?;
        cookie_jar.flush()?;

        tracing::debug!(
            request_id = %request_id,
            config = %config.path().display(),
            cookie_jar = %cookie_jar.path().display(),
            "credential sandbox ready"
        );

        Ok(Self { config, cookie_jar, created_at: Utc::now() })
    }

    /// Runs [`Self::acquire`] on the blocking pool.
    ///
    /// # Errors
    /// As [`Self::acquire`], plus [`ExecutorError::Blocking`] if the task
    /// panics.
    pub async fn acquire_blocking(
        dir: PathBuf,
        request_id: RequestId,
        endpoint: Endpoint,
        user: String,
        session: SessionToken,
    ) -> Result<Self, ExecutorError> {
        tokio::task::spawn_blocking(move || Self::acquire(&dir, request_id, &endpoint, &user, &session))
            .await?
    }

    /// Path to pass to `osc` as its config file.
    #[must_use]
    pub fn config_path(&self) -> &Path {
        self.config.path()
    }

    #[must_use]
    pub fn cookie_jar_path(&self) -> &Path {
        self.cookie_jar.path()
    }

    /// Deletes both files, reporting the first failure.
    ///
    /// Both deletions are attempted even if the first fails.
    ///
    /// # Errors
    /// Returns [`ExecutorError::Io`] if a file could not be removed.
    pub fn release(self) -> Result<(), ExecutorError> {
        let lifetime_ms = (Utc::now() - self.created_at).num_milliseconds();
        let config = self.config.close();
        let cookie_jar = self.cookie_jar.close();
        tracing::debug!(lifetime_ms, "credential sandbox removed");
        config?;
        cookie_jar?;
        Ok(())
    }

    /// Runs [`Self::release`] on the blocking pool.
    ///
    /// # Errors
    /// As [`Self::release`], plus [`ExecutorError::Blocking`] if the task
    /// panics.
    pub async fn release_blocking(self) -> Result<(), ExecutorError> {
        tokio::task::spawn_blocking(move || self.release()).await?
    }
}
