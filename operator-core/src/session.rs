//! Session token resolution.

use std::fmt;

use sha2::{Digest, Sha256};

/// Cookie carrying the upstream session, shared by the public and internal
/// build-service instances.
pub const SESSION_COOKIE_NAME: &str = "openSUSE_session";

/// Opaque value identifying the caller's session with the upstream service.
///
/// Never parsed or validated beyond being non-empty. `Debug` and `Display`
/// print a fingerprint instead of the value.
#[derive(Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct SessionToken(String);

impl SessionToken {
    /// Wraps a token, returning `None` for an empty value.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        if value.is_empty() {
            None
        } else {
            Some(Self(value))
        }
    }

    /// Extracts the token from a raw `Cookie` request header.
    ///
    /// Pairs are separated by `;`. Values wrapped in double quotes are
    /// unquoted. Pairs that do not parse are skipped rather than failing the
    /// whole header.
    #[must_use]
    pub fn from_cookie_header(header: &str, cookie_name: &str) -> Option<Self> {
        header
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| name.trim() == cookie_name)
            .and_then(|(_, value)| Self::new(unquote(value.trim())))
    }

    /// Picks the configured override if present, else the named cookie.
    #[must_use]
    pub fn resolve(override_token: Option<&SessionToken>, cookie_header: Option<&str>) -> Option<Self> {
        override_token.cloned().or_else(|| {
            cookie_header.and_then(|h| Self::from_cookie_header(h, SESSION_COOKIE_NAME))
        })
    }

    /// Returns the raw token value.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// First 12 hex digits of the SHA-256 of the token, for log correlation.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.0.as_bytes());
        digest.iter().take(6).map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SessionToken").field(&self.fingerprint()).finish()
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.fingerprint())
    }
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}
