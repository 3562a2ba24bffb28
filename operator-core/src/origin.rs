//! Endpoint derivation and cross-origin trust checks.
//!
//! A request targets the API of the tenant whose domain served the dashboard:
//! `build.example.com` talks to `https://api.example.com`. Browsers declare the
//! calling page in `Origin`; a page may only drive the API of its own parent
//! domain unless the operator pinned a fixed endpoint at startup.

use std::fmt;

use crate::error::CoreError;

/// Scheme and subdomain placed in front of the parent domain of `Host`.
pub const API_PREFIX: &str = "https://api.";

/// Base URL of the build-service API a request's commands will target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub struct Endpoint(String);

impl Endpoint {
    /// Wraps an already-formed API URL, e.g. one given on the command line.
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    /// Derives the endpoint from a `Host` header value.
    ///
    /// The port is stripped and the last two labels are prefixed with
    /// [`API_PREFIX`].
    ///
    /// # Errors
    /// Returns [`CoreError::EndpointUndetermined`] if `host` is absent or its
    /// domain has no dot.
    pub fn from_host(host: Option<&str>) -> Result<Self, CoreError> {
        let host = host.ok_or(CoreError::EndpointUndetermined)?;
        let domain = strip_port(host);
        let parent = parent_domain(domain).ok_or(CoreError::EndpointUndetermined)?;
        Ok(Self(format!("{API_PREFIX}{parent}")))
    }

    /// Returns the URL as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Last two labels of the domain named by an `Origin` header.
///
/// Only used for the trust comparison; never used to build URLs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub struct OriginDomain(String);

impl OriginDomain {
    /// Parses an `Origin` header value such as `https://build.example.com:443`.
    ///
    /// Returns `None` when the value has no authority part or its host has
    /// no dot (`null`, `http://localhost`).
    #[must_use]
    pub fn from_origin(origin: &str) -> Option<Self> {
        let authority = authority(origin)?;
        let host = authority.rsplit('@').next().unwrap_or(authority);
        parent_domain(strip_port(host)).map(Self)
    }

    /// Returns the domain as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OriginDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of a successful origin gate.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct OriginCheck {
    /// Endpoint used for both the config artifact and the trust comparison.
    pub endpoint: Endpoint,
    /// Present when the caller sent a parseable `Origin`; CORS headers are
    /// echoed exactly when this is `Some`.
    pub origin_domain: Option<OriginDomain>,
}

/// Derives the endpoint for a request and checks the caller's origin against it.
#[derive(Debug, Clone, Default)]
pub struct OriginValidator {
    fixed_endpoint: Option<Endpoint>,
}

impl OriginValidator {
    /// Creates a validator. With a fixed endpoint, `Host` is ignored and the
    /// origin suffix rule is not applied.
    #[must_use]
    pub fn new(fixed_endpoint: Option<Endpoint>) -> Self {
        Self { fixed_endpoint }
    }

    /// Returns the configured fixed endpoint, if any.
    #[must_use]
    pub fn fixed_endpoint(&self) -> Option<&Endpoint> {
        self.fixed_endpoint.as_ref()
    }

    /// Produces the endpoint for a request.
    ///
    /// # Errors
    /// Returns [`CoreError::EndpointUndetermined`] when no fixed endpoint is
    /// configured and `host` cannot be turned into one.
    pub fn endpoint(&self, host: Option<&str>) -> Result<Endpoint, CoreError> {
        match &self.fixed_endpoint {
            Some(fixed) => Ok(fixed.clone()),
            None => Endpoint::from_host(host),
        }
    }

    /// Runs the origin gate for one request.
    ///
    /// # Errors
    /// Returns [`CoreError::EndpointUndetermined`] as for [`Self::endpoint`], or
    /// [`CoreError::OriginMismatch`] when an origin domain is present, no fixed
    /// endpoint is configured and the endpoint does not end with that domain.
    pub fn validate(
        &self,
        host: Option<&str>,
        origin: Option<&str>,
    ) -> Result<OriginCheck, CoreError> {
        let endpoint = self.endpoint(host)?;
        let origin_domain = origin.and_then(OriginDomain::from_origin);

        if let Some(domain) = &origin_domain {
            // Suffix match on the whole URL string, so any subdomain of the
            // tenant passes.
            if self.fixed_endpoint.is_none() && !endpoint.as_str().ends_with(domain.as_str()) {
                return Err(CoreError::OriginMismatch {
                    endpoint: endpoint.0,
                    origin_domain: domain.0.clone(),
                });
            }
        }

        Ok(OriginCheck { endpoint, origin_domain })
    }
}

fn strip_port(host: &str) -> &str {
    host.split(':').next().unwrap_or(host)
}

fn parent_domain(domain: &str) -> Option<String> {
    if !domain.contains('.') {
        return None;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    Some(labels[labels.len() - 2..].join("."))
}

/// Authority component of a URL, or `None` if the value has none.
fn authority(url: &str) -> Option<&str> {
    let rest = match url.split_once("://") {
        Some((scheme, rest)) if is_scheme(scheme) => rest,
        _ => url.strip_prefix("//")?,
    };
    let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    Some(&rest[..end])
}

fn is_scheme(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}
