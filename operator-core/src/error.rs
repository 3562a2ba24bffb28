/// Errors produced by the `operator-core` crate.
///
/// The `Display` text of the origin variants is sent verbatim to callers as
/// the body of a `400` response, so it must stay stable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum CoreError {
    /// No fixed endpoint is configured and the `Host` header is absent or
    /// has no dot-separated domain.
    #[error("unable to determine apiurl")]
    EndpointUndetermined,

    /// The request's `Origin` domain is not a suffix of the derived endpoint.
    #[error("origin does not match host domain")]
    OriginMismatch {
        endpoint: String,
        origin_domain: String,
    },

    /// The route key is not in the allow-list, or the path does not carry
    /// the positional arguments its handler requires.
    #[error("no handler for route '{route}'")]
    RouteNotFound { route: String },

    /// A POST body could not be parsed or lacks a required field.
    #[error("malformed request body: {reason}")]
    MalformedBody { reason: String },
}

impl CoreError {
    pub(crate) fn route_not_found(route: impl Into<String>) -> Self {
        Self::RouteNotFound { route: route.into() }
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedBody { reason: reason.into() }
    }
}
