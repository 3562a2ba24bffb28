//! Per-request gate: origin trust and session policy.
//!
//! Everything that can reject a request before credentials are written is
//! decided here, in one place, and returned as a typed error the handlers
//! turn into a status code.

use axum::http::{header, HeaderMap, HeaderValue};
use operator_core::{Endpoint, RequestId, SessionToken};

use crate::config::GatewayConfig;
use crate::error::GatewayError;

/// Outcome of the request gate.
#[derive(Debug)]
#[non_exhaustive]
pub struct RequestContext {
    pub request_id: RequestId,

    /// Target API for this request; also used in the config artifact.
    pub endpoint: Endpoint,

    /// Literal `Origin` header to echo, present iff it named a domain.
    pub allow_origin: Option<HeaderValue>,

    /// Resolved session. Always `Some` when the gate ran with
    /// `require_session`.
    pub session: Option<SessionToken>,
}

impl RequestContext {
    /// Runs the origin gate, then the session policy.
    ///
    /// # Errors
    /// Returns [`GatewayError::Core`] for an undeterminable endpoint or an
    /// origin mismatch, and [`GatewayError::SessionMissing`] when
    /// `require_session` is set and no session could be resolved.
    pub fn prepare(
        config: &GatewayConfig,
        headers: &HeaderMap,
        require_session: bool,
    ) -> Result<Self, GatewayError> {
        let check = config
            .origin
            .validate(header_str(headers, header::HOST), header_str(headers, header::ORIGIN))?;

        let session = SessionToken::resolve(
            config.session_override.as_ref(),
            header_str(headers, header::COOKIE),
        );
        if require_session && session.is_none() {
            return Err(GatewayError::SessionMissing);
        }

        let request_id = RequestId::new();
        tracing::Span::current().record("request_id", tracing::field::display(request_id));
        tracing::debug!(
            endpoint = %check.endpoint,
            session = ?session,
            "request context prepared"
        );

        let allow_origin = check
            .origin_domain
            .and_then(|_| headers.get(header::ORIGIN).cloned());

        Ok(Self { request_id, endpoint: check.endpoint, allow_origin, session })
    }

    /// The resolved session.
    ///
    /// # Errors
    /// Returns [`GatewayError::SessionMissing`] if the gate ran without
    /// requiring one and none was found.
    pub fn session(&self) -> Result<&SessionToken, GatewayError> {
        self.session.as_ref().ok_or(GatewayError::SessionMissing)
    }

    /// `Content-Type` plus the credentialed CORS echo, if any.
    #[must_use]
    pub fn response_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        if let Some(origin) = &self.allow_origin {
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
                HeaderValue::from_static("true"),
            );
            headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone());
        }
        headers
    }
}

/// Header value as text; non-UTF-8 values count as absent.
fn header_str(headers: &HeaderMap, name: header::HeaderName) -> Option<&str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
