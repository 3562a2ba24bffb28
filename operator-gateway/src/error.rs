//! Error types for the gateway crate.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use operator_core::CoreError;
use operator_executor::ExecutorError;

/// Errors that end a request before any command output is produced.
///
/// A command that runs and fails is not one of these; it is reported in the
/// `200` body instead.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum GatewayError {
    /// Origin gate, routing or body errors from the core crate.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The route needs a session and none was configured or sent.
    #[error("unable to determine session")]
    SessionMissing,

    /// The credential sandbox could not be prepared.
    #[error("executor error: {0}")]
    Executor(#[from] ExecutorError),
}

impl GatewayError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::Core(
                CoreError::EndpointUndetermined
                | CoreError::OriginMismatch { .. }
                | CoreError::MalformedBody { .. },
            ) => StatusCode::BAD_REQUEST,
            GatewayError::Core(CoreError::RouteNotFound { .. }) => StatusCode::NOT_FOUND,
            GatewayError::SessionMissing => StatusCode::UNAUTHORIZED,
            GatewayError::Core(_) | GatewayError::Executor(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::NOT_FOUND {
            return status.into_response();
        }
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, [(header::CONTENT_TYPE, "text/plain")], self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_error_status_codes_map_correctly() {
        let cases = [
            (GatewayError::Core(CoreError::EndpointUndetermined), StatusCode::BAD_REQUEST),
            (
                GatewayError::Core(CoreError::OriginMismatch {
                    endpoint: "https://api.a.org".to_owned(),
                    origin_domain: "b.org".to_owned(),
                }),
                StatusCode::BAD_REQUEST,
            ),
            (
                GatewayError::Core(CoreError::MalformedBody { reason: "x".to_owned() }),
                StatusCode::BAD_REQUEST,
            ),
            (GatewayError::SessionMissing, StatusCode::UNAUTHORIZED),
            (
                GatewayError::Core(CoreError::RouteNotFound { route: "a/b".to_owned() }),
                StatusCode::NOT_FOUND,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[test]
    fn gateway_error_executor_variant_returns_500() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only tmp");
        let gw_err = GatewayError::Executor(ExecutorError::Io(io));
        let resp = gw_err.into_response();
        assert_eq!(
            resp.status(),
            StatusCode::INTERNAL_SERVER_ERROR,
            "Sandbox I/O failures must map to 500"
        );
    }

    #[test]
    fn gateway_error_display_uses_wire_messages() {
        assert_eq!(GatewayError::SessionMissing.to_string(), "unable to determine session");
        assert_eq!(
            GatewayError::Core(CoreError::EndpointUndetermined).to_string(),
            "unable to determine apiurl"
        );
    }
}
