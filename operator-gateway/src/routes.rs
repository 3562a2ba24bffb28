//! Axum route handlers for the operator gateway.
//!
//! Request lifecycle: allow-list check, origin gate and session policy,
//! command resolution, credential sandbox, sequential execution, sandbox
//! removal. Any step up to the sandbox may reject the request with a status
//! code; after that the response is always `200` and command failure is
//! reported in the body.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{RawQuery, State},
    http::{header, HeaderMap, HeaderValue, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tower_http::trace::TraceLayer;
use tracing::Instrument;

use operator_core::{
    resolve, CommandBatch, DispatchRequest, GetRoute, Method, PostBody, PostRoute, QueryParams,
    RequestPath,
};
use operator_executor::{CommandRunner, CredentialSandbox, ANONYMOUS_USER};

use crate::config::{GatewayConfig, SERVICE_NAME, SERVICE_NAMESPACE};
use crate::context::RequestContext;
use crate::error::GatewayError;

/// Appended to the body when a command exits non-zero or cannot be run.
pub const FAILED_MARKER: &str = "failed";

const PREFLIGHT_METHODS: &str = "GET, POST";
const PREFLIGHT_HEADERS: &str = "Access-Control-Allow-Origin, Content-Type, X-Requested-With";
const ALLOWED_METHODS: &str = "OPTIONS, GET, POST";

// ── Shared state ─────────────────────────────────────────────────────────────

/// State shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub runner: Arc<dyn CommandRunner>,
}

impl AppState {
    #[must_use]
    pub fn new(config: GatewayConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self { config: Arc::new(config), runner }
    }
}

// ── Router ────────────────────────────────────────────────────────────────────

/// Build the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/",
            get(introspect).head(not_implemented).post(not_found).options(preflight),
        )
        .route(
            "/{*path}",
            get(dispatch_get)
                .head(not_implemented)
                .post(dispatch_post)
                .options(preflight),
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

// ── Handlers ──────────────────────────────────────────────────────────────────

/// `GET /`: static identity; needs neither origin checks nor a session.
pub async fn introspect() -> impl IntoResponse {
    let body = format!(
        "namespace: {SERVICE_NAMESPACE}\nname: {SERVICE_NAME}\nversion: {}\n",
        env!("CARGO_PKG_VERSION")
    );
    (StatusCode::OK, [(header::CONTENT_TYPE, "text/plain")], body)
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

/// Registered for `HEAD` so axum does not route it through the `GET`
/// handlers, which would run a command and discard its output.
async fn not_implemented() -> StatusCode {
    StatusCode::NOT_IMPLEMENTED
}

/// Lenient `application/x-www-form-urlencoded` decoding; never rejects.
fn parse_query(raw: Option<&str>) -> QueryParams {
    raw.map(|q| form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default()
}

/// `OPTIONS *`: CORS preflight.
///
/// Runs only the origin gate. On rejection the status is `400` and the
/// response lists the methods the server supports instead of CORS headers.
pub async fn preflight(State(state): State<AppState>, headers: HeaderMap) -> Response {
    match RequestContext::prepare(&state.config, &headers, false) {
        Ok(ctx) => {
            let mut out = ctx.response_headers();
            out.insert(
                header::ACCESS_CONTROL_ALLOW_METHODS,
                HeaderValue::from_static(PREFLIGHT_METHODS),
            );
            out.insert(
                header::ACCESS_CONTROL_ALLOW_HEADERS,
                HeaderValue::from_static(PREFLIGHT_HEADERS),
            );
            (StatusCode::OK, out).into_response()
        }
        Err(e) => {
            tracing::debug!(error = %e, "preflight rejected");
            (
                StatusCode::BAD_REQUEST,
                [(header::ALLOW, HeaderValue::from_static(ALLOWED_METHODS))],
            )
                .into_response()
        }
    }
}

/// `GET /{route}/...`: run one read-only command.
pub async fn dispatch_get(
    State(state): State<AppState>,
    headers: HeaderMap,
    uri: Uri,
    RawQuery(query): RawQuery,
) -> Response {
    let path = RequestPath::parse(uri.path());
    if path.is_root() {
        return introspect().await.into_response();
    }
    let span = tracing::info_span!(
        "request",
        method = "GET",
        route = %path.route_key(),
        request_id = tracing::field::Empty,
    );
    handle_get(&state, &headers, &path, parse_query(query.as_deref()))
        .instrument(span)
        .await
        .unwrap_or_else(reject)
}

/// `POST /{route}/...`: run a batch of mutating commands.
pub async fn dispatch_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    uri: Uri,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Response {
    let path = RequestPath::parse(uri.path());
    let span = tracing::info_span!(
        "request",
        method = "POST",
        route = %path.route_key(),
        request_id = tracing::field::Empty,
    );
    handle_post(&state, &headers, &path, parse_query(query.as_deref()), &body)
        .instrument(span)
        .await
        .unwrap_or_else(reject)
}

fn reject(error: GatewayError) -> Response {
    tracing::info!(error = %error, status = %error.status(), "request rejected");
    error.into_response()
}

async fn handle_get(
    state: &AppState,
    headers: &HeaderMap,
    path: &RequestPath,
    query: QueryParams,
) -> Result<Response, GatewayError> {
    GetRoute::matching(path)?;
    let ctx = RequestContext::prepare(&state.config, headers, true)?;

    let body = PostBody::empty();
    let request = DispatchRequest {
        path,
        query: &query,
        accept: headers.get(header::ACCEPT).and_then(|v| v.to_str().ok()),
        body: &body,
    };
    let batch = resolve(Method::Get, request)?.into_batch();

    let output = run_in_sandbox(state, &ctx, ANONYMOUS_USER, batch, false).await?;
    Ok((StatusCode::OK, ctx.response_headers(), output).into_response())
}

async fn handle_post(
    state: &AppState,
    headers: &HeaderMap,
    path: &RequestPath,
    query: QueryParams,
    raw_body: &[u8],
) -> Result<Response, GatewayError> {
    PostRoute::matching(path)?;
    let body = PostBody::parse(raw_body)?;
    tracing::debug!(body = %body.as_value(), "request body");

    let ctx = RequestContext::prepare(&state.config, headers, true)?;

    let request = DispatchRequest { path, query: &query, accept: None, body: &body };
    let batch = resolve(Method::Post, request)?.into_batch();
    let user = body.user().unwrap_or(ANONYMOUS_USER);

    let output = run_in_sandbox(state, &ctx, user, batch, true).await?;
    Ok((StatusCode::OK, ctx.response_headers(), output).into_response())
}

/// Writes the sandbox, runs the batch and removes the sandbox again.
///
/// The sandbox is removed on drop as well, so an error or panic between
/// acquire and release still leaves no files behind.
async fn run_in_sandbox(
    state: &AppState,
    ctx: &RequestContext,
    user: &str,
    batch: CommandBatch,
    echo: bool,
) -> Result<Vec<u8>, GatewayError> {
    let sandbox = CredentialSandbox::acquire_blocking(
        state.config.sandbox_dir.clone(),
        ctx.request_id,
        ctx.endpoint.clone(),
        user.to_owned(),
        ctx.session()?.clone(),
    )
    .await?;

    let output = execute_batch(state.runner.as_ref(), batch, &sandbox, echo).await;

    if let Err(e) = sandbox.release_blocking().await {
        tracing::warn!(request_id = %ctx.request_id, error = %e, "failed to remove credential sandbox");
    }
    Ok(output)
}

/// Runs commands in order, stopping after the first failure.
///
/// With `echo`, each command line is written as `$ argv...` before its
/// output.
async fn execute_batch(
    runner: &dyn CommandRunner,
    batch: CommandBatch,
    sandbox: &CredentialSandbox,
    echo: bool,
) -> Vec<u8> {
    let mut body = Vec::new();
    for command in batch {
        if echo {
            body.extend_from_slice(format!("$ {command}\n").as_bytes());
        }
        let succeeded = match runner.run(&command, sandbox).await {
            Ok(result) => {
                body.extend_from_slice(&result.output);
                result.success()
            }
            Err(e) => {
                tracing::error!(%command, error = %e, "command could not be run");
                body.extend_from_slice(format!("{e}\n").as_bytes());
                false
            }
        };
        if !succeeded {
            body.extend_from_slice(FAILED_MARKER.as_bytes());
            break;
        }
    }
    body
}
