//! Request-processing pipeline.
//!
//! Every inbound call passes through [`run_pipeline`], which:
//!
//! 1. Captures a [`RequestContext`]
//! 2. Evaluates the gates in order, stopping at the first rejection
//! 3. Dispatches allowed calls to the router, turning a panic into a 500
//! 4. Stamps the correlation id and processing time on the response
//! 5. Hands one audit record to the [`AuditRecorder`]
//!
//! Steps 4 and 5 run for rejected calls too. A call whose future is
//! dropped mid-dispatch (the client went away) is still counted and
//! audited, with status [`CLIENT_CLOSED_REQUEST`].
//!
//! Gate order is body size, then auth, then rate limit: a rejected
//! credential never consumes rate-limit quota.

mod auth;
mod body_limit;
mod rate_limit;

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, HeaderName, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use futures::FutureExt;

use cockpit_auth::{Authenticator, PublicPaths, SharedSecretValidator};

use crate::audit::{AuditRecord, AuditRecorder};
use crate::config::GatewayConfig;
use crate::context::RequestContext;
use crate::error::ApiError;
use crate::instrument;
use crate::metrics::Metrics;

pub use auth::AuthGate;
pub use body_limit::BodySizeGate;
pub use rate_limit::{RateDecision, RateLimitGate, RateLimiter};

/// Per-minute ceiling header.
pub const RATE_LIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");

/// Remaining quota header.
pub const RATE_LIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");

/// Status recorded for a call abandoned before a response was produced.
pub const CLIENT_CLOSED_REQUEST: u16 = 499;

/// Result of evaluating one gate.
#[derive(Debug)]
pub enum Decision {
    /// Continue with the next gate.
    Allow,
    /// Stop and answer with this error.
    Reject(ApiError),
}

/// A pipeline stage that may allow or reject a call.
pub trait Gate: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Decide on a call. Headers added to `annotations` are copied onto the
    /// response of an allowed call.
    fn evaluate(&self, ctx: &RequestContext, annotations: &mut HeaderMap) -> Decision;
}

/// Ordered gate chain plus the audit and metrics sinks that wrap it.
#[derive(Clone)]
pub struct Pipeline {
    gates: Arc<[Box<dyn Gate>]>,
    audit: AuditRecorder,
    metrics: Arc<Metrics>,
}

impl Pipeline {
    /// Create a pipeline from an explicit gate list.
    #[must_use]
    pub fn new(gates: Vec<Box<dyn Gate>>, audit: AuditRecorder, metrics: Arc<Metrics>) -> Self {
        Self {
            gates: gates.into(),
            audit,
            metrics,
        }
    }

    /// Create the standard gate chain for `config`.
    #[must_use]
    pub fn from_config(config: &GatewayConfig, audit: AuditRecorder, metrics: Arc<Metrics>) -> Self {
        let mut gates: Vec<Box<dyn Gate>> = vec![
            Box::new(BodySizeGate::new(config.max_body_bytes)),
            Box::new(AuthGate::new(Authenticator::new(
                SharedSecretValidator::new(config.api_token.clone()),
                PublicPaths::default(),
            ))),
        ];
        if config.rate_limit.enabled {
            gates.push(Box::new(RateLimitGate::new(
                config.rate_limit.per_minute,
                config.rate_limit.per_hour,
            )));
        }
        Self::new(gates, audit, metrics)
    }

    /// Names of the gates, in evaluation order.
    #[must_use]
    pub fn gate_names(&self) -> Vec<&'static str> {
        self.gates.iter().map(|g| g.name()).collect()
    }

    /// Run every gate, stopping at the first rejection.
    ///
    /// # Errors
    ///
    /// Returns the rejecting gate's error.
    pub fn evaluate(&self, ctx: &RequestContext, annotations: &mut HeaderMap) -> Result<(), ApiError> {
        for gate in self.gates.iter() {
            if let Decision::Reject(err) = gate.evaluate(ctx, annotations) {
                tracing::debug!(
                    gate = gate.name(),
                    path = %ctx.path,
                    request_id = %ctx.request_id,
                    code = err.code(),
                    "request_rejected"
                );
                return Err(err);
            }
        }
        Ok(())
    }
}

/// Owns a call's context from pipeline entry until it has been audited.
///
/// Dropping the guard without calling [`CallGuard::finish`] means the
/// call's future was cancelled; the drop records it as abandoned.
struct CallGuard {
    ctx: RequestContext,
    audit: AuditRecorder,
    metrics: Arc<Metrics>,
    finished: bool,
}

impl CallGuard {
    fn enter(ctx: RequestContext, pipeline: &Pipeline) -> Self {
        pipeline.metrics.request_started();
        Self {
            ctx,
            audit: pipeline.audit.clone(),
            metrics: Arc::clone(&pipeline.metrics),
            finished: false,
        }
    }

    fn finish(mut self, response: &mut Response) {
        instrument::stamp(&self.ctx, response);
        self.metrics
            .request_finished(response.status(), self.ctx.started.elapsed());
        self.audit
            .record(AuditRecord::from_exchange(&self.ctx, response));
        self.finished = true;
    }
}

impl Drop for CallGuard {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        tracing::info!(
            method = %self.ctx.method,
            path = %self.ctx.path,
            request_id = %self.ctx.request_id,
            "client_closed_request"
        );
        self.metrics.request_cancelled(self.ctx.started.elapsed());
        self.audit.record(AuditRecord::from_outcome(
            &self.ctx,
            CLIENT_CLOSED_REQUEST,
            None,
        ));
    }
}

/// Middleware that runs the full pipeline around the router.
pub async fn run_pipeline(
    State(pipeline): State<Pipeline>,
    mut request: Request,
    next: Next,
) -> Response {
    let call = CallGuard::enter(RequestContext::from_request(&request), &pipeline);
    let ctx = &call.ctx;

    let mut annotations = HeaderMap::new();
    let mut response = match pipeline.evaluate(ctx, &mut annotations) {
        Err(rejection) => {
            pipeline.metrics.record_rejection(&rejection);
            rejection.into_response()
        }
        Ok(()) => {
            request.extensions_mut().insert(ctx.request_id.clone());
            let mut response = dispatch(ctx, request, next).await;
            if is_bare_timeout(&response) {
                tracing::warn!(path = %ctx.path, request_id = %ctx.request_id, "request_timeout");
                response = ApiError::RequestTimeout.into_response();
            }
            response.headers_mut().extend(annotations);
            response
        }
    };

    call.finish(&mut response);
    response
}

/// The empty 408 produced by the timeout layer.
fn is_bare_timeout(response: &Response) -> bool {
    response.status() == StatusCode::REQUEST_TIMEOUT
        && !response.headers().contains_key(header::CONTENT_TYPE)
}

/// Call the router, converting a panic into `ApiError::Unhandled`.
async fn dispatch(ctx: &RequestContext, request: Request, next: Next) -> Response {
    match AssertUnwindSafe(next.run(request)).catch_unwind().await {
        Ok(response) => response,
        Err(panic) => {
            let reason = panic
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::error!(
                method = %ctx.method,
                path = %ctx.path,
                request_id = %ctx.request_id,
                error = %reason,
                "unhandled_exception"
            );
            ApiError::Unhandled {
                request_id: ctx.request_id.to_string(),
            }
            .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::Request as HttpRequest;
    use axum::routing::get;
    use axum::Router;
    use serde_json::Value;
    use tower::ServiceExt;
    use tower_http::timeout::TimeoutLayer;

    use super::*;

    fn config() -> GatewayConfig {
        let mut config = GatewayConfig::default();
        config.api_token = cockpit_auth::SharedSecret::new("tok");
        config.max_body_bytes = 10;
        config.rate_limit.per_minute = 1;
        config
    }

    fn app(config: &GatewayConfig, metrics: Arc<Metrics>) -> Router {
        let pipeline = Pipeline::from_config(config, AuditRecorder::disabled(), metrics);
        Router::new()
            .route("/api/agents/", get(|| async { "ok" }))
            .route("/api/agents/boom", get(boom))
            .layer(axum::middleware::from_fn_with_state(pipeline, run_pipeline))
    }

    async fn boom() -> &'static str {
        panic!("handler exploded")
    }

    async fn slow() -> &'static str {
        tokio::time::sleep(Duration::from_secs(60)).await;
        "late"
    }

    fn slow_app(pipeline: Pipeline) -> Router {
        Router::new()
            .route("/api/agents/slow", get(slow))
            .layer(axum::middleware::from_fn_with_state(pipeline, run_pipeline))
    }

    async fn audit_lines(path: &Path, expected: usize) -> Vec<Value> {
        let mut lines = Vec::new();
        for _ in 0..200 {
            let contents = tokio::fs::read_to_string(path).await.unwrap_or_default();
            lines = contents
                .lines()
                .map(|l| serde_json::from_str(l).unwrap())
                .collect();
            if lines.len() >= expected {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        lines
    }

    fn get_req(path: &str) -> axum::http::request::Builder {
        HttpRequest::builder()
            .uri(path)
            .header(header::AUTHORIZATION, "Bearer tok")
    }

    #[test]
    fn gate_order() {
        let pipeline = Pipeline::from_config(
            &config(),
            AuditRecorder::disabled(),
            Arc::new(Metrics::new()),
        );
        assert_eq!(pipeline.gate_names(), ["body_size", "auth", "rate_limit"]);

        let mut disabled = config();
        disabled.rate_limit.enabled = false;
        let pipeline =
            Pipeline::from_config(&disabled, AuditRecorder::disabled(), Arc::new(Metrics::new()));
        assert_eq!(pipeline.gate_names(), ["body_size", "auth"]);
    }

    #[tokio::test]
    async fn body_gate_runs_before_auth() {
        let app = app(&config(), Arc::new(Metrics::new()));
        let response = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/api/agents/")
                    .header(header::CONTENT_LENGTH, "11")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(response.headers().contains_key("x-request-id"));
        assert!(response.headers().contains_key("x-process-time"));
    }

    #[tokio::test]
    async fn failed_auth_does_not_consume_quota() {
        let metrics = Arc::new(Metrics::new());
        let app = app(&config(), Arc::clone(&metrics));

        let rejected = app
            .clone()
            .oneshot(
                HttpRequest::builder()
                    .uri("/api/agents/")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(rejected.status(), StatusCode::UNAUTHORIZED);

        let allowed = app
            .clone()
            .oneshot(get_req("/api/agents/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(allowed.status(), StatusCode::OK);
        assert_eq!(allowed.headers()[RATE_LIMIT_REMAINING], "0");

        let limited = app
            .oneshot(get_req("/api/agents/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(limited.headers().contains_key(header::RETRY_AFTER));

        let snapshot = metrics.snapshot(0);
        assert_eq!(snapshot.requests_total, 3);
        assert_eq!(snapshot.auth_rejections, 1);
        assert_eq!(snapshot.rate_limited, 1);
    }

    #[tokio::test]
    async fn panic_becomes_generic_500() {
        let mut config = config();
        config.rate_limit.enabled = false;
        let app = app(&config, Arc::new(Metrics::new()));

        let response = app
            .oneshot(
                get_req("/api/agents/boom")
                    .header("x-request-id", "trace-panic")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()["x-request-id"], "trace-panic");

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["detail"], "Internal server error");
        assert_eq!(json["request_id"], "trace-panic");
        assert!(!json.to_string().contains("exploded"));
    }

    #[tokio::test]
    async fn abandoned_call_is_still_audited() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");
        let audit = AuditRecorder::spawn(&path).await.unwrap();
        let metrics = Arc::new(Metrics::new());
        let mut config = config();
        config.rate_limit.enabled = false;
        let app = slow_app(Pipeline::from_config(&config, audit, Arc::clone(&metrics)));

        let call = tokio::spawn(
            app.oneshot(
                get_req("/api/agents/slow")
                    .header("x-request-id", "trace-gone")
                    .body(Body::empty())
                    .unwrap(),
            ),
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
        call.abort();
        assert!(call.await.unwrap_err().is_cancelled());

        let lines = audit_lines(&path, 1).await;
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["status_code"], CLIENT_CLOSED_REQUEST);
        assert_eq!(lines[0]["path"], "/api/agents/slow");
        assert_eq!(lines[0]["request_id"], "trace-gone");

        let snapshot = metrics.snapshot(0);
        assert_eq!(snapshot.requests_total, 1);
        assert_eq!(snapshot.requests_inflight, 0);
        assert_eq!(snapshot.requests_cancelled, 1);
    }

    #[tokio::test]
    async fn completed_call_is_audited_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");
        let audit = AuditRecorder::spawn(&path).await.unwrap();
        let pipeline = Pipeline::from_config(&config(), audit, Arc::new(Metrics::new()));
        let app = Router::new()
            .route("/api/agents/", get(|| async { "ok" }))
            .layer(axum::middleware::from_fn_with_state(pipeline, run_pipeline));

        let response = app
            .oneshot(get_req("/api/agents/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // Give a duplicate record the chance to show up.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let lines = audit_lines(&path, 1).await;
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["status_code"], 200);
    }

    #[tokio::test]
    async fn timeout_is_rendered_as_json() {
        let mut config = config();
        config.rate_limit.enabled = false;
        let pipeline =
            Pipeline::from_config(&config, AuditRecorder::disabled(), Arc::new(Metrics::new()));
        let app = Router::new()
            .route("/api/agents/slow", get(slow))
            .layer(TimeoutLayer::new(Duration::from_millis(20)))
            .layer(axum::middleware::from_fn_with_state(pipeline, run_pipeline));

        let response = app
            .oneshot(get_req("/api/agents/slow").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
        assert!(response.headers().contains_key("x-request-id"));

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["detail"], "Request timed out");
        assert_eq!(json["code"], "request_timeout");
    }
}
