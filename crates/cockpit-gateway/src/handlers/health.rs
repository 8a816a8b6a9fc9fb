//! Health check endpoints.
//!
//! Everything here is public and does not require authentication.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::metrics::MetricsSnapshot;
use crate::state::GatewayState;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: &'static str,
    /// Time of the check.
    pub timestamp: DateTime<Utc>,
    /// Service version.
    pub version: String,
    /// Deployment environment.
    pub environment: String,
}

/// Result of one readiness check.
#[derive(Debug, Serialize)]
pub struct CheckResult {
    /// `ok`, `disabled` or `error`.
    pub status: &'static str,
    /// Failure reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CheckResult {
    const fn ok() -> Self {
        Self {
            status: "ok",
            error: None,
        }
    }
}

/// Streaming readiness.
#[derive(Debug, Serialize)]
pub struct StreamingCheck {
    /// Always `ok`.
    pub status: &'static str,
    /// Open sessions.
    pub active_sessions: usize,
}

/// Per-dependency readiness checks.
#[derive(Debug, Serialize)]
pub struct ReadinessChecks {
    /// Agent engine probe.
    pub agent_engine: CheckResult,
    /// Audit log writer.
    pub audit_log: CheckResult,
    /// WebSocket streaming.
    pub streaming: StreamingCheck,
}

/// Readiness check response.
#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    /// Whether the gateway can take traffic.
    pub ready: bool,
    /// Individual results.
    pub checks: ReadinessChecks,
    /// Time of the check.
    pub timestamp: DateTime<Utc>,
}

/// Health check handler, also served at `/api/health/ping`.
///
/// # Example
///
/// ```text
/// GET /api/health
///
/// Response: 200 OK
/// {
///   "status": "healthy",
///   "timestamp": "2024-01-01T00:00:00Z",
///   "version": "0.1.0",
///   "environment": "development"
/// }
/// ```
pub async fn health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now(),
        version: state.config.app_version.clone(),
        environment: state.config.environment.clone(),
    })
}

/// Readiness handler. Answers 503 if the agent engine is not ready.
pub async fn ready(State(state): State<GatewayState>) -> impl IntoResponse {
    let agent_engine = match state.agent.ready().await {
        Ok(()) => CheckResult::ok(),
        Err(err) => {
            tracing::warn!(error = %err, "agent engine not ready");
            CheckResult {
                status: "error",
                error: Some(err.to_string()),
            }
        }
    };
    let audit_log = if state.audit.is_enabled() {
        CheckResult::ok()
    } else {
        CheckResult {
            status: "disabled",
            error: None,
        }
    };

    let ready = agent_engine.error.is_none();
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let body = ReadinessResponse {
        ready,
        checks: ReadinessChecks {
            agent_engine,
            audit_log,
            streaming: StreamingCheck {
                status: "ok",
                active_sessions: state.sessions.len(),
            },
        },
        timestamp: Utc::now(),
    };
    (status, Json(body))
}

/// Live counters.
pub async fn metrics(State(state): State<GatewayState>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot(state.sessions.len()))
}
