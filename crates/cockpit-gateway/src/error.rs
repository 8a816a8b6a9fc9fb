//! API error types and responses.
//!
//! Every failure that reaches a caller is rendered as
//! `{"detail": "...", "code": "..."}` with the matching status code.

use axum::extract::rejection::JsonRejection;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use cockpit_agent::AgentError;
use cockpit_auth::AuthError;

/// Message returned for every 5xx that is not an agent failure.
const INTERNAL_DETAIL: &str = "Internal server error";

/// API error type that implements `IntoResponse`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No `Authorization` header on a protected path.
    #[error("Missing authentication token")]
    MissingCredential,

    /// `Authorization` header is not `Bearer <token>`.
    #[error("Invalid authentication format. Use: Bearer <token>")]
    MalformedCredential,

    /// Bearer token does not match.
    #[error("Invalid authentication token")]
    InvalidCredential,

    /// Client exceeded its request ceiling.
    #[error("Rate limit exceeded. Retry after {retry_after_secs} seconds")]
    RateLimitExceeded {
        /// Per-minute ceiling.
        limit: u32,
        /// Seconds until the exhausted window resets.
        retry_after_secs: u64,
    },

    /// Declared or buffered body is larger than allowed.
    #[error("Request body too large")]
    PayloadTooLarge,

    /// Request body or parameters have the wrong shape.
    #[error("{0}")]
    ValidationFailed(String),

    /// The handler did not finish within the request timeout.
    #[error("Request timed out")]
    RequestTimeout,

    /// No route matches.
    #[error("not found: {0}")]
    NotFound(String),

    /// The agent engine failed.
    #[error("Agent execution failed: {0}")]
    ExecutionFailed(String),

    /// Internal server error with a cause that must not reach the caller.
    #[error("internal error: {0}")]
    Internal(String),

    /// A panic escaped a handler.
    #[error("unhandled error")]
    Unhandled {
        /// Correlation id of the failed call.
        request_id: String,
    },
}

/// Error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    detail: String,
    code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_id: Option<String>,
}

impl ApiError {
    /// Get the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingCredential | Self::MalformedCredential => StatusCode::UNAUTHORIZED,
            Self::InvalidCredential => StatusCode::FORBIDDEN,
            Self::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::ValidationFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::RequestTimeout => StatusCode::REQUEST_TIMEOUT,
            Self::ExecutionFailed(_) | Self::Internal(_) | Self::Unhandled { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get the error code string for this error.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MissingCredential => "missing_credential",
            Self::MalformedCredential => "malformed_credential",
            Self::InvalidCredential => "invalid_credential",
            Self::RateLimitExceeded { .. } => "rate_limit_exceeded",
            Self::PayloadTooLarge => "payload_too_large",
            Self::ValidationFailed(_) => "validation_failed",
            Self::NotFound(_) => "not_found",
            Self::RequestTimeout => "request_timeout",
            Self::ExecutionFailed(_) => "execution_failed",
            Self::Internal(_) => "internal_error",
            Self::Unhandled { .. } => "unhandled",
        }
    }

    /// Text placed in the `detail` field.
    fn detail(&self) -> String {
        match self {
            Self::Internal(_) | Self::Unhandled { .. } => INTERNAL_DETAIL.to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if let Self::Internal(cause) = &self {
            tracing::error!(error = %cause, "Internal error");
        }

        let body = ErrorResponse {
            detail: self.detail(),
            code: self.code(),
            request_id: match &self {
                Self::Unhandled { request_id } => Some(request_id.clone()),
                _ => None,
            },
        };

        let mut response = (status, Json(body)).into_response();
        let headers = response.headers_mut();
        match self {
            Self::MissingCredential | Self::MalformedCredential => {
                headers.insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
            }
            Self::RateLimitExceeded {
                limit,
                retry_after_secs,
            } => {
                headers.insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
                headers.insert(crate::pipeline::RATE_LIMIT_LIMIT, HeaderValue::from(limit));
                headers.insert(
                    crate::pipeline::RATE_LIMIT_REMAINING,
                    HeaderValue::from_static("0"),
                );
            }
            _ => {}
        }
        response
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredential => Self::MissingCredential,
            AuthError::MalformedCredential => Self::MalformedCredential,
            AuthError::InvalidCredential => Self::InvalidCredential,
        }
    }
}

impl From<AgentError> for ApiError {
    fn from(err: AgentError) -> Self {
        match err {
            AgentError::ValidationFailed(msg) => Self::ValidationFailed(msg),
            AgentError::ExecutionFailed(msg) => {
                tracing::error!(error = %msg, "agent_run_error");
                Self::ExecutionFailed(msg)
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return Self::PayloadTooLarge;
        }
        Self::ValidationFailed(rejection.body_text())
    }
}
