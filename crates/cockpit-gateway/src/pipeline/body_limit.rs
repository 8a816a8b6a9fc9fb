//! Declared body size check.
//!
//! Bodies without a declared length are bounded while buffering by
//! `RequestBodyLimitLayer`, installed by the router with the same ceiling.

use axum::http::HeaderMap;

use super::{Decision, Gate};
use crate::context::RequestContext;
use crate::error::ApiError;

/// Rejects calls whose `Content-Length` exceeds the configured maximum.
#[derive(Debug, Clone, Copy)]
pub struct BodySizeGate {
    max_bytes: u64,
}

impl BodySizeGate {
    /// Create a gate with the given ceiling in bytes.
    #[must_use]
    pub const fn new(max_bytes: u64) -> Self {
        Self { max_bytes }
    }
}

impl Gate for BodySizeGate {
    fn name(&self) -> &'static str {
        "body_size"
    }

    fn evaluate(&self, ctx: &RequestContext, _annotations: &mut HeaderMap) -> Decision {
        match ctx.content_length {
            Some(declared) if declared > self.max_bytes => {
                tracing::warn!(
                    path = %ctx.path,
                    declared,
                    max = self.max_bytes,
                    "request_body_too_large"
                );
                Decision::Reject(ApiError::PayloadTooLarge)
            }
            _ => Decision::Allow,
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{header, Request};

    use super::*;

    fn ctx(length: Option<&str>) -> RequestContext {
        let mut builder = Request::builder().uri("/api/agents/run");
        if let Some(length) = length {
            builder = builder.header(header::CONTENT_LENGTH, length);
        }
        RequestContext::from_request(&builder.body(Body::empty()).unwrap())
    }

    #[test]
    fn boundary_is_inclusive() {
        let gate = BodySizeGate::new(100);
        let mut headers = HeaderMap::new();
        assert!(matches!(
            gate.evaluate(&ctx(Some("100")), &mut headers),
            Decision::Allow
        ));
        assert!(matches!(
            gate.evaluate(&ctx(Some("101")), &mut headers),
            Decision::Reject(ApiError::PayloadTooLarge)
        ));
    }

    #[test]
    fn undeclared_length_passes() {
        let gate = BodySizeGate::new(0);
        assert!(matches!(
            gate.evaluate(&ctx(None), &mut HeaderMap::new()),
            Decision::Allow
        ));
    }
}
