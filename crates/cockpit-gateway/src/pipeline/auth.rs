//! Bearer credential gate.

use axum::http::{HeaderMap, HeaderValue};

use cockpit_auth::{Authenticator, CredentialValidator};

use super::{Decision, Gate};
use crate::context::RequestContext;

/// Pipeline adapter around [`Authenticator`].
#[derive(Debug, Clone)]
pub struct AuthGate<V> {
    authenticator: Authenticator<V>,
}

impl<V: CredentialValidator> AuthGate<V> {
    /// Create an auth gate.
    #[must_use]
    pub const fn new(authenticator: Authenticator<V>) -> Self {
        Self { authenticator }
    }
}

impl<V: CredentialValidator> Gate for AuthGate<V> {
    fn name(&self) -> &'static str {
        "auth"
    }

    fn evaluate(&self, ctx: &RequestContext, _annotations: &mut HeaderMap) -> Decision {
        let header = ctx.authorization.as_ref().map(HeaderValue::as_bytes);
        match self.authenticator.authorize(&ctx.path, header) {
            Ok(_) => Decision::Allow,
            Err(err) => Decision::Reject(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{header, Request};
    use cockpit_auth::{PublicPaths, SharedSecret, SharedSecretValidator};

    use super::*;
    use crate::error::ApiError;

    fn gate() -> AuthGate<SharedSecretValidator> {
        AuthGate::new(Authenticator::new(
            SharedSecretValidator::new(SharedSecret::new("tok")),
            PublicPaths::default(),
        ))
    }

    fn evaluate(path: &str, auth: Option<&str>) -> Decision {
        let mut builder = Request::builder().uri(path);
        if let Some(auth) = auth {
            builder = builder.header(header::AUTHORIZATION, auth);
        }
        let ctx = RequestContext::from_request(&builder.body(Body::empty()).unwrap());
        gate().evaluate(&ctx, &mut HeaderMap::new())
    }

    #[test]
    fn maps_each_outcome() {
        assert!(matches!(evaluate("/api/health", None), Decision::Allow));
        assert!(matches!(
            evaluate("/api/agents/", Some("Bearer tok")),
            Decision::Allow
        ));
        assert!(matches!(
            evaluate("/api/agents/", None),
            Decision::Reject(ApiError::MissingCredential)
        ));
        assert!(matches!(
            evaluate("/api/agents/", Some("tok")),
            Decision::Reject(ApiError::MalformedCredential)
        ));
        assert!(matches!(
            evaluate("/api/agents/", Some("Bearer nope")),
            Decision::Reject(ApiError::InvalidCredential)
        ));
    }
}
