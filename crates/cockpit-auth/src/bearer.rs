//! Bearer header parsing and credential validation.

use crate::error::{AuthError, Result};
use crate::public::PublicPaths;
use crate::secret::SharedSecret;

/// Identity established by a successful credential check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Stable name of the credential that was presented.
    pub subject: String,
}

/// Outcome of an allowed call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthDecision {
    /// The path is on the public allow-list; no credential was inspected.
    Public,
    /// A valid credential was presented.
    Authenticated(Principal),
}

/// Trait for validating bearer tokens.
pub trait CredentialValidator: Send + Sync {
    /// Validate a bearer token and return the identity it represents.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredential` if the token is not accepted.
    fn validate(&self, token: &str) -> Result<Principal>;
}

/// Validator that accepts exactly one configured token.
#[derive(Debug, Clone)]
pub struct SharedSecretValidator {
    secret: SharedSecret,
}

impl SharedSecretValidator {
    /// Subject reported for callers holding the shared token.
    pub const SUBJECT: &'static str = "api-token";

    /// Create a validator for the given secret.
    #[must_use]
    pub fn new(secret: SharedSecret) -> Self {
        Self { secret }
    }
}

impl CredentialValidator for SharedSecretValidator {
    fn validate(&self, token: &str) -> Result<Principal> {
        // An unset secret must never be matched by an empty token.
        if self.secret.is_empty() || !self.secret.matches(token) {
            return Err(AuthError::InvalidCredential);
        }
        Ok(Principal {
            subject: Self::SUBJECT.to_string(),
        })
    }
}

/// Split an `Authorization` header value into its bearer token.
///
/// The value must consist of exactly two whitespace-separated parts, the
/// first of which is `Bearer` in any letter case.
///
/// # Errors
///
/// Returns `AuthError::MalformedCredential` for any other shape.
pub fn parse_authorization(value: &str) -> Result<&str> {
    let mut parts = value.split_whitespace();
    let (Some(scheme), Some(token), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(AuthError::MalformedCredential);
    };
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::MalformedCredential);
    }
    Ok(token)
}

/// Auth gate policy: public allow-list first, then bearer validation.
#[derive(Debug, Clone)]
pub struct Authenticator<V> {
    validator: V,
    public: PublicPaths,
}

impl<V: CredentialValidator> Authenticator<V> {
    /// Create an authenticator.
    #[must_use]
    pub fn new(validator: V, public: PublicPaths) -> Self {
        Self { validator, public }
    }

    /// Decide whether a call to `path` with the given raw `Authorization`
    /// header bytes may proceed.
    ///
    /// An empty header counts as missing; bytes that are not UTF-8 count as
    /// malformed.
    ///
    /// # Errors
    ///
    /// Returns the `AuthError` describing why the call is refused.
    pub fn authorize(&self, path: &str, header: Option<&[u8]>) -> Result<AuthDecision> {
        if self.public.contains(path) {
            return Ok(AuthDecision::Public);
        }

        let raw = match header {
            None | Some([]) => {
                tracing::warn!(path = %path, "missing_auth_header");
                return Err(AuthError::MissingCredential);
            }
            Some(raw) => raw,
        };

        let token = std::str::from_utf8(raw)
            .map_err(|_| AuthError::MalformedCredential)
            .and_then(parse_authorization)
            .inspect_err(|_| tracing::warn!(path = %path, "invalid_auth_format"))?;

        let principal = self
            .validator
            .validate(token)
            .inspect_err(|_| tracing::warn!(path = %path, "invalid_token"))?;

        tracing::debug!(path = %path, subject = %principal.subject, "authenticated_request");
        Ok(AuthDecision::Authenticated(principal))
    }
}
