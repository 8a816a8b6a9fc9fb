//! Authentication error types.

use thiserror::Error;

/// A result type using `AuthError`.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Reasons a call is refused by the auth gate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No `Authorization` header was supplied.
    #[error("Missing authentication token")]
    MissingCredential,

    /// The header is not of the form `Bearer <token>`.
    #[error("Invalid authentication format. Use: Bearer <token>")]
    MalformedCredential,

    /// The token was well-formed but does not match.
    #[error("Invalid authentication token")]
    InvalidCredential,
}

impl AuthError {
    /// Returns the appropriate HTTP status code for this error.
    ///
    /// Absent or unparseable credentials are 401; a credential that was read
    /// but is wrong is 403.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::MissingCredential | Self::MalformedCredential => 401,
            Self::InvalidCredential => 403,
        }
    }

    /// Returns `true` if the response should carry a `WWW-Authenticate` challenge.
    #[must_use]
    pub const fn requires_challenge(&self) -> bool {
        matches!(self, Self::MissingCredential | Self::MalformedCredential)
    }
}
