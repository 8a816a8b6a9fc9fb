//! Bearer credential authentication for the cockpit gateway.
//!
//! This crate decides, for one inbound call, whether it may proceed:
//!
//! - Paths on the public allow-list pass without inspecting credentials
//! - Everything else must carry `Authorization: Bearer <token>`
//! - The token is compared in constant time against a single shared secret
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐     ┌──────────────────────┐
//! │   Gateway        │────▶│   Authenticator      │
//! │   (auth gate)    │     │   (public paths +    │
//! └──────────────────┘     │    header parsing)   │
//!                          └──────────┬───────────┘
//!                                     │
//!                          ┌──────────▼───────────┐
//!                          │ CredentialValidator  │
//!                          │ (trait)              │
//!                          └──────────┬───────────┘
//!                                     │
//!                          ┌──────────▼───────────┐
//!                          │ SharedSecretValidator│
//!                          └──────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use cockpit_auth::{
//!     AuthDecision, AuthError, Authenticator, PublicPaths, SharedSecret, SharedSecretValidator,
//! };
//!
//! let validator = SharedSecretValidator::new(SharedSecret::new("s3cret"));
//! let auth = Authenticator::new(validator, PublicPaths::default());
//!
//! assert!(matches!(auth.authorize("/api/health", None), Ok(AuthDecision::Public)));
//! assert!(matches!(
//!     auth.authorize("/api/agents/", None),
//!     Err(AuthError::MissingCredential)
//! ));
//! assert!(matches!(
//!     auth.authorize("/api/agents/", Some(b"Bearer s3cret".as_slice())),
//!     Ok(AuthDecision::Authenticated(_))
//! ));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod bearer;
pub mod error;
pub mod public;
pub mod secret;

pub use bearer::{
    parse_authorization, AuthDecision, Authenticator, CredentialValidator, Principal,
    SharedSecretValidator,
};
pub use error::{AuthError, Result};
pub use public::PublicPaths;
pub use secret::SharedSecret;
