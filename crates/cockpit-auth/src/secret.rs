//! Shared secret wrapper.

use std::fmt;

use serde::{Deserialize, Deserializer};
use subtle::ConstantTimeEq;

/// The configured API token.
///
/// `Debug` never prints the value, so configuration structs holding a
/// `SharedSecret` can be logged freely.
#[derive(Clone)]
pub struct SharedSecret(String);

impl SharedSecret {
    /// Wrap a secret value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Compare a candidate against the secret in constant time.
    ///
    /// Only the length of the secret can be learned from timing.
    #[must_use]
    pub fn matches(&self, candidate: &str) -> bool {
        self.0.as_bytes().ct_eq(candidate.as_bytes()).into()
    }

    /// Returns `true` if no secret is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedSecret([REDACTED])")
    }
}

impl<'de> Deserialize<'de> for SharedSecret {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_is_redacted() {
        let secret = SharedSecret::new("hunter2");
        let rendered = format!("{secret:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("REDACTED"));
    }

    #[test]
    fn matches_exact_value_only() {
        let secret = SharedSecret::new("token-abc");
        assert!(secret.matches("token-abc"));
        assert!(!secret.matches("token-abd"));
        assert!(!secret.matches("token-ab"));
        assert!(!secret.matches("TOKEN-ABC"));
        assert!(!secret.matches(""));
    }

    #[test]
    fn deserializes_from_string() {
        let secret: SharedSecret = serde_json::from_str("\"from-config\"").unwrap();
        assert!(secret.matches("from-config"));
        assert!(!secret.is_empty());
    }
}
