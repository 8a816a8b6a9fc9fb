//! Public path allow-list.

/// Paths that bypass credential checks.
///
/// Exact entries match only themselves. Prefix entries match themselves and
/// anything below them (`/api/health` covers `/api/health/ready` but not
/// `/api/healthz`).
#[derive(Debug, Clone)]
pub struct PublicPaths {
    exact: Vec<String>,
    prefixes: Vec<String>,
}

impl PublicPaths {
    /// Create an allow-list from exact paths and path prefixes.
    #[must_use]
    pub fn new(exact: Vec<String>, prefixes: Vec<String>) -> Self {
        Self { exact, prefixes }
    }

    /// Returns `true` if `path` may be served without a credential.
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        if self.exact.iter().any(|p| p == path) {
            return true;
        }
        self.prefixes.iter().any(|prefix| {
            path.strip_prefix(prefix.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
        })
    }
}

impl Default for PublicPaths {
    /// Service identity, the health family and the API documentation paths.
    fn default() -> Self {
        Self::new(
            vec![
                "/".to_string(),
                "/api".to_string(),
                "/api/openapi.json".to_string(),
                "/api/redoc".to_string(),
            ],
            vec!["/api/health".to_string(), "/api/docs".to_string()],
        )
    }
}
