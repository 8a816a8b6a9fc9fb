//! Gateway configuration types.
//!
//! The configuration is built once at startup and shared read-only with
//! every component through [`crate::GatewayState`].

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use cockpit_agent::AgentDefaults;
use cockpit_auth::SharedSecret;

/// Errors raised while assembling configuration from named variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable was present but could not be parsed.
    #[error("invalid value for {key}: {value:?}")]
    Invalid {
        /// Variable name.
        key: &'static str,
        /// Raw value.
        value: String,
    },
}

/// Per-client request ceilings.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Whether the rate limit gate runs at all.
    #[serde(default = "RateLimitConfig::default_enabled")]
    pub enabled: bool,

    /// Requests allowed per client per minute.
    #[serde(default = "RateLimitConfig::default_per_minute")]
    pub per_minute: u32,

    /// Requests allowed per client per hour.
    #[serde(default = "RateLimitConfig::default_per_hour")]
    pub per_hour: u32,
}

impl RateLimitConfig {
    const fn default_enabled() -> bool {
        true
    }

    const fn default_per_minute() -> u32 {
        60
    }

    const fn default_per_hour() -> u32 {
        1000
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: Self::default_enabled(),
            per_minute: Self::default_per_minute(),
            per_hour: Self::default_per_hour(),
        }
    }
}

/// Append-only audit log settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AuditConfig {
    /// Whether audit records are written.
    #[serde(default = "AuditConfig::default_enabled")]
    pub enabled: bool,

    /// Destination file; parent directories are created on startup.
    #[serde(default = "AuditConfig::default_path")]
    pub path: PathBuf,
}

impl AuditConfig {
    const fn default_enabled() -> bool {
        true
    }

    fn default_path() -> PathBuf {
        PathBuf::from("logs/audit.log")
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: Self::default_enabled(),
            path: Self::default_path(),
        }
    }
}

/// Configuration for the gateway service.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Listen address (e.g., "0.0.0.0:8000").
    #[serde(default = "GatewayConfig::default_listen_addr")]
    pub listen_addr: String,

    /// Service name reported by `/` and `/api`.
    #[serde(default = "GatewayConfig::default_app_name")]
    pub app_name: String,

    /// Service version reported by identity and health endpoints.
    #[serde(default = "GatewayConfig::default_app_version")]
    pub app_version: String,

    /// Deployment environment name.
    #[serde(default = "GatewayConfig::default_environment")]
    pub environment: String,

    /// Shared bearer token required on protected paths.
    #[serde(default = "GatewayConfig::default_api_token")]
    pub api_token: SharedSecret,

    /// Allowed CORS origins; `*` allows any.
    #[serde(default = "GatewayConfig::default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Rate limiting.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Maximum request body size in bytes.
    #[serde(default = "GatewayConfig::default_max_body")]
    pub max_body_bytes: u64,

    /// Request timeout in seconds.
    #[serde(default = "GatewayConfig::default_request_timeout")]
    pub request_timeout_seconds: u64,

    /// Audit log.
    #[serde(default)]
    pub audit: AuditConfig,

    /// Agent execution defaults.
    #[serde(default)]
    pub agent: AgentDefaults,
}

impl GatewayConfig {
    fn default_listen_addr() -> String {
        "0.0.0.0:8000".to_string()
    }

    fn default_app_name() -> String {
        "Agent Cockpit Gateway".to_string()
    }

    fn default_app_version() -> String {
        env!("CARGO_PKG_VERSION").to_string()
    }

    fn default_environment() -> String {
        "development".to_string()
    }

    fn default_api_token() -> SharedSecret {
        SharedSecret::new("change-this-in-production")
    }

    fn default_cors_origins() -> Vec<String> {
        vec![
            "http://localhost:5173".to_string(),
            "http://localhost:3000".to_string(),
        ]
    }

    const fn default_max_body() -> u64 {
        10 * 1024 * 1024 // 10 MiB
    }

    const fn default_request_timeout() -> u64 {
        30
    }

    /// Get the request timeout as a `Duration`.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    /// Build configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if a variable cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from named variables, falling back to defaults
    /// for anything `lookup` does not provide.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if a variable cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = lookup("LISTEN_ADDR") {
            config.listen_addr = v;
        }
        if let Some(v) = lookup("APP_NAME") {
            config.app_name = v;
        }
        if let Some(v) = lookup("APP_VERSION") {
            config.app_version = v;
        }
        if let Some(v) = lookup("APP_ENV") {
            config.environment = v;
        }
        if let Some(v) = lookup("API_TOKEN") {
            config.api_token = SharedSecret::new(v);
        }
        if let Some(v) = lookup("ALLOWED_ORIGINS") {
            config.cors_origins = v
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(v) = parsed(&lookup, "RATE_LIMIT_ENABLED")? {
            config.rate_limit.enabled = v;
        }
        if let Some(v) = parsed(&lookup, "RATE_LIMIT_PER_MINUTE")? {
            config.rate_limit.per_minute = v;
        }
        if let Some(v) = parsed(&lookup, "RATE_LIMIT_PER_HOUR")? {
            config.rate_limit.per_hour = v;
        }
        if let Some(v) = parsed(&lookup, "MAX_BODY_SIZE")? {
            config.max_body_bytes = v;
        }
        if let Some(v) = parsed(&lookup, "REQUEST_TIMEOUT_SECONDS")? {
            config.request_timeout_seconds = v;
        }
        if let Some(v) = parsed(&lookup, "AUDIT_LOG_ENABLED")? {
            config.audit.enabled = v;
        }
        if let Some(v) = lookup("AUDIT_LOG_FILE") {
            config.audit.path = PathBuf::from(v);
        }
        if let Some(v) = lookup("AGENT_MODEL") {
            config.agent.model = v;
        }
        if let Some(v) = parsed(&lookup, "AGENT_TEMPERATURE")? {
            config.agent.temperature = v;
        }
        if let Some(v) = parsed(&lookup, "AGENT_MAX_TOKENS")? {
            config.agent.max_tokens = v;
        }

        Ok(config)
    }
}

/// Look up `key` and parse it, treating an absent variable as `None`.
fn parsed<F, T>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid { key, value })
        })
        .transpose()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_addr: Self::default_listen_addr(),
            app_name: Self::default_app_name(),
            app_version: Self::default_app_version(),
            environment: Self::default_environment(),
            api_token: Self::default_api_token(),
            cors_origins: Self::default_cors_origins(),
            rate_limit: RateLimitConfig::default(),
            max_body_bytes: Self::default_max_body(),
            request_timeout_seconds: Self::default_request_timeout(),
            audit: AuditConfig::default(),
            agent: AgentDefaults::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_config() {
        let config = GatewayConfig::default();
        assert_eq!(config.listen_addr, "0.0.0.0:8000");
        assert!(config.rate_limit.enabled);
        assert_eq!(config.rate_limit.per_minute, 60);
        assert_eq!(config.rate_limit.per_hour, 1000);
        assert_eq!(config.max_body_bytes, 10 * 1024 * 1024);
        assert!(config.audit.enabled);
        assert_eq!(config.audit.path, PathBuf::from("logs/audit.log"));
        assert_eq!(config.agent.model, "gpt-4");
    }

    #[test]
    fn timeout_duration() {
        let config = GatewayConfig::default();
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn lookup_overrides_defaults() {
        let config = GatewayConfig::from_lookup(lookup_from(&[
            ("API_TOKEN", "abc"),
            ("ALLOWED_ORIGINS", "https://a.example, https://b.example,"),
            ("RATE_LIMIT_ENABLED", "false"),
            ("RATE_LIMIT_PER_MINUTE", "5"),
            ("MAX_BODY_SIZE", "1024"),
            ("AUDIT_LOG_FILE", "/tmp/audit.jsonl"),
            ("AGENT_TEMPERATURE", "0.3"),
        ]))
        .unwrap();

        assert!(config.api_token.matches("abc"));
        assert_eq!(
            config.cors_origins,
            vec!["https://a.example", "https://b.example"]
        );
        assert!(!config.rate_limit.enabled);
        assert_eq!(config.rate_limit.per_minute, 5);
        assert_eq!(config.rate_limit.per_hour, 1000);
        assert_eq!(config.max_body_bytes, 1024);
        assert_eq!(config.audit.path, PathBuf::from("/tmp/audit.jsonl"));
        assert!((config.agent.temperature - 0.3).abs() < f64::EPSILON);
    }

    #[test]
    fn unparseable_value_is_an_error() {
        let err = GatewayConfig::from_lookup(lookup_from(&[("MAX_BODY_SIZE", "ten")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid { key: "MAX_BODY_SIZE", .. }
        ));
    }

    #[test]
    fn debug_does_not_leak_token() {
        let config = GatewayConfig::from_lookup(lookup_from(&[("API_TOKEN", "s3cr3t")])).unwrap();
        assert!(!format!("{config:?}").contains("s3cr3t"));
    }

    #[test]
    fn deserialize_partial() {
        let config: GatewayConfig =
            serde_json::from_str(r#"{"max_body_bytes": 10, "rate_limit": {"per_minute": 2}}"#)
                .unwrap();
        assert_eq!(config.max_body_bytes, 10);
        assert_eq!(config.rate_limit.per_minute, 2);
        assert_eq!(config.rate_limit.per_hour, 1000);
    }
}
