//! Error types for the agent facade.

use thiserror::Error;

/// A result type using `AgentError`.
pub type Result<T> = std::result::Result<T, AgentError>;

/// Errors surfaced by the agent facade.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AgentError {
    /// The run request is malformed (empty messages, out-of-range parameters).
    #[error("validation failed: {0}")]
    ValidationFailed(String),

    /// The execution engine failed to produce a reply.
    #[error("Agent execution failed: {0}")]
    ExecutionFailed(String),
}

impl AgentError {
    /// Returns the appropriate HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::ValidationFailed(_) => 422,
            Self::ExecutionFailed(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_status_codes() {
        assert_eq!(
            AgentError::ValidationFailed("x".into()).http_status_code(),
            422
        );
        assert_eq!(
            AgentError::ExecutionFailed("x".into()).http_status_code(),
            500
        );
    }

    #[test]
    fn execution_failed_message() {
        let err = AgentError::ExecutionFailed("engine offline".into());
        assert_eq!(err.to_string(), "Agent execution failed: engine offline");
    }
}
