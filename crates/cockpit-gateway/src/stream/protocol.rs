//! Streaming wire protocol.
//!
//! Clients send JSON objects selected by `action`; the server answers with
//! JSON events selected by `type`, each carrying a per-session `seq`.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use cockpit_agent::{AgentRunRequest, Metadata, RunSummary, Usage};

/// A well-formed client message.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientAction {
    /// Start a streamed run.
    Run(Box<AgentRunRequest>),
    /// Liveness check.
    Ping,
}

/// A client message that could not be acted on. Never fatal to the session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Text frame was not a JSON object.
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// `run` payload had the wrong shape or failed validation.
    #[error("Invalid run request: {0}")]
    InvalidRun(String),

    /// `action` missing or not recognized.
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    /// Binary frames carry no protocol meaning.
    #[error("Invalid message: binary frames are not supported")]
    BinaryFrame,
}

impl ProtocolError {
    /// The in-band error event for this failure.
    #[must_use]
    pub fn to_event(&self) -> ServerEvent {
        match self {
            Self::InvalidRun(_) => ServerEvent::failed(self.to_string()),
            _ => ServerEvent::error(self.to_string()),
        }
    }
}

/// Parse one text frame.
///
/// # Errors
///
/// Returns a `ProtocolError` describing why the frame cannot be acted on.
pub fn parse_frame(text: &str) -> Result<ClientAction, ProtocolError> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| ProtocolError::InvalidMessage(e.to_string()))?;
    if !value.is_object() {
        return Err(ProtocolError::InvalidMessage(
            "expected a JSON object".to_string(),
        ));
    }

    match value.get("action") {
        Some(Value::String(action)) if action == "ping" => Ok(ClientAction::Ping),
        Some(Value::String(action)) if action == "run" => {
            let request: AgentRunRequest = serde_json::from_value(value)
                .map_err(|e| ProtocolError::InvalidRun(e.to_string()))?;
            request
                .validate()
                .map_err(|e| ProtocolError::InvalidRun(e.to_string()))?;
            Ok(ClientAction::Run(Box::new(request)))
        }
        Some(Value::String(other)) => Err(ProtocolError::UnknownAction(other.clone())),
        Some(other) => Err(ProtocolError::UnknownAction(other.to_string())),
        None => Err(ProtocolError::UnknownAction("null".to_string())),
    }
}

/// Event sent to the client.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerEvent {
    /// A run began.
    Start {
        /// Agent being run.
        agent_id: String,
        /// Always `false`.
        done: bool,
    },
    /// One output increment.
    Token {
        /// Increment text.
        content: String,
        /// Always `false`.
        done: bool,
    },
    /// The run finished.
    Complete {
        /// Token accounting.
        usage: Usage,
        /// Engine metadata.
        metadata: Metadata,
        /// Always `true`.
        done: bool,
    },
    /// Something went wrong.
    Error {
        /// Human-readable reason.
        error: String,
        /// `true` when the error ends a run.
        #[serde(skip_serializing_if = "Option::is_none")]
        done: Option<bool>,
    },
    /// Reply to `ping`.
    Pong,
}

impl ServerEvent {
    /// `start` event.
    #[must_use]
    pub fn start(agent_id: impl Into<String>) -> Self {
        Self::Start {
            agent_id: agent_id.into(),
            done: false,
        }
    }

    /// `token` event.
    #[must_use]
    pub fn token(content: impl Into<String>) -> Self {
        Self::Token {
            content: content.into(),
            done: false,
        }
    }

    /// `complete` event.
    #[must_use]
    pub fn complete(summary: RunSummary) -> Self {
        Self::Complete {
            usage: summary.usage,
            metadata: summary.metadata,
            done: true,
        }
    }

    /// Error outside a run.
    #[must_use]
    pub fn error(error: impl Into<String>) -> Self {
        Self::Error {
            error: error.into(),
            done: None,
        }
    }

    /// Error that ends a run.
    #[must_use]
    pub fn failed(error: impl Into<String>) -> Self {
        Self::Error {
            error: error.into(),
            done: Some(true),
        }
    }
}

/// Event with its sequence number, as written to the socket.
#[derive(Debug, Serialize)]
pub struct Envelope<'a> {
    /// Per-session sequence number, starting at 1.
    pub seq: u64,
    /// The event.
    #[serde(flatten)]
    pub event: &'a ServerEvent,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_ping_and_run() {
        assert_eq!(parse_frame(r#"{"action":"ping"}"#), Ok(ClientAction::Ping));

        let action = parse_frame(
            r#"{"action":"run","agent_id":"a1","messages":[{"role":"user","content":"hi"}],"temperature":0.5}"#,
        )
        .unwrap();
        let ClientAction::Run(request) = action else {
            panic!("expected run");
        };
        assert_eq!(request.agent_id, "a1");
        assert_eq!(request.temperature, Some(0.5));
    }

    #[test]
    fn unknown_actions_name_the_action() {
        assert_eq!(
            parse_frame(r#"{"action":"dance"}"#),
            Err(ProtocolError::UnknownAction("dance".into()))
        );
        assert_eq!(
            parse_frame(r#"{"agent_id":"a1"}"#).unwrap_err().to_string(),
            "Unknown action: null"
        );
        assert_eq!(
            parse_frame(r#"{"action":3}"#).unwrap_err().to_string(),
            "Unknown action: 3"
        );
    }

    #[test]
    fn malformed_frames() {
        assert!(matches!(
            parse_frame("not json"),
            Err(ProtocolError::InvalidMessage(_))
        ));
        assert!(matches!(
            parse_frame("[1,2]"),
            Err(ProtocolError::InvalidMessage(_))
        ));
        assert!(matches!(
            parse_frame(r#"{"action":"run","agent_id":"a1"}"#),
            Err(ProtocolError::InvalidRun(_))
        ));
        assert!(matches!(
            parse_frame(r#"{"action":"run","agent_id":"a1","messages":[]}"#),
            Err(ProtocolError::InvalidRun(_))
        ));
    }

    #[test]
    fn only_invalid_run_ends_a_run() {
        assert_eq!(
            ProtocolError::InvalidRun("x".into()).to_event(),
            ServerEvent::failed("Invalid run request: x")
        );
        assert_eq!(
            ProtocolError::UnknownAction("x".into()).to_event(),
            ServerEvent::error("Unknown action: x")
        );
    }

    #[test]
    fn envelope_wire_format() {
        let pong = ServerEvent::Pong;
        let value = serde_json::to_value(Envelope { seq: 1, event: &pong }).unwrap();
        assert_eq!(value, json!({"seq": 1, "type": "pong"}));

        let start = ServerEvent::start("a1");
        let value = serde_json::to_value(Envelope { seq: 2, event: &start }).unwrap();
        assert_eq!(
            value,
            json!({"seq": 2, "type": "start", "agent_id": "a1", "done": false})
        );

        let err = ServerEvent::error("boom");
        let value = serde_json::to_value(Envelope { seq: 3, event: &err }).unwrap();
        assert_eq!(value, json!({"seq": 3, "type": "error", "error": "boom"}));

        let summary = RunSummary {
            usage: Usage::new(1, 2),
            metadata: Metadata::new(),
        };
        let complete = ServerEvent::complete(summary);
        let value = serde_json::to_value(Envelope { seq: 4, event: &complete }).unwrap();
        assert_eq!(value["type"], "complete");
        assert_eq!(value["done"], true);
        assert_eq!(value["usage"]["total_tokens"], 3);
    }
}
