//! Request and response types for agent execution.
//!
//! These are value objects: they carry no identity beyond the call that
//! produced them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AgentError, Result};

/// Free-form metadata attached to requests and responses.
pub type Metadata = serde_json::Map<String, Value>;

/// Upper bound accepted for `temperature`.
const MAX_TEMPERATURE: f64 = 2.0;

/// Author of a chat message.
///
/// Roles other than the four known ones (`function`, `developer`, ...) are
/// carried through unchanged for the engine to interpret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions that frame the conversation.
    System,
    /// The human caller.
    User,
    /// The agent.
    Assistant,
    /// Output of a tool invocation.
    Tool,
    /// Any other role name.
    #[serde(untagged)]
    Other(String),
}

/// One role-tagged chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Who wrote the message.
    pub role: Role,
    /// Message text.
    pub content: String,
    /// Optional author name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Message {
    /// Create a message with the given role.
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            name: None,
        }
    }

    /// Create a user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant message.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Request to run an agent over a message history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRunRequest {
    /// Agent to run.
    pub agent_id: String,
    /// Conversation so far, oldest first.
    pub messages: Vec<Message>,
    /// Optional system prompt prepended by the engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// Sampling temperature override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Completion length override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Tool declarations made available to the agent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Value>>,
    /// Caller metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl AgentRunRequest {
    /// Create a request with default execution parameters.
    #[must_use]
    pub fn new(agent_id: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            agent_id: agent_id.into(),
            messages,
            system_prompt: None,
            temperature: None,
            max_tokens: None,
            tools: None,
            metadata: None,
        }
    }

    /// Check the request shape before it reaches an engine.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::ValidationFailed` if the agent id is blank, there
    /// are no messages, the temperature is outside `[0, 2]`, or `max_tokens`
    /// is zero.
    pub fn validate(&self) -> Result<()> {
        if self.agent_id.trim().is_empty() {
            return Err(AgentError::ValidationFailed(
                "agent_id must not be empty".to_string(),
            ));
        }
        if self.messages.is_empty() {
            return Err(AgentError::ValidationFailed(
                "messages must contain at least one message".to_string(),
            ));
        }
        if let Some(t) = self.temperature {
            if !(0.0..=MAX_TEMPERATURE).contains(&t) {
                return Err(AgentError::ValidationFailed(format!(
                    "temperature must be between 0 and {MAX_TEMPERATURE}, got {t}"
                )));
            }
        }
        if self.max_tokens == Some(0) {
            return Err(AgentError::ValidationFailed(
                "max_tokens must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Token accounting for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens consumed by the prompt.
    pub prompt_tokens: u32,
    /// Tokens produced in the reply.
    pub completion_tokens: u32,
    /// Always `prompt_tokens + completion_tokens`.
    pub total_tokens: u32,
}

impl Usage {
    /// Build usage from its two components.
    #[must_use]
    pub const fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }
}

/// Complete reply to a synchronous run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRunResponse {
    /// Agent that produced the reply.
    pub agent_id: String,
    /// The reply, always with `role == assistant`.
    pub message: Message,
    /// Token accounting.
    pub usage: Usage,
    /// Engine metadata (model, temperature, ...).
    pub metadata: Metadata,
    /// Wall-clock execution time.
    pub duration_ms: f64,
}

/// Terminal summary of a streamed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Token accounting.
    pub usage: Usage,
    /// Engine metadata.
    pub metadata: Metadata,
}

/// One unit produced by a streamed run.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamChunk {
    /// An output increment.
    Token(String),
    /// The run finished; always the last item of a successful stream.
    Finished(RunSummary),
}

/// Execution defaults applied when a request does not override them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDefaults {
    /// Model name reported in metadata.
    #[serde(default = "AgentDefaults::default_model")]
    pub model: String,
    /// Default sampling temperature.
    #[serde(default = "AgentDefaults::default_temperature")]
    pub temperature: f64,
    /// Default completion length.
    #[serde(default = "AgentDefaults::default_max_tokens")]
    pub max_tokens: u32,
}

impl AgentDefaults {
    fn default_model() -> String {
        "gpt-4".to_string()
    }

    const fn default_temperature() -> f64 {
        0.7
    }

    const fn default_max_tokens() -> u32 {
        2000
    }
}

impl Default for AgentDefaults {
    fn default() -> Self {
        Self {
            model: Self::default_model(),
            temperature: Self::default_temperature(),
            max_tokens: Self::default_max_tokens(),
        }
    }
}
