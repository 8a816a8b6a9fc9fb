//! Stand-in execution engine.
//!
//! Replies with fixed text so the gateway can be exercised end to end
//! before a real engine is wired in.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde_json::Value;

use crate::error::{AgentError, Result};
use crate::facade::{AgentFacade, AgentStream};
use crate::types::{
    AgentDefaults, AgentRunRequest, AgentRunResponse, Message, Metadata, RunSummary, StreamChunk,
    Usage,
};

const RUN_REPLY: &str = "This is a mock response. Agent engine integration pending.";
const STREAM_REPLY: &str = "This is a mock streaming response from the agent engine.";

/// Deterministic agent used until a real engine is integrated.
#[derive(Debug, Clone)]
pub struct MockAgent {
    defaults: AgentDefaults,
    latency: Duration,
    token_delay: Duration,
}

impl MockAgent {
    /// Create a mock with simulated latency (100 ms per run, 50 ms per token).
    #[must_use]
    pub fn new(defaults: AgentDefaults) -> Self {
        Self {
            defaults,
            latency: Duration::from_millis(100),
            token_delay: Duration::from_millis(50),
        }
    }

    /// Create a mock that answers immediately.
    #[must_use]
    pub fn instant(defaults: AgentDefaults) -> Self {
        Self::new(defaults)
            .with_latency(Duration::ZERO)
            .with_token_delay(Duration::ZERO)
    }

    /// Override the simulated latency of `run`.
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Override the delay before each streamed token.
    #[must_use]
    pub const fn with_token_delay(mut self, delay: Duration) -> Self {
        self.token_delay = delay;
        self
    }

    /// The execution defaults in use.
    #[must_use]
    pub const fn defaults(&self) -> &AgentDefaults {
        &self.defaults
    }

    fn metadata_for(&self, request: &AgentRunRequest) -> Metadata {
        let mut metadata = Metadata::new();
        metadata.insert("model".into(), Value::from(self.defaults.model.clone()));
        metadata.insert(
            "temperature".into(),
            Value::from(request.temperature.unwrap_or(self.defaults.temperature)),
        );
        metadata.insert(
            "max_tokens".into(),
            Value::from(request.max_tokens.unwrap_or(self.defaults.max_tokens)),
        );
        if let Some(caller) = &request.metadata {
            metadata.insert("request_metadata".into(), Value::Object(caller.clone()));
        }
        metadata
    }

    fn reply_words(&self, request: &AgentRunRequest, text: &str) -> Vec<String> {
        let limit = request.max_tokens.unwrap_or(self.defaults.max_tokens) as usize;
        text.split_whitespace()
            .take(limit)
            .map(str::to_string)
            .collect()
    }
}

/// Whitespace-separated word count, used as a token estimate.
fn count_words(text: &str) -> u32 {
    u32::try_from(text.split_whitespace().count()).unwrap_or(u32::MAX)
}

fn prompt_tokens(request: &AgentRunRequest) -> u32 {
    let system = request.system_prompt.as_deref().map_or(0, count_words);
    request
        .messages
        .iter()
        .map(|m| count_words(&m.content))
        .fold(system, u32::saturating_add)
}

#[async_trait]
impl AgentFacade for MockAgent {
    async fn run(&self, request: AgentRunRequest) -> Result<AgentRunResponse> {
        request.validate()?;
        let started = Instant::now();
        tracing::info!(agent_id = %request.agent_id, "agent_run_request");

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let content = self.reply_words(&request, RUN_REPLY).join(" ");
        let usage = Usage::new(prompt_tokens(&request), count_words(&content));
        let response = AgentRunResponse {
            metadata: self.metadata_for(&request),
            message: Message::assistant(content),
            usage,
            duration_ms: started.elapsed().as_secs_f64() * 1000.0,
            agent_id: request.agent_id,
        };

        tracing::info!(
            agent_id = %response.agent_id,
            duration_ms = response.duration_ms,
            "agent_run_complete"
        );
        Ok(response)
    }

    fn stream(&self, request: AgentRunRequest) -> AgentStream {
        if let Err(err) = request.validate() {
            return Box::pin(stream::once(async move { Err::<StreamChunk, _>(err) }));
        }

        let words = self.reply_words(&request, STREAM_REPLY);
        let completion = u32::try_from(words.len()).unwrap_or(u32::MAX);
        let summary = RunSummary {
            usage: Usage::new(prompt_tokens(&request), completion),
            metadata: self.metadata_for(&request),
        };
        let delay = self.token_delay;

        let tokens = stream::iter(words).then(move |word| async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            Ok::<_, AgentError>(StreamChunk::Token(format!("{word} ")))
        });
        let finished = stream::once(async move { Ok(StreamChunk::Finished(summary)) });

        Box::pin(tokens.chain(finished))
    }
}
