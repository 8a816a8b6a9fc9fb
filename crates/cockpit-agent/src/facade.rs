//! The agent facade trait.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::error::Result;
use crate::types::{AgentRunRequest, AgentRunResponse, StreamChunk};

/// Lazy, finite, single-use sequence of output increments.
///
/// A successful stream yields zero or more `StreamChunk::Token` items followed
/// by exactly one `StreamChunk::Finished`. An `Err` item ends the run.
/// Dropping the stream abandons the run.
pub type AgentStream = Pin<Box<dyn Stream<Item = Result<StreamChunk>> + Send>>;

/// Boundary to the agent execution engine.
///
/// Implementations must not retry on failure.
#[async_trait]
pub trait AgentFacade: Send + Sync {
    /// Execute a run and return the complete reply.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::ValidationFailed` for malformed requests and
    /// `AgentError::ExecutionFailed` if the engine fails.
    async fn run(&self, request: AgentRunRequest) -> Result<AgentRunResponse>;

    /// Start a streamed run.
    ///
    /// No work happens until the returned stream is polled.
    fn stream(&self, request: AgentRunRequest) -> AgentStream;

    /// Readiness probe for the engine behind the facade.
    ///
    /// # Errors
    ///
    /// Returns an error describing why the engine cannot take work.
    async fn ready(&self) -> Result<()> {
        Ok(())
    }
}
