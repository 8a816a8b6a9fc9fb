//! Agent execution facade for the cockpit gateway.
//!
//! This crate is the boundary between the gateway and whatever engine
//! actually produces agent replies. Both the synchronous `POST /api/agents/run`
//! endpoint and the WebSocket streaming session call the same
//! [`AgentFacade`] trait.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Gateway (HTTP/WS)                       │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     AgentFacade (trait)                     │
//! │  ┌─────────────────┐ ┌─────────────────┐ ┌───────────────┐  │
//! │  │   run()         │ │   stream()      │ │   ready()     │  │
//! │  │   one response  │ │   tokens + sum  │ │   probe       │  │
//! │  └─────────────────┘ └─────────────────┘ └───────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//!                     ┌─────────────────┐
//!                     │    MockAgent    │
//!                     │ (stand-in for   │
//!                     │  a real engine) │
//!                     └─────────────────┘
//! ```
//!
//! # Usage
//!
//! ```
//! use cockpit_agent::{AgentDefaults, AgentFacade, AgentRunRequest, Message, MockAgent};
//!
//! # async fn example() -> Result<(), cockpit_agent::AgentError> {
//! let agent = MockAgent::new(AgentDefaults::default());
//! let request = AgentRunRequest::new("agent-1", vec![Message::user("hi")]);
//! let response = agent.run(request).await?;
//!
//! assert_eq!(
//!     response.usage.total_tokens,
//!     response.usage.prompt_tokens + response.usage.completion_tokens
//! );
//! # Ok(())
//! # }
//! ```
//!
//! The facade never retries; retry policy belongs to the engine behind it.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod catalog;
pub mod error;
pub mod facade;
pub mod mock;
pub mod types;

pub use catalog::{AgentCatalog, AgentDetail, AgentSummary};
pub use error::{AgentError, Result};
pub use facade::{AgentFacade, AgentStream};
pub use mock::MockAgent;
pub use types::{
    AgentDefaults, AgentRunRequest, AgentRunResponse, Message, Metadata, Role, RunSummary,
    StreamChunk, Usage,
};
