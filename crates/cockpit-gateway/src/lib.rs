//! HTTP and WebSocket gateway for the cockpit agent platform.
//!
//! This crate is the public-facing entry point for running agents. It
//! handles:
//!
//! - Bearer token authentication against a shared secret
//! - Per-client rate limiting and request body limits
//! - Append-only audit logging of every call
//! - Correlation ids and processing time on every response
//! - REST endpoints for listing and running agents
//! - WebSocket streaming of agent output
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Clients                              │
//! │                   (HTTP / WebSocket)                        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     cockpit-gateway                         │
//! │  ┌───────────────────────────────────────────────────────┐  │
//! │  │ Pipeline: body size → auth → rate limit               │  │
//! │  │           (audit + instrumentation around it all)     │  │
//! │  └───────────────────────────────────────────────────────┘  │
//! │  ┌─────────────┐ ┌─────────────┐ ┌─────────────────────┐    │
//! │  │   Health    │ │   Agents    │ │  Streaming session  │    │
//! │  │  handlers   │ │  handlers   │ │  (WebSocket)        │    │
//! │  └─────────────┘ └─────────────┘ └─────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//!                    ┌──────────────────┐
//!                    │   AgentFacade    │
//!                    │ (cockpit-agent)  │
//!                    └──────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::net::SocketAddr;
//! use std::sync::Arc;
//!
//! use cockpit_agent::MockAgent;
//! use cockpit_gateway::{create_router, AuditRecorder, GatewayConfig, GatewayState};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = GatewayConfig::from_env()?;
//! let audit = AuditRecorder::spawn(&config.audit.path).await?;
//! let agent = Arc::new(MockAgent::new(config.agent.clone()));
//!
//! let state = GatewayState::new(config, agent, audit);
//! let app = create_router(state);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8000").await?;
//! axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod audit;
pub mod config;
pub mod context;
pub mod error;
pub mod handlers;
pub mod instrument;
pub mod metrics;
pub mod pipeline;
pub mod routes;
pub mod state;
pub mod stream;

pub use audit::{AuditRecord, AuditRecorder};
pub use config::{ConfigError, GatewayConfig};
pub use context::RequestContext;
pub use error::ApiError;
pub use metrics::{Metrics, MetricsSnapshot};
pub use pipeline::{Decision, Gate, Pipeline};
pub use routes::create_router;
pub use state::GatewayState;
pub use stream::{SessionRegistry, SessionState, StreamSession};
