//! Gateway application state.
//!
//! This module defines the shared state that is available to all request handlers.

use std::sync::Arc;

use cockpit_agent::{AgentCatalog, AgentFacade};

use crate::audit::AuditRecorder;
use crate::config::GatewayConfig;
use crate::metrics::Metrics;
use crate::stream::SessionRegistry;

/// Shared application state for the gateway.
///
/// Cloning is cheap: every field is a handle.
#[derive(Clone)]
pub struct GatewayState {
    /// Gateway configuration, fixed at startup.
    pub config: Arc<GatewayConfig>,
    /// The agent execution engine.
    pub agent: Arc<dyn AgentFacade>,
    /// Static agent catalog.
    pub catalog: AgentCatalog,
    /// Open streaming sessions.
    pub sessions: SessionRegistry,
    /// Request counters.
    pub metrics: Arc<Metrics>,
    /// Audit sink.
    pub audit: AuditRecorder,
}

impl GatewayState {
    /// Create a new gateway state.
    #[must_use]
    pub fn new(config: GatewayConfig, agent: Arc<dyn AgentFacade>, audit: AuditRecorder) -> Self {
        Self {
            catalog: AgentCatalog::new(config.agent.clone()),
            config: Arc::new(config),
            agent,
            sessions: SessionRegistry::new(),
            metrics: Arc::new(Metrics::new()),
            audit,
        }
    }
}
