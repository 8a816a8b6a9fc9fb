//! Static agent catalog.
//!
//! Listing and detail lookups are side-effect free: the same id always
//! produces the same detail.

use serde::Serialize;

use crate::types::AgentDefaults;

/// Catalog entry as shown in listings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentSummary {
    /// Agent id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// What the agent is for.
    pub description: String,
    /// Model backing the agent.
    pub model: String,
    /// Availability.
    pub status: &'static str,
}

/// Full agent description.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentDetail {
    /// Agent id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// What the agent is for.
    pub description: String,
    /// Model backing the agent.
    pub model: String,
    /// Default sampling temperature.
    pub temperature: f64,
    /// Default completion length.
    pub max_tokens: u32,
    /// Availability.
    pub status: &'static str,
}

/// Built-in agents.
const BUILTIN: &[(&str, &str, &str)] = &[
    (
        "agent-1",
        "General Assistant",
        "General purpose AI assistant",
    ),
    (
        "agent-2",
        "Code Assistant",
        "Specialized in code generation and review",
    ),
];

const ACTIVE: &str = "active";

/// Read-only catalog of known agents.
#[derive(Debug, Clone)]
pub struct AgentCatalog {
    defaults: AgentDefaults,
}

impl AgentCatalog {
    /// Create a catalog reporting the given execution defaults.
    #[must_use]
    pub const fn new(defaults: AgentDefaults) -> Self {
        Self { defaults }
    }

    /// List all built-in agents.
    #[must_use]
    pub fn list(&self) -> Vec<AgentSummary> {
        BUILTIN
            .iter()
            .map(|(id, name, description)| AgentSummary {
                id: (*id).to_string(),
                name: (*name).to_string(),
                description: (*description).to_string(),
                model: self.defaults.model.clone(),
                status: ACTIVE,
            })
            .collect()
    }

    /// Describe an agent.
    ///
    /// Ids outside the built-in set resolve to a generic sample agent.
    #[must_use]
    pub fn get(&self, agent_id: &str) -> AgentDetail {
        let (name, description) = BUILTIN
            .iter()
            .find(|(id, _, _)| *id == agent_id)
            .map_or(("Sample Agent", "A sample agent"), |(_, name, description)| {
                (*name, *description)
            });

        AgentDetail {
            id: agent_id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            model: self.defaults.model.clone(),
            temperature: self.defaults.temperature,
            max_tokens: self.defaults.max_tokens,
            status: ACTIVE,
        }
    }
}
