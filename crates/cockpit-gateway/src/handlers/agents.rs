//! Agent endpoints.
//!
//! All of these require a valid bearer credential; the pipeline enforces it
//! before any handler runs.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use cockpit_agent::{AgentDetail, AgentRunRequest, AgentRunResponse, AgentSummary};

use crate::error::ApiError;
use crate::state::GatewayState;

/// Response for listing agents.
#[derive(Debug, Serialize)]
pub struct AgentListResponse {
    /// Catalog entries.
    pub agents: Vec<AgentSummary>,
    /// Number of entries.
    pub total: usize,
}

/// List agents.
///
/// `GET /api/agents/`
pub async fn list_agents(State(state): State<GatewayState>) -> Json<AgentListResponse> {
    let agents = state.catalog.list();
    Json(AgentListResponse {
        total: agents.len(),
        agents,
    })
}

/// Get agent details.
///
/// `GET /api/agents/:agent_id`
pub async fn get_agent(
    State(state): State<GatewayState>,
    Path(agent_id): Path<String>,
) -> Json<AgentDetail> {
    Json(state.catalog.get(&agent_id))
}

/// Run an agent and return the complete reply.
///
/// `POST /api/agents/run`
///
/// # Errors
///
/// Returns `ValidationFailed` (422) for malformed bodies or requests, and
/// `ExecutionFailed` (500) if the engine fails.
pub async fn run_agent(
    State(state): State<GatewayState>,
    payload: Result<Json<AgentRunRequest>, JsonRejection>,
) -> Result<Json<AgentRunResponse>, ApiError> {
    let Json(request) = payload?;
    request.validate()?;

    tracing::info!(
        agent_id = %request.agent_id,
        messages = request.messages.len(),
        "agent_run_request"
    );

    let response = state.agent.run(request).await?;
    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use cockpit_agent::{AgentDefaults, Message, MockAgent, Role};

    use super::*;
    use crate::audit::AuditRecorder;
    use crate::config::GatewayConfig;

    fn state() -> GatewayState {
        GatewayState::new(
            GatewayConfig::default(),
            Arc::new(MockAgent::instant(AgentDefaults::default())),
            AuditRecorder::disabled(),
        )
    }

    #[tokio::test]
    async fn list_reports_total() {
        let Json(body) = list_agents(State(state())).await;
        assert_eq!(body.total, body.agents.len());
        assert_eq!(body.total, 2);
    }

    #[tokio::test]
    async fn get_is_pure() {
        let Json(first) = get_agent(State(state()), Path("agent-1".into())).await;
        let Json(second) = get_agent(State(state()), Path("agent-1".into())).await;
        assert_eq!(first, second);
        assert_eq!(first.name, "General Assistant");
    }

    #[tokio::test]
    async fn run_returns_assistant_message() {
        let request = AgentRunRequest::new("a1", vec![Message::user("hi")]);
        let Json(response) = run_agent(State(state()), Ok(Json(request)))
            .await
            .unwrap();
        assert_eq!(response.message.role, Role::Assistant);
        assert!(response.duration_ms >= 0.0);
    }

    #[tokio::test]
    async fn run_rejects_invalid_request() {
        let request = AgentRunRequest::new("a1", Vec::new());
        let err = run_agent(State(state()), Ok(Json(request)))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::ValidationFailed(_)));
    }
}
