//! Service identity endpoints.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::GatewayState;

/// `GET /` response.
#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    /// Service name.
    pub name: String,
    /// Service version.
    pub version: String,
    /// Deployment environment.
    pub environment: String,
    /// Always `operational` while the process serves requests.
    pub status: &'static str,
    /// API documentation location.
    pub docs: &'static str,
}

/// Paths of the main API areas.
#[derive(Debug, Serialize)]
pub struct Endpoints {
    /// Health family.
    pub health: &'static str,
    /// Agent endpoints.
    pub agents: &'static str,
    /// WebSocket streaming endpoint.
    pub stream: &'static str,
    /// API documentation location.
    pub docs: &'static str,
}

/// `GET /api` response.
#[derive(Debug, Serialize)]
pub struct ApiInfo {
    /// Service name.
    pub name: String,
    /// Service version.
    pub version: String,
    /// Where things live.
    pub endpoints: Endpoints,
}

/// Interactive API documentation is not served by this gateway.
const DOCS: &str = "disabled";

/// Root endpoint.
pub async fn root(State(state): State<GatewayState>) -> Json<ServiceInfo> {
    Json(ServiceInfo {
        name: state.config.app_name.clone(),
        version: state.config.app_version.clone(),
        environment: state.config.environment.clone(),
        status: "operational",
        docs: DOCS,
    })
}

/// API information endpoint.
pub async fn api_info(State(state): State<GatewayState>) -> Json<ApiInfo> {
    Json(ApiInfo {
        name: state.config.app_name.clone(),
        version: state.config.app_version.clone(),
        endpoints: Endpoints {
            health: "/api/health",
            agents: "/api/agents",
            stream: "/api/agents/stream",
            docs: DOCS,
        },
    })
}
