//! WebSocket streaming handler.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::WebSocket;
use axum::extract::{ConnectInfo, State, WebSocketUpgrade};
use axum::response::Response;
use axum::Extension;
use chrono::Utc;
use futures::StreamExt;

use cockpit_agent::AgentFacade;
use cockpit_core::{ConnectionId, RequestId};

use crate::context::UNKNOWN_CLIENT;
use crate::state::GatewayState;
use crate::stream::{SessionInfo, SessionRegistry, StreamSession};

/// WebSocket upgrade handler for `GET /api/agents/stream`.
///
/// Authentication and rate limiting have already been applied to the
/// upgrade request by the pipeline.
pub async fn stream_agent(
    ws: WebSocketUpgrade,
    State(state): State<GatewayState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    request_id: Option<Extension<RequestId>>,
) -> Response {
    let info = SessionInfo {
        client: peer.map_or_else(
            || UNKNOWN_CLIENT.to_string(),
            |ConnectInfo(addr)| addr.ip().to_string(),
        ),
        request_id: request_id.map(|Extension(id)| id),
        connected_at: Utc::now(),
    };
    let agent = Arc::clone(&state.agent);
    let sessions = state.sessions.clone();

    ws.on_upgrade(move |socket| handle_socket(socket, agent, sessions, info))
}

/// Serve one upgraded connection until it closes.
async fn handle_socket(
    socket: WebSocket,
    agent: Arc<dyn AgentFacade>,
    sessions: SessionRegistry,
    info: SessionInfo,
) {
    let id = ConnectionId::generate();
    let client = info.client.clone();
    let _registration = sessions.register(id, info);
    tracing::info!(
        connection_id = %id,
        client = %client,
        total_connections = sessions.len(),
        "websocket_connected"
    );

    let (sink, incoming) = socket.split();
    StreamSession::new(id, agent, sink).run(incoming).await;

    tracing::info!(connection_id = %id, "websocket_disconnected");
}
