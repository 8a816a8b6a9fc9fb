//! Cockpit Gateway - HTTP/WebSocket API Gateway
//!
//! This is the main entry point for the gateway service. Configuration is
//! read once from the environment; see `GatewayConfig::from_lookup` for the
//! recognized variables.
//!
//! # Logging
//!
//! `RUST_LOG` controls the filter (default `info,cockpit=debug`). Set
//! `LOG_FORMAT=json` for one JSON object per log line.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cockpit_agent::{AgentFacade, MockAgent};
use cockpit_gateway::{create_router, AuditRecorder, GatewayConfig, GatewayState};

/// Shipped value of `API_TOKEN`; a warning is logged while it is in use.
const PLACEHOLDER_TOKEN: &str = "change-this-in-production";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    tracing::info!("Starting Cockpit Gateway");

    let config = GatewayConfig::from_env()?;
    tracing::info!(
        listen_addr = %config.listen_addr,
        environment = %config.environment,
        rate_limit_enabled = config.rate_limit.enabled,
        audit_enabled = config.audit.enabled,
        max_body_bytes = config.max_body_bytes,
        model = %config.agent.model,
        "Gateway configuration loaded"
    );
    if config.api_token.matches(PLACEHOLDER_TOKEN) {
        tracing::warn!("API_TOKEN is set to the placeholder value; set a real token before deploying");
    }

    let audit = if config.audit.enabled {
        match AuditRecorder::spawn(&config.audit.path).await {
            Ok(recorder) => recorder,
            Err(e) => {
                tracing::warn!(
                    path = %config.audit.path.display(),
                    error = %e,
                    "Failed to open audit log - continuing without it"
                );
                AuditRecorder::disabled()
            }
        }
    } else {
        AuditRecorder::disabled()
    };

    // Agent engine integration is pending; the mock answers in its place.
    let agent: Arc<dyn AgentFacade> = Arc::new(MockAgent::new(config.agent.clone()));
    tracing::warn!("Using mock agent engine");

    let listen_addr = config.listen_addr.clone();
    let state = GatewayState::new(config, agent, audit);
    let app = create_router(state);
    tracing::info!("Router configured with all API endpoints");

    tracing::info!(listen_addr = %listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Gateway stopped");
    Ok(())
}

fn init_tracing() {
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,cockpit=debug".into()),
        )
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
