//! WebSocket streaming against a real listener.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, HeaderValue, StatusCode};
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use cockpit_agent::MockAgent;
use cockpit_auth::SharedSecret;
use cockpit_gateway::{create_router, AuditRecorder, GatewayConfig, GatewayState};

const TOKEN: &str = "stream-secret";

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn spawn_gateway() -> (SocketAddr, GatewayState) {
    let mut config = GatewayConfig::default();
    config.api_token = SharedSecret::new(TOKEN);
    config.audit.enabled = false;
    let agent = Arc::new(MockAgent::instant(config.agent.clone()));
    let state = GatewayState::new(config, agent, AuditRecorder::disabled());
    let app = create_router(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });
    (addr, state)
}

async fn connect(addr: SocketAddr) -> Client {
    let mut request = format!("ws://{addr}/api/agents/stream")
        .into_client_request()
        .unwrap();
    request.headers_mut().insert(
        header::AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {TOKEN}")).unwrap(),
    );
    let (socket, _) = connect_async(request).await.unwrap();
    socket
}

async fn send(client: &mut Client, value: Value) {
    client.send(Message::Text(value.to_string())).await.unwrap();
}

async fn recv(client: &mut Client) -> Value {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), client.next())
            .await
            .expect("timed out waiting for event")
            .expect("stream ended")
            .unwrap();
        if let Message::Text(text) = frame {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

/// Read events until `complete` or a terminal error.
async fn recv_run(client: &mut Client) -> Vec<Value> {
    let mut events = Vec::new();
    loop {
        let event = recv(client).await;
        let done = event["done"] == true;
        events.push(event);
        if done {
            return events;
        }
    }
}

fn run_frame(agent_id: &str) -> Value {
    json!({
        "action": "run",
        "agent_id": agent_id,
        "messages": [{"role": "user", "content": "hello there"}]
    })
}

#[tokio::test]
async fn ping_gets_pong() {
    let (addr, _state) = spawn_gateway().await;
    let mut client = connect(addr).await;

    send(&mut client, json!({"action": "ping"})).await;
    assert_eq!(recv(&mut client).await, json!({"seq": 1, "type": "pong"}));
}

#[tokio::test]
async fn run_streams_start_tokens_complete() {
    let (addr, _state) = spawn_gateway().await;
    let mut client = connect(addr).await;

    send(&mut client, run_frame("a1")).await;
    let events = recv_run(&mut client).await;

    assert_eq!(events.first().unwrap()["type"], "start");
    assert_eq!(events.first().unwrap()["agent_id"], "a1");
    let last = events.last().unwrap();
    assert_eq!(last["type"], "complete");
    assert_eq!(last["done"], true);
    assert!(events[1..events.len() - 1]
        .iter()
        .all(|e| e["type"] == "token" && e["done"] == false));

    let seqs: Vec<u64> = events.iter().map(|e| e["seq"].as_u64().unwrap()).collect();
    let expected: Vec<u64> = (1..=seqs.len() as u64).collect();
    assert_eq!(seqs, expected);
}

#[tokio::test]
async fn unknown_action_keeps_session_open() {
    let (addr, _state) = spawn_gateway().await;
    let mut client = connect(addr).await;

    send(&mut client, json!({"action": "dance"})).await;
    let event = recv(&mut client).await;
    assert_eq!(event["type"], "error");
    assert_eq!(event["error"], "Unknown action: dance");

    send(&mut client, json!({"action": "ping"})).await;
    assert_eq!(recv(&mut client).await["type"], "pong");
}

#[tokio::test]
async fn second_run_is_served_after_first() {
    let (addr, _state) = spawn_gateway().await;
    let mut client = connect(addr).await;

    send(&mut client, run_frame("first")).await;
    send(&mut client, run_frame("second")).await;

    let first = recv_run(&mut client).await;
    let second = recv_run(&mut client).await;
    assert_eq!(first[0]["agent_id"], "first");
    assert_eq!(first.last().unwrap()["type"], "complete");
    assert_eq!(second[0]["agent_id"], "second");
    assert_eq!(second.last().unwrap()["type"], "complete");
    assert_eq!(
        second[0]["seq"].as_u64().unwrap(),
        first.last().unwrap()["seq"].as_u64().unwrap() + 1
    );
}

#[tokio::test]
async fn upgrade_without_token_is_refused() {
    let (addr, _state) = spawn_gateway().await;
    let request = format!("ws://{addr}/api/agents/stream")
        .into_client_request()
        .unwrap();

    match connect_async(request).await {
        Err(WsError::Http(response)) => {
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("upgrade should have been refused"),
    }
}

#[tokio::test]
async fn closed_connection_leaves_registry() {
    let (addr, state) = spawn_gateway().await;
    let mut client = connect(addr).await;

    send(&mut client, json!({"action": "ping"})).await;
    recv(&mut client).await;
    assert_eq!(state.sessions.len(), 1);

    client.close(None).await.unwrap();
    drop(client);

    for _ in 0..100 {
        if state.sessions.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(state.sessions.is_empty());
}
