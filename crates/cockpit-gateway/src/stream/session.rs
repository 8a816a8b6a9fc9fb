//! One streaming session.
//!
//! ```text
//! Connected ──▶ Idle ◀──▶ Streaming
//!                 │           │
//!                 └──▶ Closed ◀┘
//! ```
//!
//! The session task owns the socket. While a run is streaming it also keeps
//! reading the socket: new frames are queued and handled in arrival order
//! once the run finishes, and a disconnect abandons the run.

use std::collections::VecDeque;
use std::fmt::Display;
use std::sync::Arc;

use axum::extract::ws::Message;
use futures::{Sink, SinkExt, Stream, StreamExt};

use cockpit_agent::{AgentFacade, AgentRunRequest, StreamChunk};
use cockpit_core::ConnectionId;

use super::protocol::{parse_frame, ClientAction, Envelope, ProtocolError, ServerEvent};

/// Frames that may wait behind a streaming run before the session is closed.
const MAX_QUEUED_FRAMES: usize = 64;

/// Protocol state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Accepted, not yet reading.
    Connected,
    /// Waiting for the next client message.
    Idle,
    /// A run is in progress.
    Streaming,
    /// Terminal.
    Closed,
}

/// A client frame that carries protocol data.
#[derive(Debug)]
enum Frame {
    Text(String),
    Binary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Close,
}

/// Protocol handler for one connection.
pub struct StreamSession<W> {
    id: ConnectionId,
    agent: Arc<dyn AgentFacade>,
    sink: W,
    seq: u64,
    state: SessionState,
    queued: VecDeque<Frame>,
}

impl<W> StreamSession<W>
where
    W: Sink<Message> + Unpin,
    W::Error: Display,
{
    /// Create a session writing events to `sink`.
    pub fn new(id: ConnectionId, agent: Arc<dyn AgentFacade>, sink: W) -> Self {
        Self {
            id,
            agent,
            sink,
            seq: 0,
            state: SessionState::Connected,
            queued: VecDeque::new(),
        }
    }

    /// Current protocol state.
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Serve `incoming` until the client disconnects or the socket fails.
    ///
    /// Returns the final state, which is always `Closed`.
    pub async fn run<R, E>(mut self, mut incoming: R) -> SessionState
    where
        R: Stream<Item = Result<Message, E>> + Unpin,
        E: Display,
    {
        self.state = SessionState::Idle;

        while let Some(frame) = self.next_frame(&mut incoming).await {
            if self.handle(frame, &mut incoming).await == Flow::Close {
                break;
            }
        }

        self.state = SessionState::Closed;
        if let Err(err) = self.sink.close().await {
            tracing::debug!(connection_id = %self.id, error = %err, "websocket close failed");
        }
        self.state
    }

    async fn next_frame<R, E>(&mut self, incoming: &mut R) -> Option<Frame>
    where
        R: Stream<Item = Result<Message, E>> + Unpin,
        E: Display,
    {
        match self.queued.pop_front() {
            Some(frame) => Some(frame),
            None => read_frame(self.id, incoming).await,
        }
    }

    async fn handle<R, E>(&mut self, frame: Frame, incoming: &mut R) -> Flow
    where
        R: Stream<Item = Result<Message, E>> + Unpin,
        E: Display,
    {
        let action = match frame {
            Frame::Text(text) => parse_frame(&text),
            Frame::Binary => Err(ProtocolError::BinaryFrame),
        };

        match action {
            Ok(ClientAction::Ping) => self.emit(&ServerEvent::Pong).await,
            Ok(ClientAction::Run(request)) => self.stream_run(*request, incoming).await,
            Err(err) => {
                tracing::debug!(connection_id = %self.id, error = %err, "websocket_protocol_error");
                self.emit(&err.to_event()).await
            }
        }
    }

    async fn stream_run<R, E>(&mut self, request: AgentRunRequest, incoming: &mut R) -> Flow
    where
        R: Stream<Item = Result<Message, E>> + Unpin,
        E: Display,
    {
        let agent_id = request.agent_id.clone();
        tracing::info!(connection_id = %self.id, agent_id = %agent_id, "websocket_agent_run");

        self.state = SessionState::Streaming;
        if self.emit(&ServerEvent::start(agent_id.as_str())).await == Flow::Close {
            return Flow::Close;
        }

        let mut chunks = self.agent.stream(request);
        let flow = loop {
            tokio::select! {
                chunk = chunks.next() => {
                    let (event, last) = match chunk {
                        Some(Ok(StreamChunk::Token(content))) => (ServerEvent::token(content), false),
                        Some(Ok(StreamChunk::Finished(summary))) => {
                            (ServerEvent::complete(summary), true)
                        }
                        Some(Err(err)) => {
                            tracing::error!(
                                connection_id = %self.id,
                                agent_id = %agent_id,
                                error = %err,
                                "websocket_agent_error"
                            );
                            (ServerEvent::failed(err.to_string()), true)
                        }
                        None => (ServerEvent::failed("agent stream ended before completion"), true),
                    };
                    if self.emit(&event).await == Flow::Close {
                        break Flow::Close;
                    }
                    if last {
                        break Flow::Continue;
                    }
                }
                frame = read_frame(self.id, incoming) => match frame {
                    Some(frame) if self.queued.len() < MAX_QUEUED_FRAMES => {
                        self.queued.push_back(frame);
                    }
                    Some(_) => {
                        tracing::warn!(connection_id = %self.id, "too many queued messages; closing");
                        break Flow::Close;
                    }
                    None => {
                        tracing::info!(
                            connection_id = %self.id,
                            agent_id = %agent_id,
                            "client disconnected during run"
                        );
                        break Flow::Close;
                    }
                },
            }
        };

        if flow == Flow::Continue {
            self.state = SessionState::Idle;
            tracing::info!(connection_id = %self.id, agent_id = %agent_id, "websocket_agent_complete");
        }
        flow
    }

    async fn emit(&mut self, event: &ServerEvent) -> Flow {
        let seq = self.seq + 1;
        let text = match serde_json::to_string(&Envelope { seq, event }) {
            Ok(text) => text,
            Err(err) => {
                tracing::error!(connection_id = %self.id, error = %err, "event serialization failed");
                return Flow::Continue;
            }
        };
        self.seq = seq;

        match self.sink.send(Message::Text(text)).await {
            Ok(()) => Flow::Continue,
            Err(err) => {
                tracing::debug!(connection_id = %self.id, error = %err, "websocket send failed");
                Flow::Close
            }
        }
    }
}

/// Read the next protocol frame, skipping control frames.
///
/// Returns `None` on close, transport error or end of stream.
async fn read_frame<R, E>(id: ConnectionId, incoming: &mut R) -> Option<Frame>
where
    R: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    while let Some(message) = incoming.next().await {
        match message {
            Ok(Message::Text(text)) => return Some(Frame::Text(text)),
            Ok(Message::Binary(_)) => return Some(Frame::Binary),
            Ok(Message::Ping(_) | Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                tracing::debug!(connection_id = %id, "client closed connection");
                return None;
            }
            Err(err) => {
                tracing::debug!(connection_id = %id, error = %err, "websocket read failed");
                return None;
            }
        }
    }
    None
}
