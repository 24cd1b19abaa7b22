//! Per-connection WebSocket handler.
//!
//! Keeps framing and heartbeats at the edge: the handshake resolves the
//! bearer credential through the `AuthVerifier` port, registers the
//! connection, and then the loop only keeps the peer alive — all pushed
//! traffic originates from the session registry. The public contract pings
//! every 5s and considers a connection idle after 10s without client
//! traffic. Tests shorten these intervals to speed up feedback.

use std::sync::Arc;
use std::time::{Duration, Instant};

use actix_ws::{CloseCode, CloseReason, Message, MessageStream, Session};
use async_trait::async_trait;
use tokio::time;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::ports::AuthVerifier;
use crate::inbound::ws::messages::ServerMessage;
use crate::inbound::ws::registry::{EventSink, SessionRegistry, SinkClosed};

/// Time between heartbeats to the client (5s in production, shorter in tests).
#[cfg(not(test))]
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
#[cfg(test)]
const HEARTBEAT_INTERVAL: Duration = Duration::from_millis(50);

/// Max idle time before disconnecting the client (10s in production, shorter in tests).
#[cfg(not(test))]
const CLIENT_TIMEOUT: Duration = Duration::from_secs(10);
#[cfg(test)]
const CLIENT_TIMEOUT: Duration = Duration::from_millis(100);

/// Send capability handed to the registry for one connection.
pub struct WsSink {
    session: Session,
}

impl WsSink {
    pub fn new(session: Session) -> Self {
        Self { session }
    }
}

#[async_trait]
impl EventSink for WsSink {
    async fn send(&mut self, frame: String) -> Result<(), SinkClosed> {
        self.session.text(frame).await.map_err(|_| SinkClosed)
    }
}

enum SessionEnd {
    ClientClosed(Option<CloseReason>),
    StreamClosed,
    HeartbeatTimeout,
    Protocol,
    Network,
}

pub(super) async fn handle_ws_session(
    verifier: Arc<dyn AuthVerifier>,
    registry: Arc<SessionRegistry<WsSink>>,
    mut session: Session,
    mut stream: MessageStream,
    token: Option<String>,
) {
    // Handshake: resolve the credential before the socket is good for
    // anything. Failures get an explicit frame and an immediate close — an
    // unauthenticated socket is never left open.
    let Some(user) = verifier.verify(token.as_deref()).await else {
        if let Some(frame) = (ServerMessage::AuthError {
            message: "Unauthorized".to_owned(),
        })
        .to_frame()
        {
            let _ = session.text(frame).await;
        }
        let _ = session
            .close(Some(CloseReason {
                code: CloseCode::Policy,
                description: Some("authentication failed".to_owned()),
            }))
            .await;
        return;
    };

    let connection = Uuid::new_v4();
    registry
        .register(user.id, connection, WsSink::new(session.clone()))
        .await;

    let ready = ServerMessage::Ready { user: user.clone() }.to_frame();
    let ready_sent = match ready {
        Some(frame) => session.text(frame).await.is_ok(),
        None => false,
    };
    if !ready_sent {
        registry.deregister(&user.id, &connection).await;
        return;
    }
    info!(user = %user.id, "websocket session ready");

    let end = pump(&mut session, &mut stream).await;
    registry.deregister(&user.id, &connection).await;

    match end {
        SessionEnd::ClientClosed(reason) => {
            let _ = session.close(reason).await;
        }
        SessionEnd::HeartbeatTimeout => {
            warn!(user = %user.id, "websocket heartbeat timeout; closing connection");
            let _ = session
                .close(Some(CloseReason {
                    code: CloseCode::Normal,
                    description: Some("heartbeat timeout".to_owned()),
                }))
                .await;
        }
        SessionEnd::Protocol => {
            let _ = session
                .close(Some(CloseReason {
                    code: CloseCode::Protocol,
                    description: Some("protocol error".to_owned()),
                }))
                .await;
        }
        SessionEnd::StreamClosed | SessionEnd::Network => {}
    }
}

/// Keep the connection alive until the peer leaves or goes quiet. Client
/// frames carry no application protocol; any traffic counts as liveness.
async fn pump(session: &mut Session, stream: &mut MessageStream) -> SessionEnd {
    let mut last_heartbeat = Instant::now();
    let mut heartbeat = time::interval(HEARTBEAT_INTERVAL);

    loop {
        tokio::select! {
            _ = heartbeat.tick() => {
                if Instant::now().duration_since(last_heartbeat) > CLIENT_TIMEOUT {
                    return SessionEnd::HeartbeatTimeout;
                }
                if session.ping(b"").await.is_err() {
                    return SessionEnd::Network;
                }
            }
            message = stream.recv() => {
                let Some(message) = message else {
                    return SessionEnd::StreamClosed;
                };
                match message {
                    Ok(Message::Ping(payload)) => {
                        last_heartbeat = Instant::now();
                        if session.pong(&payload).await.is_err() {
                            return SessionEnd::Network;
                        }
                    }
                    Ok(Message::Pong(_) | Message::Text(_) | Message::Binary(_)
                        | Message::Continuation(_) | Message::Nop) => {
                        last_heartbeat = Instant::now();
                    }
                    Ok(Message::Close(reason)) => {
                        return SessionEnd::ClientClosed(reason);
                    }
                    Err(protocol_error) => {
                        warn!(error = %protocol_error, "websocket protocol error");
                        return SessionEnd::Protocol;
                    }
                }
            }
        }
    }
}
