//! Wire-level message definitions for the WebSocket adapter.
//!
//! Every server-to-client frame is one JSON object tagged by `type`.

use serde::Serialize;
use tracing::warn;

use crate::domain::{TaskUpdate, User};

/// Outbound frames emitted to connected clients.
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Handshake succeeded; carries the resolved identity.
    #[serde(rename = "ready")]
    Ready { user: User },
    /// Handshake failed; the socket closes right after this frame.
    #[serde(rename = "auth_error")]
    AuthError { message: String },
    /// A mutation touched a task visible to this session.
    #[serde(rename = "task:update")]
    TaskUpdate {
        #[serde(flatten)]
        update: TaskUpdate,
    },
}

impl ServerMessage {
    /// Serialise to the wire form, or `None` if serialisation fails (logged;
    /// the frame is simply not sent).
    pub fn to_frame(&self) -> Option<String> {
        match serde_json::to_string(self) {
            Ok(frame) => Some(frame),
            Err(error) => {
                warn!(error = %error, "failed to serialise websocket frame");
                None
            }
        }
    }
}
