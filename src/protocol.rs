//! Message framing over the chat socket.
//!
//! Inbound frames are one of three things: the literal end-of-response
//! marker, a `session_started` control object, or a raw text fragment.
//! Outbound frames are always a single `{"message": ...}` object.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Sentinel sent by the backend when the AI has finished its turn.
pub const END_OF_RESPONSE: &str = "[END_OF_RESPONSE]";

/// Control message type announcing a freshly started session.
pub const SESSION_STARTED: &str = "session_started";

/// WebSocket normal closure.
pub const NORMAL_CLOSURE: u16 = 1000;

/// Close reason sent when the user disconnects.
pub const CLIENT_DISCONNECT_REASON: &str = "Client disconnect";

// -- Inbound ----------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    EndOfResponse,
    SessionStarted { session_id: Option<String> },
    Fragment(String),
}

/// Classify a raw inbound frame.
///
/// Parse failures are not errors. Anything that is not the marker or the
/// `session_started` object is a fragment, JSON or not. Only `type` decides;
/// the other fields of a control object may have any shape.
pub fn classify(raw: &str) -> InboundFrame {
    if raw == END_OF_RESPONSE {
        return InboundFrame::EndOfResponse;
    }

    if let Ok(value) = serde_json::from_str::<Value>(raw) {
        if value.get("type").and_then(Value::as_str) == Some(SESSION_STARTED) {
            return InboundFrame::SessionStarted {
                session_id: value
                    .get("session_id")
                    .and_then(Value::as_str)
                    .map(String::from),
            };
        }
    }

    InboundFrame::Fragment(raw.to_string())
}

// -- Outbound ---------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub message: String,
}

impl OutboundMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// A close the client wants the transport to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseRequest {
    pub code: u16,
    pub reason: String,
}

impl CloseRequest {
    pub fn client_disconnect() -> Self {
        Self {
            code: NORMAL_CLOSURE,
            reason: CLIENT_DISCONNECT_REASON.to_string(),
        }
    }
}
