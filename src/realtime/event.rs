//! Wire messages exchanged over the shared run channel.
//!
//! Outbound traffic is limited to subscribe/unsubscribe control frames.
//! Inbound traffic is any JSON object; the channel routes on the presence of
//! a `run_id` field and recognizes a `{"type":"pong"}` liveness signal, so
//! inbound payloads stay untyped [`serde_json::Value`]s all the way to the
//! subscriber.

use serde::Serialize;
use serde_json::Value;

use crate::types::RunId;

/// Control frames the client sends to the backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlMessage {
    Subscribe { run_id: RunId },
    Unsubscribe { run_id: RunId },
}

impl ControlMessage {
    /// Render the frame as the JSON text sent over the socket.
    #[must_use]
    pub fn frame(&self) -> String {
        // A tagged enum of string ids cannot fail to serialize.
        serde_json::to_string(self).expect("control frame serialization")
    }
}

/// Extract the routing key of an inbound payload, if it carries one.
#[must_use]
pub fn run_id_of(payload: &Value) -> Option<RunId> {
    payload
        .get("run_id")
        .and_then(Value::as_str)
        .map(RunId::from)
}

/// Liveness pong: handled internally, never forwarded to subscribers.
#[must_use]
pub fn is_pong(payload: &Value) -> bool {
    payload.get("type").and_then(Value::as_str) == Some("pong")
}
