//! # Relaycast Transport Crate
//!
//! The push-transport capability consumed by the chat session and the
//! enrichment pipeline, the outbound event vocabulary, and the in-process
//! [`BroadcastHub`] implementation used by the WebSocket gateway.

pub mod hub;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

pub use hub::BroadcastHub;
pub use relaycast_groups::ConnectionId;

/// Events delivered to connected clients, serialized as tagged JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerEvent {
    /// Sent once after a connection registers.
    #[serde(rename_all = "camelCase")]
    Hello { connection_id: String },
    /// Heartbeat response.
    Pong,
    /// Join confirmation.
    Joined { group: String },
    /// A chat message, either relayed directly or produced by the
    /// enrichment pipeline.
    #[serde(rename_all = "camelCase")]
    NewMessage {
        user_name: String,
        client_timestamp: String,
        server_timestamp: String,
        text: String,
    },
    /// An operation failed; `error` is a stable code, `message` is human
    /// readable.
    Error { error: String, message: String },
}

impl ServerEvent {
    /// Build a `newMessage` event. The server timestamp is stamped here so
    /// every emitting path shares the same authority; the client timestamp is
    /// relayed verbatim and never interpreted.
    pub fn new_message(
        user_name: impl Into<String>,
        client_timestamp: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self::NewMessage {
            user_name: user_name.into(),
            client_timestamp: client_timestamp.into(),
            server_timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            text: text.into(),
        }
    }
}

/// Capability for delivering events to the members of a group.
///
/// Implementations never surface delivery failures to callers: a member whose
/// receiving side is gone is simply skipped.
#[async_trait]
pub trait PushTransport: Send + Sync {
    /// Deliver `event` to every member of `group`.
    async fn broadcast_to_group(&self, group: &str, event: ServerEvent);

    /// Deliver `event` to every member of `group` except `exclude`.
    async fn broadcast_to_others(&self, group: &str, exclude: ConnectionId, event: ServerEvent);

    /// Add `connection` to `group` at the transport level. A connection
    /// belongs to at most one transport group; moving it removes it from the
    /// previous one.
    async fn add_to_group(&self, connection: ConnectionId, group: &str);

    /// Remove `connection` from the transport entirely (its group and its
    /// delivery channel).
    async fn remove_connection(&self, connection: ConnectionId);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_message_serializes_with_camel_case_tag_and_fields() {
        let event = ServerEvent::NewMessage {
            user_name: "alice".into(),
            client_timestamp: "c-ts".into(),
            server_timestamp: "s-ts".into(),
            text: "hello".into(),
        };

        let json = serde_json::to_value(&event).expect("serialize");
        assert_eq!(json["type"], "newMessage");
        assert_eq!(json["userName"], "alice");
        assert_eq!(json["clientTimestamp"], "c-ts");
        assert_eq!(json["serverTimestamp"], "s-ts");
        assert_eq!(json["text"], "hello");
    }

    #[test]
    fn new_message_constructor_stamps_server_timestamp() {
        let event = ServerEvent::new_message("alice", "client-ts", "hi");

        match event {
            ServerEvent::NewMessage {
                client_timestamp,
                server_timestamp,
                ..
            } => {
                assert_eq!(client_timestamp, "client-ts");
                assert!(!server_timestamp.is_empty());
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
