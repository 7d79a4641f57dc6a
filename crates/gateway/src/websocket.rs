//! Chat WebSocket handler.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use relaycast_transport::{ConnectionId, ServerEvent};

use crate::session::ChatSession;
use crate::state::GatewayState;

/// Events received from WebSocket clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientEvent {
    /// Heartbeat to keep the connection alive.
    Ping,
    /// Join a group (or switch to a different one).
    #[serde(rename_all = "camelCase")]
    Join { group_name: String },
    /// Send a message to the current group.
    #[serde(rename_all = "camelCase")]
    Chat { user_name: String, message: String },
}

/// WebSocket upgrade endpoint.
pub async fn chat_websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<GatewayState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<GatewayState>) {
    let connection = ConnectionId::new();
    let mut events = state.hub.register(connection).await;
    let session = ChatSession::new(
        connection,
        state.membership.clone(),
        state.history.clone(),
        state.transport(),
    );

    debug!(connection = %connection, "chat websocket connected");

    let (mut sender, mut receiver) = socket.split();

    state
        .hub
        .send_to(
            connection,
            ServerEvent::Hello {
                connection_id: connection.to_string(),
            },
        )
        .await;

    // forward hub deliveries to the socket
    let send_task = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(error) => {
                    warn!(%error, "failed to serialize server event");
                    continue;
                }
            };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    // this task owns the session: client events are handled one at a time
    while let Some(Ok(message)) = receiver.next().await {
        match message {
            Message::Text(text) => match serde_json::from_str::<ClientEvent>(&text) {
                Ok(event) => handle_client_event(event, &session, &state).await,
                Err(error) => {
                    debug!(connection = %connection, %error, "unparseable client event");
                    state
                        .hub
                        .send_to(
                            connection,
                            ServerEvent::Error {
                                error: "INVALID_EVENT".to_string(),
                                message: "event could not be parsed".to_string(),
                            },
                        )
                        .await;
                }
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    session.disconnect().await;
    send_task.abort();
    debug!(connection = %connection, "chat websocket disconnected");
}

async fn handle_client_event(event: ClientEvent, session: &ChatSession, state: &GatewayState) {
    match event {
        ClientEvent::Ping => {
            state.hub.send_to(session.connection(), ServerEvent::Pong).await;
        }
        ClientEvent::Join { group_name } => {
            session.join(&group_name).await;
            state
                .hub
                .send_to(session.connection(), ServerEvent::Joined { group: group_name })
                .await;
        }
        ClientEvent::Chat { user_name, message } => {
            if let Err(error) = session.send(&user_name, &message).await {
                state
                    .hub
                    .send_to(
                        session.connection(),
                        ServerEvent::Error {
                            error: "NOT_IN_GROUP".to_string(),
                            message: error.to_string(),
                        },
                    )
                    .await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_events_deserialize_from_tagged_json() {
        let join: ClientEvent =
            serde_json::from_str(r#"{"type":"join","groupName":"g1"}"#).expect("join");
        assert!(matches!(join, ClientEvent::Join { group_name } if group_name == "g1"));

        let chat: ClientEvent =
            serde_json::from_str(r#"{"type":"chat","userName":"alice","message":"hi"}"#)
                .expect("chat");
        assert!(
            matches!(chat, ClientEvent::Chat { user_name, message } if user_name == "alice" && message == "hi")
        );

        let ping: ClientEvent = serde_json::from_str(r#"{"type":"ping"}"#).expect("ping");
        assert!(matches!(ping, ClientEvent::Ping));
    }

    #[test]
    fn unknown_event_types_are_rejected() {
        assert!(serde_json::from_str::<ClientEvent>(r#"{"type":"dance"}"#).is_err());
    }
}
