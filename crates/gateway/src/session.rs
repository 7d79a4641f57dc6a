//! Per-connection chat protocol.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use relaycast_groups::{GroupHistory, GroupMembership, HistoryEntry};
use relaycast_transport::{ConnectionId, PushTransport, ServerEvent};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("not in a group")]
    NotInGroup,
}

/// One connection's view of the relay: join a group, send to it, leave on
/// disconnect.
///
/// All operations for a connection are issued by the single task that owns
/// its socket, so the registry update and the transport-level group update
/// inside [`join`](Self::join) are never interleaved with other operations of
/// the same connection.
pub struct ChatSession {
    connection: ConnectionId,
    membership: Arc<GroupMembership>,
    history: Arc<GroupHistory>,
    transport: Arc<dyn PushTransport>,
}

impl ChatSession {
    pub fn new(
        connection: ConnectionId,
        membership: Arc<GroupMembership>,
        history: Arc<GroupHistory>,
        transport: Arc<dyn PushTransport>,
    ) -> Self {
        Self {
            connection,
            membership,
            history,
            transport,
        }
    }

    pub fn connection(&self) -> ConnectionId {
        self.connection
    }

    /// Join `group`, switching from any previous group.
    pub async fn join(&self, group: &str) {
        self.transport.add_to_group(self.connection, group).await;
        self.membership.join(self.connection, group).await;
        debug!(connection = %self.connection, group, "joined group");
    }

    /// Record a message and relay it to the other members of the current
    /// group. The sender already rendered its own message locally, so it does
    /// not receive an echo on this path.
    pub async fn send(&self, user_name: &str, message: &str) -> Result<HistoryEntry, SessionError> {
        let group = self
            .membership
            .group_of(self.connection)
            .await
            .ok_or(SessionError::NotInGroup)?;

        let entry = self.history.append(&group, user_name, message).await;
        self.transport
            .broadcast_to_others(
                &group,
                self.connection,
                ServerEvent::new_message(user_name, "", message),
            )
            .await;
        Ok(entry)
    }

    /// Leave the registry and the transport. Terminal; the owning task drops
    /// the session afterwards.
    pub async fn disconnect(&self) {
        if let Some(group) = self.membership.leave(self.connection).await {
            debug!(connection = %self.connection, group, "left group on disconnect");
        }
        self.transport.remove_connection(self.connection).await;
    }
}
