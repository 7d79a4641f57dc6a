//! In-process broadcast hub.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::{mpsc, RwLock};
use tracing::trace;

use crate::{ConnectionId, PushTransport, ServerEvent};

/// In-process [`PushTransport`] implementation.
///
/// Keeps one unbounded delivery channel per registered connection plus the
/// transport-level group index. Group sets are never evicted once created;
/// empty groups persist for the process lifetime.
pub struct BroadcastHub {
    senders: RwLock<HashMap<ConnectionId, mpsc::UnboundedSender<ServerEvent>>>,
    groups: RwLock<HashMap<String, HashSet<ConnectionId>>>,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self {
            senders: RwLock::new(HashMap::new()),
            groups: RwLock::new(HashMap::new()),
        }
    }

    /// Register a connection and return the receiving end of its delivery
    /// channel. The caller owns the receiver; dropping it makes subsequent
    /// deliveries to this connection silent no-ops.
    pub async fn register(&self, connection: ConnectionId) -> mpsc::UnboundedReceiver<ServerEvent> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.senders.write().await.insert(connection, sender);
        receiver
    }

    /// Deliver an event to a single connection. Not part of the
    /// [`PushTransport`] capability; used by the gateway for per-connection
    /// replies (pong, join confirmations, error events).
    pub async fn send_to(&self, connection: ConnectionId, event: ServerEvent) {
        if let Some(sender) = self.senders.read().await.get(&connection) {
            let _ = sender.send(event);
        }
    }

    /// Current member count of a group.
    pub async fn group_size(&self, group: &str) -> usize {
        self.groups
            .read()
            .await
            .get(group)
            .map(HashSet::len)
            .unwrap_or(0)
    }

    async fn members_of(&self, group: &str) -> Vec<ConnectionId> {
        self.groups
            .read()
            .await
            .get(group)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    async fn deliver(&self, targets: &[ConnectionId], event: &ServerEvent) {
        let senders = self.senders.read().await;
        for target in targets {
            if let Some(sender) = senders.get(target) {
                let _ = sender.send(event.clone());
            }
        }
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PushTransport for BroadcastHub {
    async fn broadcast_to_group(&self, group: &str, event: ServerEvent) {
        let targets = self.members_of(group).await;
        trace!(group, members = targets.len(), "broadcasting to group");
        self.deliver(&targets, &event).await;
    }

    async fn broadcast_to_others(&self, group: &str, exclude: ConnectionId, event: ServerEvent) {
        let targets: Vec<ConnectionId> = self
            .members_of(group)
            .await
            .into_iter()
            .filter(|member| *member != exclude)
            .collect();
        trace!(group, members = targets.len(), "broadcasting to others in group");
        self.deliver(&targets, &event).await;
    }

    async fn add_to_group(&self, connection: ConnectionId, group: &str) {
        let mut groups = self.groups.write().await;
        for members in groups.values_mut() {
            members.remove(&connection);
        }
        groups.entry(group.to_string()).or_default().insert(connection);
    }

    async fn remove_connection(&self, connection: ConnectionId) {
        {
            let mut groups = self.groups.write().await;
            for members in groups.values_mut() {
                members.remove(&connection);
            }
        }
        self.senders.write().await.remove(&connection);
    }
}
