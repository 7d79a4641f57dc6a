//! Connection-to-group registry.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Opaque identifier for one live client connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Registry mapping each live connection to the group it belongs to.
///
/// Invariant: a connection is a member of at most one group at any time.
/// Joining while already a member replaces the previous membership.
pub struct GroupMembership {
    inner: RwLock<HashMap<ConnectionId, String>>,
}

impl GroupMembership {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    /// Record `connection` as a member of `group`, replacing any previous
    /// membership. Idempotent when re-joining the same group.
    pub async fn join(&self, connection: ConnectionId, group: impl Into<String>) {
        self.inner.write().await.insert(connection, group.into());
    }

    /// Remove the membership for `connection`, returning the group it was in.
    /// Unknown connections are a normal miss, not an error.
    pub async fn leave(&self, connection: ConnectionId) -> Option<String> {
        self.inner.write().await.remove(&connection)
    }

    /// Look up the group `connection` currently belongs to.
    pub async fn group_of(&self, connection: ConnectionId) -> Option<String> {
        self.inner.read().await.get(&connection).cloned()
    }
}

impl Default for GroupMembership {
    fn default() -> Self {
        Self::new()
    }
}
