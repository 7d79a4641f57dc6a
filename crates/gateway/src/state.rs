//! Shared application state for the gateway.

use std::sync::Arc;

use relaycast_groups::{GroupHistory, GroupMembership};
use relaycast_pipeline::QueuePublisher;
use relaycast_transport::{BroadcastHub, PushTransport};

/// Shared state behind every gateway handler.
#[derive(Clone)]
pub struct GatewayState {
    /// Connection-to-group registry.
    pub membership: Arc<GroupMembership>,
    /// Per-group message history.
    pub history: Arc<GroupHistory>,
    /// In-process push transport.
    pub hub: Arc<BroadcastHub>,
    /// Producer handle for the enrichment queue.
    pub queue: QueuePublisher,
}

impl GatewayState {
    pub fn new(
        membership: Arc<GroupMembership>,
        history: Arc<GroupHistory>,
        hub: Arc<BroadcastHub>,
        queue: QueuePublisher,
    ) -> Self {
        Self {
            membership,
            history,
            hub,
            queue,
        }
    }

    /// The hub viewed as the push-transport capability.
    pub fn transport(&self) -> Arc<dyn PushTransport> {
        self.hub.clone()
    }
}
