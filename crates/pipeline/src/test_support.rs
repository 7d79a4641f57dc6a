//! Test doubles shared by the pipeline's own tests and downstream crates.

use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::queue::{QueueConsumer, QueueMessage};

/// Scripted consumer: yields a fixed set of payloads, then `None`, and
/// records every acknowledgement.
pub struct ScriptedQueue {
    messages: Mutex<VecDeque<String>>,
    acked: Mutex<Vec<String>>,
}

impl ScriptedQueue {
    pub fn new(payloads: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            messages: Mutex::new(payloads.into_iter().map(Into::into).collect()),
            acked: Mutex::new(Vec::new()),
        }
    }

    /// Payloads acknowledged so far, in acknowledgement order.
    pub async fn acked(&self) -> Vec<String> {
        self.acked.lock().await.clone()
    }
}

#[async_trait]
impl QueueConsumer for ScriptedQueue {
    async fn next(&self) -> Option<QueueMessage> {
        self.messages
            .lock()
            .await
            .pop_front()
            .map(|payload| QueueMessage { payload })
    }

    async fn ack(&self, message: QueueMessage) {
        self.acked.lock().await.push(message.payload);
    }
}
