//! Queue capability and its in-process implementation.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tracing::trace;

/// One delivered payload. The text is opaque to the queue; decoding happens
/// in the pipeline.
#[derive(Debug)]
pub struct QueueMessage {
    pub payload: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("queue is full")]
    Full,
    #[error("queue is closed")]
    Closed,
}

/// Consumer side of the queue: at-least-once delivery, with an explicit ack
/// once the message has been fully handled.
#[async_trait]
pub trait QueueConsumer: Send + Sync {
    /// Next delivery, or `None` once the queue is closed and drained.
    async fn next(&self) -> Option<QueueMessage>;

    /// Settle a delivery. Called exactly once per message, after the
    /// resulting broadcast (or diagnostic) has been emitted.
    async fn ack(&self, message: QueueMessage);
}

/// Create a bounded in-process queue, returning the producer handle and a
/// cloneable consumer for the worker pool.
///
/// Closing the queue (dropping every publisher) initiates drain: consumers
/// keep receiving until the buffered messages are exhausted and then see
/// `None`. This is the shutdown policy - drain, then stop.
pub fn channel_queue(capacity: usize) -> (QueuePublisher, ChannelQueueConsumer) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        QueuePublisher { tx },
        ChannelQueueConsumer {
            rx: Arc::new(Mutex::new(rx)),
        },
    )
}

/// Producer handle for the in-process queue.
#[derive(Clone)]
pub struct QueuePublisher {
    tx: mpsc::Sender<String>,
}

impl QueuePublisher {
    /// Enqueue without waiting; fails when the queue is full or closed.
    /// Ingress endpoints use this so a saturated pipeline surfaces as
    /// backpressure instead of unbounded buffering.
    pub fn try_publish(&self, payload: impl Into<String>) -> Result<(), QueueError> {
        self.tx.try_send(payload.into()).map_err(|error| match error {
            mpsc::error::TrySendError::Full(_) => QueueError::Full,
            mpsc::error::TrySendError::Closed(_) => QueueError::Closed,
        })
    }

    /// Enqueue, waiting for capacity.
    pub async fn publish(&self, payload: impl Into<String>) -> Result<(), QueueError> {
        self.tx
            .send(payload.into())
            .await
            .map_err(|_| QueueError::Closed)
    }
}

/// Consumer over the in-process channel. Clones share the underlying
/// receiver, so a pool of workers drains one queue cooperatively.
#[derive(Clone)]
pub struct ChannelQueueConsumer {
    rx: Arc<Mutex<mpsc::Receiver<String>>>,
}

#[async_trait]
impl QueueConsumer for ChannelQueueConsumer {
    async fn next(&self) -> Option<QueueMessage> {
        let mut rx = self.rx.lock().await;
        rx.recv().await.map(|payload| QueueMessage { payload })
    }

    async fn ack(&self, message: QueueMessage) {
        // channel deliveries are consumed on receive; nothing to settle
        trace!(bytes = message.payload.len(), "acknowledged queue message");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn published_payloads_are_delivered_in_order() {
        let (publisher, consumer) = channel_queue(4);

        publisher.publish("one").await.expect("publish");
        publisher.publish("two").await.expect("publish");

        assert_eq!(consumer.next().await.expect("first").payload, "one");
        assert_eq!(consumer.next().await.expect("second").payload, "two");
    }

    #[tokio::test]
    async fn try_publish_reports_backpressure() {
        let (publisher, _consumer) = channel_queue(1);

        publisher.try_publish("fits").expect("first fits");
        assert_eq!(publisher.try_publish("overflow"), Err(QueueError::Full));
    }

    #[tokio::test]
    async fn dropped_publisher_drains_then_closes() {
        let (publisher, consumer) = channel_queue(4);

        publisher.publish("last").await.expect("publish");
        drop(publisher);

        assert_eq!(consumer.next().await.expect("drains buffered").payload, "last");
        assert!(consumer.next().await.is_none(), "closed after drain");
    }

    #[tokio::test]
    async fn publish_after_close_fails() {
        let (publisher, consumer) = channel_queue(4);
        drop(consumer);

        // the receiver half is gone, so the channel is closed
        assert_eq!(publisher.publish("late").await, Err(QueueError::Closed));
    }
}
