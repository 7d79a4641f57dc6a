//! # Relaycast Pipeline Crate
//!
//! The asynchronous enrichment pipeline: a pool of workers drains queued chat
//! payloads, optionally calls the generative-text backend under a bounded
//! deadline and retry policy, and broadcasts exactly one `newMessage` event
//! per consumed payload.
//!
//! Ordering note: this path is decoupled from the direct-send path in the
//! gateway. An augmented reply may arrive after later, unrelated direct
//! messages; no cross-path ordering is guaranteed.

pub mod client;
pub mod payload;
pub mod queue;
pub mod test_support;
pub mod worker;

pub use client::{
    AugmentationClient, AugmentationError, CompletionRequest, HttpAugmentationClient,
};
pub use payload::{InboundPayload, AUGMENTATION_MARKER};
pub use queue::{
    channel_queue, ChannelQueueConsumer, QueueConsumer, QueueError, QueueMessage, QueuePublisher,
};
pub use worker::{
    EnrichmentPipeline, PipelineOptions, BACKEND_ERROR_TEXT, CONFIG_ERROR_TEXT,
    DECODE_FAILURE_TEXT, NO_CONTENT_TEXT, TIMEOUT_TEXT,
};
