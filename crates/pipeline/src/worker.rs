//! The enrichment worker loop.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, error, info, warn};

use relaycast_config::{AugmentationConfig, RelayConfig};
use relaycast_transport::{PushTransport, ServerEvent};

use crate::client::{AugmentationClient, AugmentationError, CompletionRequest};
use crate::payload::InboundPayload;
use crate::queue::QueueConsumer;

/// Author name used for diagnostic broadcasts.
const SYSTEM_AUTHOR: &str = "System";

/// Broadcast text when a queued payload cannot be decoded.
pub const DECODE_FAILURE_TEXT: &str = "Error processing message";
/// Broadcast text when required augmentation configuration is absent.
pub const CONFIG_ERROR_TEXT: &str = "AI service configuration error";
/// Broadcast text when the final attempt hit the per-call deadline.
pub const TIMEOUT_TEXT: &str = "AI request timed out";
/// Broadcast text when the final attempt failed for any other reason.
pub const BACKEND_ERROR_TEXT: &str = "Error processing AI request";
/// Broadcast text when the backend answered without content.
pub const NO_CONTENT_TEXT: &str = "No response from AI service";

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub diagnostic_group: String,
    pub max_output_tokens: u32,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
    pub retry_max_delay: Duration,
    /// Hard ceiling on one backend attempt, composed with the HTTP client's
    /// own request timeout - whichever fires first aborts the attempt.
    pub call_deadline: Duration,
}

impl PipelineOptions {
    pub fn from_config(relay: &RelayConfig, augmentation: &AugmentationConfig) -> Self {
        Self {
            diagnostic_group: relay.diagnostic_group.clone(),
            max_output_tokens: augmentation.max_output_tokens,
            max_retries: augmentation.max_retries,
            retry_base_delay: Duration::from_millis(augmentation.retry_base_delay_ms),
            retry_max_delay: Duration::from_millis(augmentation.retry_max_delay_ms),
            call_deadline: Duration::from_secs(augmentation.request_timeout_seconds),
        }
    }
}

/// Queue consumer that turns each delivered payload into exactly one
/// broadcast: the original text for plain messages, generated text (or a
/// typed placeholder) for messages carrying the augmentation marker.
///
/// The loop never propagates a failure: malformed payloads produce a
/// diagnostic broadcast to the configured diagnostic group, backend failures
/// degrade to placeholder text, and the worker moves on to the next message.
pub struct EnrichmentPipeline {
    transport: Arc<dyn PushTransport>,
    client: Arc<dyn AugmentationClient>,
    options: PipelineOptions,
}

impl EnrichmentPipeline {
    pub fn new(
        transport: Arc<dyn PushTransport>,
        client: Arc<dyn AugmentationClient>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            transport,
            client,
            options,
        }
    }

    /// Drain `queue` until it closes. Every delivery is acknowledged exactly
    /// once, after its broadcast has been handed to the transport.
    pub async fn run<Q: QueueConsumer>(&self, queue: &Q) {
        info!("enrichment worker started");
        while let Some(message) = queue.next().await {
            self.process(&message.payload).await;
            queue.ack(message).await;
        }
        info!("queue closed, enrichment worker stopping");
    }

    async fn process(&self, raw: &str) {
        let payload = match InboundPayload::decode(raw) {
            Ok(payload) => payload,
            Err(error) => {
                warn!(%error, "failed to decode queued payload");
                self.transport
                    .broadcast_to_group(
                        &self.options.diagnostic_group,
                        ServerEvent::new_message(SYSTEM_AUTHOR, "", DECODE_FAILURE_TEXT),
                    )
                    .await;
                return;
            }
        };

        let text = if payload.wants_augmentation() {
            self.augment(&payload.message).await
        } else {
            payload.message.clone()
        };

        debug!(group = %payload.group_name, user = %payload.user_name, "emitting relay broadcast");
        self.transport
            .broadcast_to_group(
                &payload.group_name,
                ServerEvent::new_message(&payload.user_name, &payload.timestamp, text),
            )
            .await;
    }

    /// Call the backend with bounded retries. Always resolves to broadcast
    /// text; failures map to their placeholder.
    async fn augment(&self, prompt: &str) -> String {
        let request = CompletionRequest {
            prompt: prompt.to_string(),
            max_tokens: self.options.max_output_tokens,
        };

        let mut attempt: u32 = 0;
        loop {
            let outcome = match tokio::time::timeout(
                self.options.call_deadline,
                self.client.complete(request.clone()),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(AugmentationError::DeadlineExceeded),
            };

            match outcome {
                Ok(Some(text)) => {
                    debug!(chars = text.len(), "augmentation completed");
                    return text;
                }
                Ok(None) => {
                    error!("augmentation backend returned no content");
                    return NO_CONTENT_TEXT.to_string();
                }
                Err(error) if error.is_configuration() => {
                    error!(%error, "augmentation configuration error");
                    return CONFIG_ERROR_TEXT.to_string();
                }
                Err(error) => {
                    attempt += 1;
                    if attempt > self.options.max_retries {
                        error!(%error, attempts = attempt, "augmentation failed after retries");
                        return if error.is_deadline() {
                            TIMEOUT_TEXT.to_string()
                        } else {
                            BACKEND_ERROR_TEXT.to_string()
                        };
                    }
                    let delay = self.backoff_delay(attempt);
                    warn!(
                        %error,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "augmentation attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Exponential backoff capped at `retry_max_delay`, with jitter in the
    /// upper half of the window.
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        let exponential = self.options.retry_base_delay.saturating_mul(1u32 << shift);
        let capped = exponential.min(self.options.retry_max_delay);
        let max_ms = capped.as_millis() as u64;
        if max_ms == 0 {
            return Duration::ZERO;
        }
        let ms = rand::thread_rng().gen_range(max_ms / 2..=max_ms);
        Duration::from_millis(ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options_with_delays(base_ms: u64, max_ms: u64) -> PipelineOptions {
        PipelineOptions {
            diagnostic_group: "default".to_string(),
            max_output_tokens: 200,
            max_retries: 3,
            retry_base_delay: Duration::from_millis(base_ms),
            retry_max_delay: Duration::from_millis(max_ms),
            call_deadline: Duration::from_secs(30),
        }
    }

    struct NullTransport;

    #[async_trait::async_trait]
    impl PushTransport for NullTransport {
        async fn broadcast_to_group(&self, _group: &str, _event: ServerEvent) {}
        async fn broadcast_to_others(
            &self,
            _group: &str,
            _exclude: relaycast_transport::ConnectionId,
            _event: ServerEvent,
        ) {
        }
        async fn add_to_group(&self, _connection: relaycast_transport::ConnectionId, _group: &str) {
        }
        async fn remove_connection(&self, _connection: relaycast_transport::ConnectionId) {}
    }

    struct NeverCalled;

    #[async_trait::async_trait]
    impl AugmentationClient for NeverCalled {
        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> Result<Option<String>, AugmentationError> {
            panic!("client must not be called");
        }
    }

    fn pipeline_with_delays(base_ms: u64, max_ms: u64) -> EnrichmentPipeline {
        EnrichmentPipeline::new(
            Arc::new(NullTransport),
            Arc::new(NeverCalled),
            options_with_delays(base_ms, max_ms),
        )
    }

    #[test]
    fn backoff_grows_and_respects_the_cap() {
        let pipeline = pipeline_with_delays(100, 1_000);

        for _ in 0..20 {
            let first = pipeline.backoff_delay(1);
            assert!(first >= Duration::from_millis(50));
            assert!(first <= Duration::from_millis(100));

            let late = pipeline.backoff_delay(10);
            assert!(late >= Duration::from_millis(500));
            assert!(late <= Duration::from_millis(1_000));
        }
    }

    #[test]
    fn backoff_handles_zero_base_delay() {
        let pipeline = pipeline_with_delays(0, 1_000);
        assert_eq!(pipeline.backoff_delay(1), Duration::ZERO);
    }

    #[test]
    fn backoff_shift_saturates_on_large_attempt_numbers() {
        let pipeline = pipeline_with_delays(100, 700);
        let delay = pipeline.backoff_delay(u32::MAX);
        assert!(delay <= Duration::from_millis(700));
    }
}
