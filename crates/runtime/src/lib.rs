use std::sync::Arc;

use anyhow::Result;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use relaycast_config::AppConfig;
use relaycast_gateway::GatewayState;
use relaycast_groups::{GroupHistory, GroupMembership};
use relaycast_pipeline::{
    channel_queue, AugmentationClient, EnrichmentPipeline, HttpAugmentationClient, PipelineOptions,
};
use relaycast_transport::BroadcastHub;

pub mod telemetry {
    use anyhow::Result;
    use tracing::Level;
    use tracing_subscriber::{fmt::SubscriberBuilder, EnvFilter};

    pub fn init_tracing() -> Result<()> {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let subscriber = SubscriberBuilder::default()
            .with_max_level(Level::INFO)
            .with_env_filter(env_filter)
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .map_err(|error| anyhow::anyhow!("failed to set tracing subscriber: {error}"))
    }
}

/// The assembled relay: gateway state plus the running enrichment workers.
pub struct RelayServices {
    pub state: GatewayState,
    workers: Vec<JoinHandle<()>>,
}

impl RelayServices {
    /// Build the hub, registries, augmentation client, and queue, and spawn
    /// the enrichment worker pool. The augmentation client is constructed
    /// once here and shared read-only across all workers.
    pub fn initialise(config: &AppConfig) -> Result<Self> {
        let hub = Arc::new(BroadcastHub::new());
        let membership = Arc::new(GroupMembership::new());
        let history = Arc::new(GroupHistory::new());

        let client: Arc<dyn AugmentationClient> =
            Arc::new(HttpAugmentationClient::from_config(&config.augmentation)?);

        let (publisher, consumer) = channel_queue(config.relay.queue_capacity);
        let pipeline = Arc::new(EnrichmentPipeline::new(
            hub.clone(),
            client,
            PipelineOptions::from_config(&config.relay, &config.augmentation),
        ));

        let workers = (0..config.relay.workers.max(1))
            .map(|_| {
                let pipeline = pipeline.clone();
                let consumer = consumer.clone();
                tokio::spawn(async move { pipeline.run(&consumer).await })
            })
            .collect::<Vec<_>>();

        info!(
            workers = workers.len(),
            augmentation_configured = config.augmentation.deployment.is_some(),
            "enrichment pipeline ready"
        );

        Ok(Self {
            state: GatewayState::new(membership, history, hub, publisher),
            workers,
        })
    }

    /// Drain and stop the worker pool. Dropping the last queue publisher
    /// closes the queue; workers finish the buffered messages and exit.
    /// The caller must have released its other `GatewayState` clones (the
    /// router is gone once the server future resolves).
    pub async fn shutdown(self) {
        let RelayServices { state, workers } = self;
        drop(state);

        for worker in workers {
            if let Err(error) = worker.await {
                warn!(%error, "enrichment worker ended abnormally");
            }
        }
        info!("enrichment pipeline drained");
    }
}

pub async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!(?error, "failed to listen for shutdown signal");
    }
    info!("shutdown signal received");
}
