use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;

use relaycast_config::load as load_config;
use relaycast_gateway::create_router;
use relaycast_runtime::{shutdown_signal, telemetry, RelayServices};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_tracing().context("failed to initialise tracing")?;

    info!("starting relaycast backend");

    let config = load_config().context("failed to load configuration")?;

    let services = RelayServices::initialise(&config).context("failed to initialise services")?;
    let app = create_router(services.state.clone());

    let address = format!("{}:{}", config.http.address, config.http.port);
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind http listener on {address}"))?;

    info!(%address, "http server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server error")?;

    services.shutdown().await;

    info!("backend shut down");
    Ok(())
}
