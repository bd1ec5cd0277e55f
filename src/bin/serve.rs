//! Standalone server: binds 0.0.0.0:$PORT (default 5000) without the Shuttle runtime.

use std::net::SocketAddr;

use anyhow::Context;
use echoframe_relay::{app, metrics::Metrics, telemetry, RelayConfig};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    telemetry::init_tracing();

    let config = RelayConfig::load()?;
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    let metrics = Metrics::init()?;
    let router = app(config)?.merge(metrics.router());

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "echoframe relay listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server")?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}
