//! EchoFrame relay: Shuttle entrypoint.
//! Boots the Axum HTTP server: config, tracing, metrics, routes.
//!
//! For a plain listener on `$PORT`, use the `echoframe-serve` binary instead.

use echoframe_relay::{app, metrics::Metrics, telemetry, RelayConfig};
use shuttle_axum::ShuttleAxum;

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    // No-op when Shuttle already installed its own subscriber.
    telemetry::init_tracing();

    let config = RelayConfig::load()?;
    let metrics = Metrics::init()?;
    let router = app(config)?.merge(metrics.router());

    Ok(router.into())
}
