// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod api;
pub mod backend;
pub mod config;
pub mod error;
pub mod metrics;
pub mod normalize;
pub mod poll;
pub mod relay;
pub mod scan;
pub mod telemetry;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::config::RelayConfig;
pub use crate::normalize::{normalize, NormalizedResult};
pub use crate::relay::{run_scan, ScanReport};

use axum::Router;
use tracing::{info, warn};

/// Build the production Router from a loaded config (no `/metrics`; the binaries add it).
///
/// Example usage inside an entrypoint:
/// ```ignore
/// let _ = dotenvy::dotenv();
/// let cfg = echoframe_relay::RelayConfig::load()?;
/// let app = echoframe_relay::app(cfg)?;
/// ```
pub fn app(config: RelayConfig) -> anyhow::Result<Router> {
    // Safe diagnostics: only key length, never the key.
    info!(
        base_url = %config.base_url,
        key_len = config.api_key().map(str::len).unwrap_or(0),
        poll_retries = config.poll_retries,
        poll_wait_secs = config.poll_wait.as_secs(),
        timeout_secs = config.request_timeout.as_secs(),
        "relay config loaded"
    );
    if config.api_key().is_none() {
        warn!("REALITY_DEFENDER_API_KEY not set: scan endpoints will answer 500");
    }
    let state = AppState::from_config(config)?;
    Ok(router(state))
}
