use anyhow::Context;
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

pub const SCANS_TOTAL: &str = "relay_scans_total";
pub const UPSTREAM_ERRORS_TOTAL: &str = "relay_upstream_errors_total";
pub const POLL_ATTEMPTS_TOTAL: &str = "relay_poll_attempts_total";
pub const POLL_EXHAUSTED_TOTAL: &str = "relay_poll_exhausted_total";
pub const SCAN_DURATION_MS: &str = "relay_scan_duration_ms";

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(SCANS_TOTAL, "Scans relayed to the detection vendor, by kind (url|file).");
        describe_counter!(
            UPSTREAM_ERRORS_TOTAL,
            "Vendor call failures, by stage (submit|poll) and kind."
        );
        describe_counter!(POLL_ATTEMPTS_TOTAL, "Status queries issued while polling.");
        describe_counter!(
            POLL_EXHAUSTED_TOTAL,
            "Poll loops that spent their budget without a terminal status."
        );
        describe_histogram!(
            SCAN_DURATION_MS,
            "End-to-end scan time (submit + poll) in milliseconds."
        );
    });
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder. Call once per process.
    pub fn init() -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;
        ensure_metrics_described();
        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
