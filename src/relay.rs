// src/relay.rs
//! Submit -> (poll if pending) -> normalize, for one scan request.

use std::time::Instant;

use metrics::{counter, histogram};
use tracing::{error, info, Instrument};

use crate::backend::ScanBackend;
use crate::error::UpstreamError;
use crate::metrics::{ensure_metrics_described, SCANS_TOTAL, SCAN_DURATION_MS, UPSTREAM_ERRORS_TOTAL};
use crate::normalize::{normalize, NormalizedResult};
use crate::poll::{poll_scan, PollOutcome, PollPolicy};
use crate::scan::{ScanJob, ScanRequest};

/// Whether (and how) the status-polling phase ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollSummary {
    /// Submission came back non-pending (or without an id).
    Skipped,
    Completed { attempts: u32 },
    /// Budget spent; the result carries the last known, non-terminal status.
    Exhausted { attempts: u32 },
}

impl PollSummary {
    pub fn label(&self) -> &'static str {
        match self {
            PollSummary::Skipped => "skipped",
            PollSummary::Completed { .. } => "completed",
            PollSummary::Exhausted { .. } => "exhausted",
        }
    }

    pub fn attempts(&self) -> u32 {
        match self {
            PollSummary::Skipped => 0,
            PollSummary::Completed { attempts } | PollSummary::Exhausted { attempts } => *attempts,
        }
    }
}

impl From<&PollOutcome> for PollSummary {
    fn from(o: &PollOutcome) -> Self {
        match o {
            PollOutcome::Completed { attempts, .. } => PollSummary::Completed {
                attempts: *attempts,
            },
            PollOutcome::Exhausted { attempts, .. } => PollSummary::Exhausted {
                attempts: *attempts,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScanReport {
    pub result: NormalizedResult,
    pub poll: PollSummary,
}

/// Run one scan end to end. Only the submission can fail; poll failures are absorbed
/// by the poll loop and show up as a non-terminal `status` in the result.
pub async fn run_scan(
    backend: &dyn ScanBackend,
    policy: &PollPolicy,
    request: &ScanRequest,
) -> Result<ScanReport, UpstreamError> {
    ensure_metrics_described();
    let span = tracing::info_span!(
        "scan",
        kind = request.kind(),
        media = %request.media_label(),
        backend = backend.name()
    );

    async move {
        let t0 = Instant::now();
        counter!(SCANS_TOTAL, "kind" => request.kind()).increment(1);
        info!("submitting scan");

        let submitted = match backend.submit(request).await {
            Ok(v) => v,
            Err(e) => {
                counter!(UPSTREAM_ERRORS_TOTAL, "stage" => "submit", "kind" => e.kind()).increment(1);
                error!(error = %e, "scan submission failed");
                return Err(e);
            }
        };

        let (payload, poll) = match ScanJob::from_submission(&submitted) {
            Some(job) => {
                info!(scan_id = %job.id, "scan queued, polling for result");
                let outcome = poll_scan(backend, &job.id, policy).await;
                let summary = PollSummary::from(&outcome);
                (outcome.into_payload(), summary)
            }
            None => (submitted, PollSummary::Skipped),
        };

        let result = normalize(&payload, request.media_label());
        histogram!(SCAN_DURATION_MS).record(t0.elapsed().as_secs_f64() * 1_000.0);
        info!(
            label = %result.label,
            score = result.score,
            status = %result.status,
            poll = poll.label(),
            "scan finished"
        );
        Ok(ScanReport { result, poll })
    }
    .instrument(span)
    .await
}
