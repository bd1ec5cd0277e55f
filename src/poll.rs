// src/poll.rs
//! Bounded status polling for an in-flight vendor scan.
//!
//! Each query is classified into a `PollAttempt`; the attempts are folded into a
//! `PollOutcome`. Failed queries are logged and consume budget, they never abort the loop.

use std::time::Duration;

use metrics::counter;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::backend::ScanBackend;
use crate::error::UpstreamError;
use crate::metrics::{POLL_ATTEMPTS_TOTAL, POLL_EXHAUSTED_TOTAL, UPSTREAM_ERRORS_TOTAL};
use crate::scan::JobStatus;

/// Retry budget and spacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub retries: u32,
    pub wait: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            retries: crate::config::relay::DEFAULT_POLL_RETRIES,
            wait: Duration::from_secs(crate::config::relay::DEFAULT_POLL_WAIT_SECS),
        }
    }
}

/// One status query, classified.
#[derive(Debug, Clone, PartialEq)]
pub enum PollAttempt {
    Terminal(Value),
    Pending(Value),
    Failed(UpstreamError),
}

impl PollAttempt {
    pub fn classify(res: Result<Value, UpstreamError>) -> Self {
        match res {
            Ok(payload) if JobStatus::from_payload(&payload).is_terminal() => {
                PollAttempt::Terminal(payload)
            }
            Ok(payload) => PollAttempt::Pending(payload),
            Err(e) => PollAttempt::Failed(e),
        }
    }
}

/// How polling ended.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// Terminal status observed on attempt `attempts`.
    Completed { payload: Value, attempts: u32 },
    /// Budget spent. `last` is the last successfully fetched payload, `{}` if none was.
    Exhausted { last: Value, attempts: u32 },
}

impl PollOutcome {
    pub fn attempts(&self) -> u32 {
        match self {
            PollOutcome::Completed { attempts, .. } | PollOutcome::Exhausted { attempts, .. } => {
                *attempts
            }
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, PollOutcome::Exhausted { .. })
    }

    pub fn payload(&self) -> &Value {
        match self {
            PollOutcome::Completed { payload, .. } => payload,
            PollOutcome::Exhausted { last, .. } => last,
        }
    }

    pub fn into_payload(self) -> Value {
        match self {
            PollOutcome::Completed { payload, .. } => payload,
            PollOutcome::Exhausted { last, .. } => last,
        }
    }
}

/// Poll `scans/{scan_id}` until a terminal status or `policy.retries` queries have been made.
/// Sleeps `policy.wait` between queries, not after the last one.
pub async fn poll_scan(backend: &dyn ScanBackend, scan_id: &str, policy: &PollPolicy) -> PollOutcome {
    let mut last = Value::Object(Map::new());

    for attempt in 1..=policy.retries {
        counter!(POLL_ATTEMPTS_TOTAL).increment(1);

        match PollAttempt::classify(backend.fetch_scan(scan_id).await) {
            PollAttempt::Terminal(payload) => {
                debug!(scan_id, attempt, "scan reached terminal status");
                return PollOutcome::Completed {
                    payload,
                    attempts: attempt,
                };
            }
            PollAttempt::Pending(payload) => {
                debug!(scan_id, attempt, status = ?JobStatus::from_payload(&payload), "scan still pending");
                last = payload;
            }
            PollAttempt::Failed(e) => {
                counter!(UPSTREAM_ERRORS_TOTAL, "stage" => "poll", "kind" => e.kind()).increment(1);
                warn!(scan_id, attempt, error = %e, "poll request error");
            }
        }

        if attempt < policy.retries && !policy.wait.is_zero() {
            tokio::time::sleep(policy.wait).await;
        }
    }

    counter!(POLL_EXHAUSTED_TOTAL).increment(1);
    warn!(
        scan_id,
        attempts = policy.retries,
        "poll budget exhausted without terminal status"
    );
    PollOutcome::Exhausted {
        last,
        attempts: policy.retries,
    }
}
