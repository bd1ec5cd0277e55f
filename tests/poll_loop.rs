// tests/poll_loop.rs
//
// Poll loop behaviour against a scripted backend: budget accounting, error
// swallowing, and what "last observed payload" means on exhaustion.

use std::time::{Duration, Instant};

use serde_json::json;

use echoframe_relay::backend::{MockBackend, MockCall};
use echoframe_relay::error::UpstreamError;
use echoframe_relay::poll::{poll_scan, PollOutcome, PollPolicy};

fn policy(retries: u32) -> PollPolicy {
    PollPolicy {
        retries,
        wait: Duration::ZERO,
    }
}

fn fetch_err() -> UpstreamError {
    UpstreamError::status("https://vendor.test/v1/scans/job", 500)
}

#[tokio::test]
async fn always_pending_stops_after_exactly_the_budget() {
    let pending = json!({"status": "pending", "id": "job", "eta": 9});
    let backend = MockBackend::new().on_poll(Ok(pending.clone()));

    let out = poll_scan(&backend, "job", &policy(3)).await;

    assert_eq!(
        out,
        PollOutcome::Exhausted {
            last: pending,
            attempts: 3
        }
    );
    assert_eq!(backend.fetch_count(), 3);
    assert!(backend
        .calls()
        .iter()
        .all(|c| *c == MockCall::FetchScan("job".to_string())));
}

#[tokio::test]
async fn terminal_status_stops_early() {
    let backend = MockBackend::new()
        .on_poll(Ok(json!({"status": "pending"})))
        .on_poll(Ok(json!({"status": "done", "score": 3})));

    let out = poll_scan(&backend, "job", &policy(10)).await;

    assert_eq!(out.attempts(), 2);
    assert!(!out.is_exhausted());
    assert_eq!(out.payload()["score"], 3);
    assert_eq!(backend.fetch_count(), 2);
}

#[tokio::test]
async fn failed_queries_consume_budget_but_do_not_abort() {
    let backend = MockBackend::new()
        .on_poll(Err(fetch_err()))
        .on_poll(Err(fetch_err()))
        .on_poll(Ok(json!({"status": "success"})));

    let out = poll_scan(&backend, "job", &policy(5)).await;

    assert_eq!(
        out,
        PollOutcome::Completed {
            payload: json!({"status": "success"}),
            attempts: 3
        }
    );
}

#[tokio::test]
async fn all_failures_exhaust_with_empty_payload() {
    let backend = MockBackend::new().on_poll(Err(fetch_err()));

    let out = poll_scan(&backend, "job", &policy(4)).await;

    assert_eq!(
        out,
        PollOutcome::Exhausted {
            last: json!({}),
            attempts: 4
        }
    );
    assert_eq!(backend.fetch_count(), 4);
}

#[tokio::test]
async fn failure_after_pending_keeps_last_good_payload() {
    let first = json!({"status": "pending", "progress": 10});
    let backend = MockBackend::new()
        .on_poll(Ok(first.clone()))
        .on_poll(Err(fetch_err()));

    let out = poll_scan(&backend, "job", &policy(3)).await;

    assert!(out.is_exhausted());
    assert_eq!(out.into_payload(), first);
}

#[tokio::test]
async fn zero_budget_makes_no_calls() {
    let backend = MockBackend::new();

    let out = poll_scan(&backend, "job", &policy(0)).await;

    assert_eq!(out.attempts(), 0);
    assert!(out.is_exhausted());
    assert_eq!(backend.call_count(), 0);
}

#[tokio::test]
async fn waits_between_attempts_but_not_after_the_last() {
    let backend = MockBackend::new();
    let p = PollPolicy {
        retries: 3,
        wait: Duration::from_millis(25),
    };

    let t0 = Instant::now();
    let out = poll_scan(&backend, "job", &p).await;
    let elapsed = t0.elapsed();

    assert!(out.is_exhausted());
    // two gaps for three attempts
    assert!(elapsed >= Duration::from_millis(50), "elapsed={elapsed:?}");
}
