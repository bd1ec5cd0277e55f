//! Scripted in-memory backend.
//!
//! Records every call so tests can assert exactly what (if anything) went upstream.
//!
//! ```rust
//! use echoframe_relay::backend::MockBackend;
//! use serde_json::json;
//!
//! let backend = MockBackend::new()
//!     .on_submit(Ok(json!({"status": "pending", "id": "job-1"})))
//!     .on_poll(Ok(json!({"status": "pending"})))
//!     .on_poll(Ok(json!({"status": "done", "score": 91})));
//! ```

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::ScanBackend;
use crate::error::UpstreamError;
use crate::scan::FileUpload;

/// One recorded upstream call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    SubmitUrl(String),
    SubmitFile {
        filename: String,
        content_type: String,
        len: usize,
    },
    FetchScan(String),
}

#[derive(Debug)]
pub struct MockBackend {
    submit_response: Result<Value, UpstreamError>,
    /// Consumed front to back; the final entry repeats once the script runs out.
    poll_script: Mutex<VecDeque<Result<Value, UpstreamError>>>,
    poll_default: Result<Value, UpstreamError>,
    calls: Mutex<Vec<MockCall>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Submissions answer `{"status": "done"}`; polls answer `{"status": "pending"}`.
    pub fn new() -> Self {
        Self {
            submit_response: Ok(json!({ "status": "done" })),
            poll_script: Mutex::new(VecDeque::new()),
            poll_default: Ok(json!({ "status": "pending" })),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn on_submit(mut self, response: Result<Value, UpstreamError>) -> Self {
        self.submit_response = response;
        self
    }

    /// Queue one poll response.
    pub fn on_poll(self, response: Result<Value, UpstreamError>) -> Self {
        {
            let mut script = self.poll_script.lock().unwrap_or_else(|p| p.into_inner());
            script.push_back(response.clone());
        }
        Self {
            poll_default: response,
            ..self
        }
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn fetch_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, MockCall::FetchScan(_)))
            .count()
    }

    fn record(&self, call: MockCall) {
        self.calls
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(call);
    }
}

#[async_trait]
impl ScanBackend for MockBackend {
    async fn submit_url(&self, media_url: &str) -> Result<Value, UpstreamError> {
        self.record(MockCall::SubmitUrl(media_url.to_string()));
        self.submit_response.clone()
    }

    async fn submit_file(&self, upload: &FileUpload) -> Result<Value, UpstreamError> {
        self.record(MockCall::SubmitFile {
            filename: upload.filename.clone(),
            content_type: upload.content_type.clone(),
            len: upload.bytes.len(),
        });
        self.submit_response.clone()
    }

    async fn fetch_scan(&self, scan_id: &str) -> Result<Value, UpstreamError> {
        self.record(MockCall::FetchScan(scan_id.to_string()));
        let next = self
            .poll_script
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .pop_front();
        next.unwrap_or_else(|| self.poll_default.clone())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
