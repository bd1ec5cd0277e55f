//! Detection vendor backends.
//!
//! - [`reality_defender`] - the production REST client (reqwest)
//! - [`mock`] - scripted in-memory backend for tests and local runs

pub mod mock;
pub mod reality_defender;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::UpstreamError;
use crate::scan::{FileUpload, ScanRequest};

pub use mock::{MockBackend, MockCall};
pub use reality_defender::RealityDefenderClient;

/// The three vendor calls the relay needs. Payloads stay untyped `Value`s;
/// `scan` picks out the job id and status, `normalize` reads the rest.
#[async_trait]
pub trait ScanBackend: Send + Sync {
    /// `POST scan/url`
    async fn submit_url(&self, media_url: &str) -> Result<Value, UpstreamError>;

    /// `POST scan/file` (multipart, part name `file`)
    async fn submit_file(&self, upload: &FileUpload) -> Result<Value, UpstreamError>;

    /// `GET scans/{id}`
    async fn fetch_scan(&self, scan_id: &str) -> Result<Value, UpstreamError>;

    /// Backend name for diagnostics.
    fn name(&self) -> &'static str;

    /// Single submission for either request kind. Never retried.
    async fn submit(&self, request: &ScanRequest) -> Result<Value, UpstreamError> {
        match request {
            ScanRequest::Url(url) => self.submit_url(url).await,
            ScanRequest::File(upload) => self.submit_file(upload).await,
        }
    }
}
