//! Reality Defender REST client.
//!
//! Endpoints used (relative to the configured base URL):
//! 1. `POST scan/url`  - JSON `{"url": ...}`
//! 2. `POST scan/file` - multipart, one part named `file`
//! 3. `GET scans/{id}` - job status / verdict
//!
//! Every call carries `x-api-key` (when configured) and the client-wide timeout.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Url};
use serde_json::{json, Value};

use super::ScanBackend;
use crate::config::RelayConfig;
use crate::error::UpstreamError;
use crate::scan::{FileUpload, DEFAULT_UPLOAD_CONTENT_TYPE};

pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Clone)]
pub struct RealityDefenderClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

impl RealityDefenderClient {
    pub fn new(config: &RelayConfig) -> anyhow::Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("echoframe-relay/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(config.request_timeout.min(Duration::from_secs(5)))
            .timeout(config.request_timeout)
            .build()
            .context("building reqwest client")?;
        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn scan_status_url(&self, scan_id: &str) -> Result<Url, UpstreamError> {
        let base = self.endpoint("scans");
        let mut url = Url::parse(&base).map_err(|e| UpstreamError::transport(&base, e))?;
        url.path_segments_mut()
            .map_err(|_| UpstreamError::transport(&base, "base URL cannot carry a path"))?
            .push(scan_id);
        Ok(url)
    }

    fn authed(&self, rb: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => rb.header(API_KEY_HEADER, key),
            None => rb,
        }
    }

    /// Send, require 2xx, parse JSON.
    async fn send_json(&self, rb: RequestBuilder, endpoint: &str) -> Result<Value, UpstreamError> {
        let resp = self
            .authed(rb)
            .send()
            .await
            .map_err(|e| UpstreamError::transport(endpoint, error_chain(&e)))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(UpstreamError::status(endpoint, status.as_u16()));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| UpstreamError::transport(endpoint, error_chain(&e)))?;
        serde_json::from_slice(&bytes).map_err(|e| UpstreamError::decode(endpoint, e))
    }
}

#[async_trait]
impl ScanBackend for RealityDefenderClient {
    async fn submit_url(&self, media_url: &str) -> Result<Value, UpstreamError> {
        let endpoint = self.endpoint("scan/url");
        let rb = self.http.post(&endpoint).json(&json!({ "url": media_url }));
        self.send_json(rb, &endpoint).await
    }

    async fn submit_file(&self, upload: &FileUpload) -> Result<Value, UpstreamError> {
        let endpoint = self.endpoint("scan/file");

        // An unparsable client-supplied MIME type degrades to octet-stream.
        let make_part = |mime: &str| {
            Part::bytes(upload.bytes.clone())
                .file_name(upload.filename.clone())
                .mime_str(mime)
        };
        let part = make_part(&upload.content_type)
            .or_else(|_| make_part(DEFAULT_UPLOAD_CONTENT_TYPE))
            .map_err(|e| UpstreamError::transport(&endpoint, e))?;

        let rb = self
            .http
            .post(&endpoint)
            .multipart(Form::new().part("file", part));
        self.send_json(rb, &endpoint).await
    }

    async fn fetch_scan(&self, scan_id: &str) -> Result<Value, UpstreamError> {
        let url = self.scan_status_url(scan_id)?;
        let endpoint = url.to_string();
        self.send_json(self.http.get(url), &endpoint).await
    }

    fn name(&self) -> &'static str {
        "reality-defender"
    }
}

/// reqwest's top-level message hides the interesting part ("operation timed out",
/// "connection refused"); walk the source chain so the 502 detail carries it.
fn error_chain(e: &dyn std::error::Error) -> String {
    let mut out = e.to_string();
    let mut src = e.source();
    while let Some(cause) = src {
        let msg = cause.to_string();
        if !out.contains(&msg) {
            out.push_str(": ");
            out.push_str(&msg);
        }
        src = cause.source();
    }
    out
}
