use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{
        multipart::{MultipartError, MultipartRejection},
        DefaultBodyLimit, Multipart, State,
    },
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::backend::{RealityDefenderClient, ScanBackend};
use crate::config::RelayConfig;
use crate::error::ApiError;
use crate::relay::{run_scan, ScanReport};
use crate::scan::{FileUpload, ScanRequest};

/// `skipped` | `completed` | `exhausted`
pub const HEADER_SCAN_POLL: &str = "x-scan-poll";
pub const HEADER_SCAN_POLL_ATTEMPTS: &str = "x-scan-poll-attempts";

const MSG_MEDIA_URL_REQUIRED: &str = "mediaUrl is required";
const MSG_FILE_REQUIRED: &str = "No file uploaded (field name must be 'file')";
const CTX_ANALYZE_MEDIA: &str = "Failed to analyze media";
const CTX_ANALYZE_FILE: &str = "Failed to analyze file";

/// Shared, read-only per-process state. Nothing in here is mutated after startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RelayConfig>,
    pub backend: Arc<dyn ScanBackend>,
}

impl AppState {
    pub fn new(config: RelayConfig, backend: Arc<dyn ScanBackend>) -> Self {
        Self {
            config: Arc::new(config),
            backend,
        }
    }

    /// Production wiring: the Reality Defender client built from `config`.
    pub fn from_config(config: RelayConfig) -> anyhow::Result<Self> {
        let client = RealityDefenderClient::new(&config)?;
        Ok(Self::new(config, Arc::new(client)))
    }

    fn require_credential(&self) -> Result<(), ApiError> {
        match self.config.api_key() {
            Some(_) => Ok(()),
            None => Err(ApiError::MissingCredential),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/analyze", post(analyze))
        .route("/analyze-file", post(analyze_file))
        .layer(DefaultBodyLimit::max(upload_limit))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

async fn root() -> Json<Value> {
    Json(json!({ "status": "ok", "message": "EchoFrame backend is live" }))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

/// JSON body: `{ "mediaUrl": "https://..." }`.
/// The body is read leniently: anything that is not a JSON object counts as `{}`.
async fn analyze(State(state): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
    state.require_credential()?;

    let request = media_url_from_body(&body)
        .and_then(ScanRequest::url)
        .ok_or_else(|| ApiError::bad_request(MSG_MEDIA_URL_REQUIRED))?;

    info!(media_url = %request.media_label(), "analyze URL requested");
    let report = run_scan(state.backend.as_ref(), &state.config.poll_policy(), &request)
        .await
        .map_err(|source| ApiError::Upstream {
            context: CTX_ANALYZE_MEDIA,
            source,
        })?;
    Ok(scan_response(report))
}

/// Multipart form, part name `file`.
async fn analyze_file(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    state.require_credential()?;

    // Not multipart at all -> same answer as multipart without a file.
    let mut multipart = multipart.map_err(|_| ApiError::bad_request(MSG_FILE_REQUIRED))?;
    let upload = read_file_part(&mut multipart)
        .await?
        .ok_or_else(|| ApiError::bad_request(MSG_FILE_REQUIRED))?;

    info!(
        filename = %upload.filename,
        content_type = %upload.content_type,
        bytes = upload.bytes.len(),
        "analyze file requested"
    );
    let request = ScanRequest::file(upload);
    let report = run_scan(state.backend.as_ref(), &state.config.poll_policy(), &request)
        .await
        .map_err(|source| ApiError::Upstream {
            context: CTX_ANALYZE_FILE,
            source,
        })?;
    Ok(scan_response(report))
}

fn media_url_from_body(body: &[u8]) -> Option<String> {
    let parsed: Value = serde_json::from_slice(body).ok()?;
    match parsed.get("mediaUrl")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// First file part named `file`, fully buffered. Other parts, and `file` fields
/// sent without a filename, are skipped.
async fn read_file_part(multipart: &mut Multipart) -> Result<Option<FileUpload>, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") || field.file_name().is_none() {
            continue;
        }
        let filename = field.file_name().map(str::to_owned);
        let content_type = field.content_type().map(str::to_owned);
        let bytes = field.bytes().await.map_err(multipart_error)?;
        return Ok(Some(FileUpload::new(
            filename.as_deref(),
            content_type.as_deref(),
            bytes.to_vec(),
        )));
    }
    Ok(None)
}

// The body limit surfaces here as a 413 multipart error; keep that status.
fn multipart_error(e: MultipartError) -> ApiError {
    let message = format!("invalid multipart body: {}", e.body_text());
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(message)
    } else {
        ApiError::bad_request(message)
    }
}

/// 200 with the normalized body; the poll outcome travels in headers so the body
/// contract stays unchanged for existing clients.
fn scan_response(report: ScanReport) -> Response {
    let mut resp = Json(report.result).into_response();
    let headers = resp.headers_mut();
    headers.insert(HEADER_SCAN_POLL, HeaderValue::from_static(report.poll.label()));
    headers.insert(
        HEADER_SCAN_POLL_ATTEMPTS,
        HeaderValue::from(report.poll.attempts()),
    );
    resp
}
