// src/scan.rs
//! Request-scoped scan types: what the client asked for, and the vendor job it turned into.
//! Nothing here outlives a single HTTP request.

use serde_json::Value;

use crate::normalize::is_truthy;

pub const DEFAULT_UPLOAD_FILENAME: &str = "uploaded_media";
pub const DEFAULT_UPLOAD_CONTENT_TYPE: &str = "application/octet-stream";

/// Uploaded media, fully buffered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl FileUpload {
    /// Missing or blank filename / content type fall back to generic defaults.
    pub fn new(filename: Option<&str>, content_type: Option<&str>, bytes: Vec<u8>) -> Self {
        let pick = |v: Option<&str>, default: &str| {
            v.map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or(default)
                .to_string()
        };
        Self {
            filename: pick(filename, DEFAULT_UPLOAD_FILENAME),
            content_type: pick(content_type, DEFAULT_UPLOAD_CONTENT_TYPE),
            bytes,
        }
    }
}

/// Exactly one of: a public media URL, or an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanRequest {
    Url(String),
    File(FileUpload),
}

impl ScanRequest {
    /// `None` for an empty / whitespace-only URL.
    pub fn url(media_url: impl Into<String>) -> Option<Self> {
        let media_url = media_url.into();
        if media_url.trim().is_empty() {
            None
        } else {
            Some(Self::Url(media_url))
        }
    }

    pub fn file(upload: FileUpload) -> Self {
        Self::File(upload)
    }

    /// Identifier echoed back as `mediaUrl` in the normalized result.
    pub fn media_label(&self) -> &str {
        match self {
            ScanRequest::Url(u) => u,
            ScanRequest::File(f) => &f.filename,
        }
    }

    /// Metric label.
    pub fn kind(&self) -> &'static str {
        match self {
            ScanRequest::Url(_) => "url",
            ScanRequest::File(_) => "file",
        }
    }
}

/// Vendor job status as reported in the `status` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Done,
    Success,
    Other(String),
    /// Field missing or not a string.
    Unknown,
}

impl JobStatus {
    pub fn from_payload(payload: &Value) -> Self {
        match payload.get("status").and_then(Value::as_str) {
            Some("pending") => JobStatus::Pending,
            Some("done") => JobStatus::Done,
            Some("success") => JobStatus::Success,
            Some(other) => JobStatus::Other(other.to_string()),
            None => JobStatus::Unknown,
        }
    }

    /// Polling stops on these. Exact match; "DONE" is not terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Success)
    }
}

/// A vendor scan still in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanJob {
    pub id: String,
    pub status: JobStatus,
}

impl ScanJob {
    /// A job worth polling: submission said `"pending"` and carried a truthy `id`.
    /// Anything else is treated as already final and goes straight to normalization.
    pub fn from_submission(payload: &Value) -> Option<Self> {
        let status = JobStatus::from_payload(payload);
        if status != JobStatus::Pending {
            return None;
        }
        let id = payload.get("id").filter(|v| is_truthy(v))?;
        let id = match id {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        Some(Self { id, status })
    }
}
