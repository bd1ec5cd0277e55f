// src/normalize.rs
//! Vendor payload -> stable response shape.
//!
//! The vendor's JSON is not contractually stable, so the payload stays a `serde_json::Value`
//! and every field goes through an explicit, ordered fallback. Nothing in here can fail:
//! whatever JSON comes in, a complete `NormalizedResult` comes out.

use serde::Serialize;
use serde_json::Value;

pub const UNKNOWN: &str = "unknown";

/// What callers of `/analyze` and `/analyze-file` receive.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedResult {
    pub label: String,
    /// Media URL or uploaded filename, echoed back.
    #[serde(rename = "mediaUrl")]
    pub media_url: String,
    pub score: f64,
    pub ai_usage: AiUsage,
    pub status: String,
    /// The vendor payload, untouched.
    pub raw: Value,
}

/// Serialized transparently: a bare integer when derived, the vendor's own value otherwise.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AiUsage {
    /// `clamp(100 - round(score), 0, 100)`
    Derived(u8),
    /// Passed through verbatim.
    Vendor(Value),
}

/// Python-style truthiness, which is how the vendor fields have always been read:
/// null, false, 0, "", [] and {} are all "absent".
pub fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|x| x != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Normalize one vendor payload. `media` is the URL or filename the scan was for.
pub fn normalize(raw: &Value, media: &str) -> NormalizedResult {
    // A non-object payload simply has no fields.
    let field = |name: &str| raw.as_object().and_then(|o| o.get(name));

    // 1) direct fields
    let mut score = field("score");
    let mut label = field("label");

    // 2) detections[0] fallback, only when score is falsy
    if !score.is_some_and(is_truthy) {
        if let Some(Value::Array(detections)) = field("detections") {
            if let Some(first) = detections.first() {
                let first = first.as_object();
                score = first.and_then(|d| d.get("confidence"));
                label = first.and_then(|d| d.get("label"));
            }
        }
    }

    // 3) coerce
    let score = coerce_score(score);

    // 4) label default
    let label = label_text(label);

    // 5) ai_usage: vendor wins when present and non-null
    let ai_usage = match field("ai_usage") {
        Some(v) if !v.is_null() => AiUsage::Vendor(v.clone()),
        _ => AiUsage::Derived(derive_ai_usage(score)),
    };

    // 6) status + raw
    let status = match field("status") {
        None | Some(Value::Null) => UNKNOWN.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    };

    NormalizedResult {
        label,
        media_url: media.to_string(),
        score,
        ai_usage,
        status,
        raw: raw.clone(),
    }
}

/// Lenient float coercion. Never fails; anything unusable is 0.0.
pub fn coerce_score(v: Option<&Value>) -> f64 {
    let x = match v {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        Some(Value::Bool(true)) => 1.0,
        _ => 0.0,
    };
    if x.is_finite() {
        x
    } else {
        0.0
    }
}

pub fn derive_ai_usage(score: f64) -> u8 {
    (100.0 - score.round()).clamp(0.0, 100.0) as u8
}

fn label_text(v: Option<&Value>) -> String {
    match v {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(other) if is_truthy(other) => other.to_string(),
        _ => UNKNOWN.to_string(),
    }
}
