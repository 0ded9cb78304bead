// src/types.rs
// Shared data shapes flowing through the scraper pipeline.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// The closed set of extraction strategies. Dispatch is exhaustive; there is
/// no plugin mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Direct parse of a discovered backend JSON endpoint. No model call.
    Api,
    /// Cleaned page markup sent to a chat model for semantic extraction.
    ContentModel,
    /// Full-page screenshot sent to a vision model.
    ImageModel,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Api => "api",
            Strategy::ContentModel => "content_model",
            Strategy::ImageModel => "image_model",
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single SEBI circular / announcement entry, candidate or validated.
///
/// `issue_date` may be absent on a raw candidate; the validator tolerates a
/// missing date but rejects a clearly wrong one. Dates serialize as
/// `YYYY-MM-DD`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Announcement {
    pub title: String,
    #[serde(default)]
    pub issue_date: Option<NaiveDate>,
    #[serde(default = "default_confidence")]
    pub confidence: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

fn default_confidence() -> f32 {
    1.0
}

impl Announcement {
    pub fn new(title: impl Into<String>, issue_date: Option<NaiveDate>, confidence: f32) -> Self {
        Self {
            title: title.into(),
            issue_date,
            confidence,
            detail_url: None,
            pdf_url: None,
            local_path: None,
            file_name: None,
            category: None,
        }
    }
}

/// Outcome of one extraction attempt.
///
/// `succeeded` is true iff the strategy ran without a recoverable error AND
/// produced at least one parseable candidate. An empty-but-parseable result
/// carries `succeeded == false` with `error == None`, which distinguishes it
/// from a provider failure (`error == Some(..)`).
#[derive(Debug, Clone)]
pub struct StrategyResult {
    pub records: Vec<Announcement>,
    pub strategy: Strategy,
    pub succeeded: bool,
    pub error: Option<String>,
}

impl StrategyResult {
    pub fn ok(strategy: Strategy, records: Vec<Announcement>) -> Self {
        let succeeded = !records.is_empty();
        Self {
            records,
            strategy,
            succeeded,
            error: None,
        }
    }

    pub fn failed(strategy: Strategy, error: impl Into<String>) -> Self {
        Self {
            records: Vec::new(),
            strategy,
            succeeded: false,
            error: Some(error.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Result of probing the target for a structured backend source.
/// "Not found" is a normal outcome, never an error.
#[derive(Debug, Clone, Default)]
pub struct ProbeResult {
    pub found: bool,
    pub endpoint: Option<String>,
    pub payload: Option<serde_json::Value>,
}

impl ProbeResult {
    pub fn found(endpoint: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            found: true,
            endpoint: Some(endpoint.into()),
            payload: Some(payload),
        }
    }
}

/// Date formats seen in SEBI listings, backend payloads, and model output.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%d-%m-%Y",
    "%d/%m/%Y",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d, %Y",
    "%B %d, %Y",
];

/// Try multiple calendar formats to parse a date string. Returns `None` for
/// anything unparseable; the caller treats that as "no date".
pub fn parse_flexible_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    // ISO datetime, e.g. "2026-02-25T00:00:00"
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|dt| dt.date())
}
