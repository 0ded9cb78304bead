// src/extract/mod.rs
//! Extraction strategies and the model-client seam.
//!
//! Three strategies in priority order: direct API parse, markup + chat
//! model, screenshot + vision model. The model is a black box behind
//! [`ModelClient`]; nonconformant output is a parse failure, which the
//! orchestrator treats the same as zero records.

pub mod api;
pub mod azure;
pub mod content;
pub mod image;

use anyhow::Result;
use async_trait::async_trait;
use once_cell::sync::OnceCell;
use regex::Regex;
use serde::Deserialize;

use crate::types::{parse_flexible_date, Announcement};

/// Distinguishes the first-attempt prompt from the refined one used after a
/// failed extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HintProfile {
    Initial,
    Refined,
}

/// Black-box generative model. One text completion surface, one vision
/// surface; both bounded by the client's own timeout.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String>;
    async fn complete_vision(&self, system: &str, user: &str, image_b64: &str) -> Result<String>;
    /// Provider name for diagnostics.
    fn name(&self) -> &'static str;
}

pub(crate) const SYSTEM_PROMPT: &str = "\
You are a data extraction specialist. Identify and extract structured data \
from web page content. Do NOT rely on CSS class names or specific HTML \
attributes; look for SEMANTIC PATTERNS - repeating blocks that represent \
individual announcements or circulars. Each announcement has a TITLE and an \
ISSUE DATE. Extract ALL announcements visible, normalise dates to \
YYYY-MM-DD, and assign each item a confidence between 0.0 and 1.0. If you \
are uncertain about an item, lower its confidence but still include it. \
Return ONLY a JSON array of objects with keys: title, issue_date, confidence.";

/// Aggressively reduce page markup to the announcement listing before it is
/// sent to the model.
///
/// The SEBI page wraps circulars in `<table id="sample_1">`; when that is
/// missing, fall back to the table carrying `class="points"` links, then
/// strip scripts, styles, comments, and images and truncate.
pub fn clean_markup(markup: &str, max_chars: usize) -> String {
    static RE_SAMPLE_TABLE: OnceCell<Regex> = OnceCell::new();
    let re_sample = RE_SAMPLE_TABLE.get_or_init(|| {
        Regex::new(r#"(?is)<table[^>]*id=["']sample_1["'][^>]*>.*?</table>"#).unwrap()
    });

    let mut out = match re_sample.find(markup) {
        Some(m) => {
            tracing::debug!(chars = m.as_str().len(), "extracted announcements table");
            m.as_str().to_string()
        }
        None => match innermost_table_containing(markup, "points") {
            Some(t) => {
                tracing::debug!(chars = t.len(), "extracted content table via link pattern");
                t.to_string()
            }
            None => markup.to_string(),
        },
    };

    static RE_NOISE: OnceCell<Vec<Regex>> = OnceCell::new();
    let noise = RE_NOISE.get_or_init(|| {
        vec![
            Regex::new(r"(?is)<script[^>]*>.*?</script>").unwrap(),
            Regex::new(r"(?is)<style[^>]*>.*?</style>").unwrap(),
            Regex::new(r"(?s)<!--.*?-->").unwrap(),
            Regex::new(r"(?i)<img[^>]*>").unwrap(),
        ]
    });
    for re in noise {
        out = re.replace_all(&out, "").to_string();
    }

    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s{2,}").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();

    if out.chars().count() > max_chars {
        tracing::warn!(
            from = out.chars().count(),
            to = max_chars,
            "markup truncated for model"
        );
        out = out.chars().take(max_chars).collect();
    }
    out
}

/// Innermost `<table>` whose body mentions `needle` in a class attribute.
/// Plain string scan; the regex crate has no lookaround.
fn innermost_table_containing<'a>(markup: &'a str, needle: &str) -> Option<&'a str> {
    let lower = markup.to_lowercase();
    let probes = [
        format!("class=\"{needle}\""),
        format!("class='{needle}'"),
    ];
    let pos = probes.iter().find_map(|p| lower.find(p.as_str()))?;
    let start = lower[..pos].rfind("<table")?;
    let end = pos + lower[pos..].find("</table>")? + "</table>".len();
    markup.get(start..end)
}

#[derive(Debug, Deserialize)]
struct RawRecord {
    title: String,
    #[serde(default)]
    issue_date: Option<String>,
    #[serde(default)]
    confidence: Option<f32>,
}

/// Leniently pull candidate records out of raw model output.
///
/// Accepts a bare JSON array, an object wrapping one under `announcements` /
/// `records`, or either embedded in surrounding prose. Returns `None` when
/// no candidate structure can be parsed at all; items that fail to coerce
/// are skipped individually.
pub fn parse_model_records(raw: &str, default_confidence: f32) -> Option<Vec<Announcement>> {
    let value = extract_json(raw)?;
    let items = match &value {
        serde_json::Value::Array(items) => items.clone(),
        serde_json::Value::Object(map) => ["announcements", "records", "items"]
            .iter()
            .find_map(|k| map.get(*k))
            .and_then(|v| v.as_array())
            .cloned()?,
        _ => return None,
    };

    let mut out = Vec::with_capacity(items.len());
    for item in items {
        let Ok(rec) = serde_json::from_value::<RawRecord>(item) else {
            continue;
        };
        let title = normalize_title(&rec.title);
        if title.is_empty() {
            continue;
        }
        let issue_date = rec.issue_date.as_deref().and_then(parse_flexible_date);
        let confidence = rec
            .confidence
            .unwrap_or(default_confidence)
            .clamp(0.0, 1.0);
        out.push(Announcement::new(title, issue_date, confidence));
    }
    Some(out)
}

/// Find the first JSON array (preferred) or object in a blob of text.
fn extract_json(raw: &str) -> Option<serde_json::Value> {
    static RE_ARRAY: OnceCell<Regex> = OnceCell::new();
    static RE_OBJECT: OnceCell<Regex> = OnceCell::new();
    let re_array = RE_ARRAY.get_or_init(|| Regex::new(r"(?s)\[.*\]").unwrap());
    let re_object = RE_OBJECT.get_or_init(|| Regex::new(r"(?s)\{.*\}").unwrap());

    for re in [re_array, re_object] {
        if let Some(m) = re.find(raw) {
            if let Ok(v) = serde_json::from_str(m.as_str()) {
                return Some(v);
            }
        }
    }
    None
}

/// Model output occasionally carries HTML entities and ragged whitespace.
fn normalize_title(s: &str) -> String {
    let decoded = html_escape::decode_html_entities(s);
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}
