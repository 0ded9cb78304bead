// src/extract/api.rs
//! Structured-API strategy: direct key mapping of a discovered backend JSON
//! payload. No model call involved, so it gets the highest base confidence.

use serde_json::Value;

use crate::types::{parse_flexible_date, Announcement, Strategy, StrategyResult};

pub const API_BASE_CONFIDENCE: f32 = 0.95;

/// Key names (case-insensitive) under which backends tend to hide titles and
/// dates.
const TITLE_KEYS: &[&str] = &["title", "name", "subject", "heading", "circular_name"];
const DATE_KEYS: &[&str] = &["date", "issue_date", "issuedate", "publish_date", "circular_date"];

/// Wrapper keys some APIs put around the actual list.
const LIST_KEYS: &[&str] = &["data", "results", "items", "records", "list"];

/// Parse announcements directly from a backend payload.
///
/// Items missing a title or a parseable date are skipped; an announcement
/// listing without either is not trustworthy enough to bypass the model.
pub fn extract_from_payload(payload: &Value) -> StrategyResult {
    let Some(items) = unwrap_items(payload) else {
        return StrategyResult::failed(Strategy::Api, "payload holds no list of records");
    };

    let mut records = Vec::with_capacity(items.len());
    for item in items {
        let Some(map) = item.as_object() else { continue };
        let title = field(map, TITLE_KEYS);
        let date = field(map, DATE_KEYS).and_then(|s| parse_flexible_date(&s));
        if let (Some(title), Some(date)) = (title, date) {
            records.push(Announcement::new(title, Some(date), API_BASE_CONFIDENCE));
        }
    }

    tracing::info!(raw = items.len(), mapped = records.len(), "api extraction");
    StrategyResult::ok(Strategy::Api, records)
}

/// Heuristic used by the prober: does this payload look like an announcement
/// listing (a list of at least 3 objects with title-like and date-like keys)?
pub fn looks_like_announcement_listing(payload: &Value) -> bool {
    let Some(items) = unwrap_items(payload) else {
        return false;
    };
    if items.len() < 3 {
        return false;
    }
    let Some(sample) = items[0].as_object() else {
        return false;
    };
    let keys: Vec<String> = sample.keys().map(|k| k.to_lowercase()).collect();
    let has = |candidates: &[&str]| candidates.iter().any(|c| keys.iter().any(|k| k == c));
    has(TITLE_KEYS) && has(DATE_KEYS)
}

fn unwrap_items(payload: &Value) -> Option<&Vec<Value>> {
    match payload {
        Value::Array(items) => Some(items),
        Value::Object(map) => LIST_KEYS
            .iter()
            .find_map(|k| map.get(*k))
            .and_then(|v| v.as_array()),
        _ => None,
    }
}

/// Try multiple key names, case-insensitively, to extract a non-empty field.
fn field(map: &serde_json::Map<String, Value>, candidates: &[&str]) -> Option<String> {
    for key in candidates {
        for (k, v) in map {
            if k.to_lowercase() == *key {
                let s = match v {
                    Value::String(s) => s.trim().to_string(),
                    Value::Number(n) => n.to_string(),
                    _ => continue,
                };
                if !s.is_empty() {
                    return Some(s);
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn maps_a_bare_list() {
        let payload = json!([
            {"title": "SEBI Circular on Brokers", "date": "2026-02-25"},
            {"Title": "Amendment to Margin Rules", "issueDate": "25 Feb 2026"},
        ]);
        let res = extract_from_payload(&payload);
        assert!(res.succeeded);
        assert_eq!(res.records.len(), 2);
        assert!(res
            .records
            .iter()
            .all(|r| (r.confidence - API_BASE_CONFIDENCE).abs() < f32::EPSILON));
    }

    #[test]
    fn unwraps_wrapped_lists() {
        let payload = json!({"data": [
            {"subject": "Notification on Settlement", "publish_date": "2026-01-10"},
        ]});
        let res = extract_from_payload(&payload);
        assert_eq!(res.records.len(), 1);
    }

    #[test]
    fn items_without_title_or_date_are_skipped() {
        let payload = json!([
            {"title": "Only a title"},
            {"date": "2026-01-01"},
            {"title": "Complete Circular Entry", "date": "2026-01-02"},
        ]);
        let res = extract_from_payload(&payload);
        assert_eq!(res.records.len(), 1);
    }

    #[test]
    fn empty_mapping_is_not_a_success() {
        let res = extract_from_payload(&json!([{"irrelevant": 1}]));
        assert!(!res.succeeded);
        assert!(res.records.is_empty());
        // Parseable-but-empty, not a provider failure.
        assert!(res.error.is_none());

        let res = extract_from_payload(&json!("just a string"));
        assert!(!res.succeeded);
        assert!(res.error.is_some());
    }

    #[test]
    fn listing_heuristic_wants_titleish_and_dateish_keys() {
        let good = json!({"records": [
            {"circular_name": "A", "circular_date": "x"},
            {"circular_name": "B", "circular_date": "y"},
            {"circular_name": "C", "circular_date": "z"},
        ]});
        assert!(looks_like_announcement_listing(&good));

        let too_few = json!([{"title": "A", "date": "x"}]);
        assert!(!looks_like_announcement_listing(&too_few));

        let wrong_shape = json!([{"foo": 1}, {"foo": 2}, {"foo": 3}]);
        assert!(!looks_like_announcement_listing(&wrong_shape));
    }
}
