// src/validate.rs
//! Validation & scoring engine.
//!
//! Pure, deterministic, order-preserving transformation of raw candidates
//! into a cleaned, deduplicated, confidence-scored set. Malformed candidates
//! are rejected, never propagated as failures. The whole transformation is
//! idempotent: validating an already-validated set yields the same set.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::Serialize;

use crate::types::Announcement;

/// Titles must carry at least this many alphabetic characters; anything less
/// is a numeric code or a corrupted fragment mistaken for a title.
const MIN_TITLE_ALPHA_CHARS: usize = 5;

/// Publication dates may run ahead of "today" by this many days (timezone /
/// clock skew on the publisher side).
const FUTURE_SKEW_DAYS: u64 = 3;

/// Regulatory terminology that marks a title as a likely genuine circular.
const REGULATORY_KEYWORDS: &[&str] =
    &["sebi", "circular", "regulation", "amendment", "notification"];

/// Titles that route the record into the AIF vertical instead of the base
/// category.
const AIF_KEYWORDS: &[&str] = &["portfolio manager", "alternative investment"];

/// Scoring floors/ceilings. Saturating moves rather than additive deltas so
/// that re-scoring an already-scored record is a no-op.
const KEYWORD_CONFIDENCE_FLOOR: f32 = 0.70;
const SHORT_TITLE_MAX_CHARS: usize = 20;
const SHORT_TITLE_CONFIDENCE_CEILING: f32 = 0.50;

#[derive(Debug, Clone)]
pub struct ValidationRules {
    /// Records dated before Jan 1 of this year are unrealistic.
    pub min_year: i32,
    /// Titles containing any of these phrases are dropped outright.
    pub exclude_keywords: Vec<String>,
    /// Category assigned to records that don't match a remap rule.
    pub base_category: String,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            min_year: 1992,
            exclude_keywords: vec!["mutual fund".to_string()],
            base_category: "SEBI".to_string(),
        }
    }
}

impl ValidationRules {
    pub fn with_min_year(min_year: i32) -> Self {
        Self {
            min_year,
            ..Self::default()
        }
    }
}

/// Per-rule outcome counts, reported for observability only. Control flow
/// never depends on these.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationStats {
    pub total_input: usize,
    pub valid: usize,
    pub removed_short_title: usize,
    pub removed_unrealistic_date: usize,
    pub removed_duplicates: usize,
    pub excluded_by_keyword: usize,
    pub remapped_to_aif: usize,
}

impl ValidationStats {
    pub fn summary(&self) -> String {
        format!(
            "Validation: {}/{} passed | short_title={}, unrealistic_date={}, \
             duplicates={}, excluded={}, remapped_to_aif={}",
            self.valid,
            self.total_input,
            self.removed_short_title,
            self.removed_unrealistic_date,
            self.removed_duplicates,
            self.excluded_by_keyword,
            self.remapped_to_aif,
        )
    }
}

/// Validate and clean a batch of extracted announcements.
///
/// Rules, in order: title validity, date realism, exclusion keywords,
/// duplicate removal, category remapping, confidence scoring. First
/// occurrence wins among duplicates; input order is preserved.
pub fn validate(
    records: Vec<Announcement>,
    today: NaiveDate,
    rules: &ValidationRules,
) -> (Vec<Announcement>, ValidationStats) {
    let mut stats = ValidationStats {
        total_input: records.len(),
        ..Default::default()
    };

    let min_date = NaiveDate::from_ymd_opt(rules.min_year, 1, 1).unwrap_or(NaiveDate::MIN);
    let max_date = today + chrono::Days::new(FUTURE_SKEW_DAYS);

    let mut seen: HashSet<(String, Option<NaiveDate>)> = HashSet::new();
    let mut validated = Vec::with_capacity(records.len());

    for mut ann in records {
        if !is_valid_title(&ann.title) {
            stats.removed_short_title += 1;
            tracing::debug!(title = %truncate(&ann.title, 50), "removed: short/invalid title");
            continue;
        }

        // A missing date is tolerated; a clearly wrong one is not.
        if let Some(d) = ann.issue_date {
            if d < min_date || d > max_date {
                stats.removed_unrealistic_date += 1;
                tracing::debug!(date = %d, title = %truncate(&ann.title, 50), "removed: unrealistic date");
                continue;
            }
        }

        if is_excluded(&ann.title, &rules.exclude_keywords) {
            stats.excluded_by_keyword += 1;
            tracing::debug!(title = %truncate(&ann.title, 50), "removed: excluded keyword");
            continue;
        }

        let dedup_key = (ann.title.to_lowercase(), ann.issue_date);
        if !seen.insert(dedup_key) {
            stats.removed_duplicates += 1;
            tracing::debug!(title = %truncate(&ann.title, 50), "removed: duplicate");
            continue;
        }

        if let Some(cat) = remap_category(&ann.title, ann.category.as_deref(), &rules.base_category)
        {
            if cat == "AIF" && ann.category.as_deref() != Some("AIF") {
                stats.remapped_to_aif += 1;
            }
            ann.category = Some(cat);
        }

        ann.confidence = score_confidence(&ann.title, ann.confidence);
        validated.push(ann);
        stats.valid += 1;
    }

    (validated, stats)
}

fn is_valid_title(title: &str) -> bool {
    title.chars().filter(|c| c.is_alphabetic()).count() >= MIN_TITLE_ALPHA_CHARS
}

fn is_excluded(title: &str, exclude: &[String]) -> bool {
    let lower = title.to_lowercase();
    exclude
        .iter()
        .any(|kw| !kw.is_empty() && lower.contains(&kw.to_lowercase()))
}

/// AIF-flavored titles move into the AIF vertical; everything else keeps an
/// existing category or picks up the base one.
fn remap_category(title: &str, current: Option<&str>, base: &str) -> Option<String> {
    let lower = title.to_lowercase();
    if AIF_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
        return Some("AIF".to_string());
    }
    match current {
        Some(existing) => Some(existing.to_string()),
        None => Some(base.to_string()),
    }
}

/// Scoring order: strategy-assigned base value, regulatory-keyword boost,
/// short-title penalty, clamp. Boost raises to a floor and the penalty caps
/// to a ceiling, so applying the function twice changes nothing.
fn score_confidence(title: &str, base: f32) -> f32 {
    let mut score = base;
    let lower = title.to_lowercase();
    if REGULATORY_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
        score = score.max(KEYWORD_CONFIDENCE_FLOOR);
    }
    if title.chars().count() < SHORT_TITLE_MAX_CHARS {
        score = score.min(SHORT_TITLE_CONFIDENCE_CEILING);
    }
    score.clamp(0.0, 1.0)
}

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
