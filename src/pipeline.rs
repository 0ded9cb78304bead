// src/pipeline.rs
//! Orchestration state machine.
//!
//! Sequences strategy invocation, retry, and fallback:
//!
//! ```text
//! load -> probe -> extract -> [decide]
//!                                |- validate        (records present, or budget spent)
//!                                |- retry_extract   (first failure: refined hints)
//!                                '- screenshot_fallback -> [decide]
//! ```
//!
//! Validation is always the terminal step; the run never aborts mid-pipeline.
//! Everything recoverable is absorbed into a transition decision plus an
//! entry in the diagnostic `errors` list, which control flow never reads.

use chrono::NaiveDate;
use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;

use crate::extract::{self, HintProfile, ModelClient};
use crate::fetch::{ContentLoader, ScreenCapture, SourceProber};
use crate::types::{Announcement, ProbeResult, Strategy, StrategyResult};
use crate::validate::{validate, ValidationRules, ValidationStats};

/// One-time metrics registration; a no-op without an installed recorder.
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "scrape_extract_attempts_total",
            "Extraction strategy attempts, labelled by strategy."
        );
        describe_counter!("scrape_retries_total", "Retry/fallback transitions taken.");
        describe_counter!(
            "scrape_records_validated_total",
            "Records that passed validation."
        );
        describe_counter!(
            "scrape_records_rejected_total",
            "Records rejected by validation, labelled by rule."
        );
    });
}

/// The value threaded through the run. Created once, mutated in place by the
/// single driver task, discarded after the terminal step.
#[derive(Debug, Default)]
pub struct PipelineState {
    pub source_ref: String,
    /// Most recently obtained markup; overwritten, never a history.
    pub rendered_content: Option<String>,
    pub api_probe: Option<ProbeResult>,
    pub latest_result: Option<StrategyResult>,
    /// Failed extraction attempts only. Loader-internal retries never count.
    pub retry_count: u32,
    /// Append-only diagnostics, one entry per failed attempt.
    pub errors: Vec<String>,
    pub strategy_used: Option<Strategy>,
    pub validated: Vec<Announcement>,
    pub stats: Option<ValidationStats>,
}

impl PipelineState {
    fn new(source_ref: &str) -> Self {
        Self {
            source_ref: source_ref.to_string(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Validate,
    RetryExtract,
    ScreenshotFallback,
}

/// Transition policy evaluated after every extraction attempt. Pure:
/// depends only on the latest result's emptiness and the retry budget.
pub fn decide_after_extraction(
    latest: Option<&StrategyResult>,
    retry_count: u32,
    max_retries: u32,
) -> Transition {
    if latest.is_some_and(|r| !r.is_empty()) {
        return Transition::Validate;
    }
    if retry_count == 0 {
        return Transition::RetryExtract;
    }
    if retry_count < max_retries {
        return Transition::ScreenshotFallback;
    }
    // Budget spent: degrade gracefully with whatever is held.
    Transition::Validate
}

pub struct Pipeline {
    loader: Box<dyn ContentLoader>,
    prober: Box<dyn SourceProber>,
    capture: Box<dyn ScreenCapture>,
    model: Box<dyn ModelClient>,
    max_retries: u32,
    max_markup_chars: usize,
    rules: ValidationRules,
}

impl Pipeline {
    pub fn new(
        loader: Box<dyn ContentLoader>,
        prober: Box<dyn SourceProber>,
        capture: Box<dyn ScreenCapture>,
        model: Box<dyn ModelClient>,
        max_retries: u32,
        max_markup_chars: usize,
        rules: ValidationRules,
    ) -> Self {
        Self {
            loader,
            prober,
            capture,
            model,
            max_retries,
            max_markup_chars,
            rules,
        }
    }

    /// Drive a single run from initial input to validated output. One
    /// external call at a time; suspension points are exactly the
    /// collaborator calls.
    pub async fn run(&self, url: &str) -> PipelineState {
        ensure_metrics_described();
        let mut state = PipelineState::new(url);

        // Load. Failure is recorded, not raised: the screenshot fallback can
        // still produce records for an unloadable page.
        match self.loader.load(url).await {
            Ok(html) => {
                tracing::info!(chars = html.len(), "content loaded");
                state.rendered_content = Some(html);
            }
            Err(e) => {
                tracing::warn!(error = ?e, "content load failed");
                state.errors.push(format!("content load failed: {e:#}"));
            }
        }

        // Probe for a structured backend source.
        let probe = self.prober.probe(url).await;
        tracing::info!(found = probe.found, endpoint = ?probe.endpoint, "probe complete");

        // High-confidence, low-cost path: a non-empty API parse
        // short-circuits to validation without consuming a retry. An API
        // success with zero records falls through to the model path.
        if let Some(payload) = probe.payload.as_ref() {
            counter!("scrape_extract_attempts_total", "strategy" => Strategy::Api.as_str())
                .increment(1);
            let res = extract::api::extract_from_payload(payload);
            if !res.is_empty() {
                state.strategy_used = Some(Strategy::Api);
                state.latest_result = Some(res);
            } else {
                tracing::info!("structured source yielded no records, falling through to model");
            }
        }
        state.api_probe = Some(probe);

        if state.strategy_used.is_none() {
            self.attempt_content(&mut state, HintProfile::Initial).await;

            loop {
                match decide_after_extraction(
                    state.latest_result.as_ref(),
                    state.retry_count,
                    self.max_retries,
                ) {
                    Transition::Validate => break,
                    Transition::RetryExtract => {
                        state.retry_count += 1;
                        counter!("scrape_retries_total").increment(1);
                        tracing::info!(retry = state.retry_count, "retrying with refined hints");
                        self.attempt_content(&mut state, HintProfile::Refined).await;
                    }
                    Transition::ScreenshotFallback => {
                        state.retry_count += 1;
                        counter!("scrape_retries_total").increment(1);
                        tracing::info!(retry = state.retry_count, "falling back to screenshot");
                        self.attempt_screenshot(&mut state).await;
                    }
                }
            }

            state.strategy_used = state.latest_result.as_ref().map(|r| r.strategy);
        }

        self.finish(&mut state);
        state
    }

    async fn attempt_content(&self, state: &mut PipelineState, profile: HintProfile) {
        let result = match state.rendered_content.as_deref() {
            Some(markup) => {
                extract::content::extract_from_markup(
                    self.model.as_ref(),
                    markup,
                    profile,
                    self.max_markup_chars,
                )
                .await
            }
            None => StrategyResult::failed(
                Strategy::ContentModel,
                "no rendered content available for extraction",
            ),
        };
        record_attempt(state, result);
    }

    async fn attempt_screenshot(&self, state: &mut PipelineState) {
        let result = match self.capture.capture(&state.source_ref).await {
            Ok(image_b64) => {
                extract::image::extract_from_screenshot(self.model.as_ref(), &image_b64).await
            }
            Err(e) => {
                tracing::warn!(error = ?e, "screenshot capture failed");
                StrategyResult::failed(Strategy::ImageModel, format!("screenshot capture: {e:#}"))
            }
        };
        record_attempt(state, result);
    }

    /// Terminal step: hand whatever candidates exist to the validation
    /// engine. Always runs, even with nothing extracted.
    fn finish(&self, state: &mut PipelineState) {
        let records = state
            .latest_result
            .as_ref()
            .map(|r| r.records.clone())
            .unwrap_or_default();
        let today = today();
        let (validated, stats) = validate(records, today, &self.rules);

        tracing::info!("{}", stats.summary());
        counter!("scrape_records_validated_total").increment(stats.valid as u64);
        counter!("scrape_records_rejected_total", "rule" => "short_title")
            .increment(stats.removed_short_title as u64);
        counter!("scrape_records_rejected_total", "rule" => "unrealistic_date")
            .increment(stats.removed_unrealistic_date as u64);
        counter!("scrape_records_rejected_total", "rule" => "duplicate")
            .increment(stats.removed_duplicates as u64);

        state.validated = validated;
        state.stats = Some(stats);
    }
}

fn record_attempt(state: &mut PipelineState, result: StrategyResult) {
    counter!("scrape_extract_attempts_total", "strategy" => result.strategy.as_str()).increment(1);
    if result.is_empty() {
        let cause = result
            .error
            .clone()
            .unwrap_or_else(|| "returned 0 records".to_string());
        state
            .errors
            .push(format!("{} extraction failed: {cause}", result.strategy));
    }
    state.latest_result = Some(result);
}

fn today() -> NaiveDate {
    chrono::Utc::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_records(n: usize) -> StrategyResult {
        let records = (0..n)
            .map(|i| Announcement::new(format!("Circular number {i}"), None, 0.8))
            .collect();
        StrategyResult::ok(Strategy::ContentModel, records)
    }

    #[test]
    fn records_present_always_validates() {
        let r = with_records(1);
        for retry in [0, 1, 5] {
            assert_eq!(
                decide_after_extraction(Some(&r), retry, 3),
                Transition::Validate
            );
        }
    }

    #[test]
    fn first_failure_retries_with_refined_hints() {
        let empty = with_records(0);
        assert_eq!(
            decide_after_extraction(Some(&empty), 0, 3),
            Transition::RetryExtract
        );
        assert_eq!(decide_after_extraction(None, 0, 3), Transition::RetryExtract);
    }

    #[test]
    fn later_failures_fall_back_to_screenshot_within_budget() {
        let empty = with_records(0);
        assert_eq!(
            decide_after_extraction(Some(&empty), 1, 3),
            Transition::ScreenshotFallback
        );
        assert_eq!(
            decide_after_extraction(Some(&empty), 2, 3),
            Transition::ScreenshotFallback
        );
    }

    #[test]
    fn exhausted_budget_degrades_to_validation() {
        let empty = with_records(0);
        assert_eq!(
            decide_after_extraction(Some(&empty), 3, 3),
            Transition::Validate
        );
        assert_eq!(
            decide_after_extraction(Some(&empty), 1, 1),
            Transition::Validate
        );
    }
}
