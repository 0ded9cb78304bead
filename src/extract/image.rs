// src/extract/image.rs
//! Image+model strategy: last-resort extraction from a full-page screenshot
//! via a vision-capable model. Reading pixels is less reliable than reading
//! markup, so assigned confidence is capped.

use crate::types::{Strategy, StrategyResult};

use super::{parse_model_records, ModelClient, SYSTEM_PROMPT};

/// Ceiling on base confidence for vision-derived records.
pub const VISION_CONFIDENCE_CEILING: f32 = 0.70;

const VISION_PROMPT: &str = "\
This is a screenshot of the SEBI (Securities and Exchange Board of India) \
circulars listing page. Identify all visible announcement entries. For each, \
extract: title (the full announcement title), issue_date (normalised to \
YYYY-MM-DD), confidence (0.0 - 1.0). Return ONLY the JSON array.";

/// Run the vision strategy over a base64-encoded PNG screenshot.
pub async fn extract_from_screenshot(model: &dyn ModelClient, image_b64: &str) -> StrategyResult {
    tracing::info!(provider = model.name(), b64_len = image_b64.len(), "vision extraction");

    let raw = match model.complete_vision(SYSTEM_PROMPT, VISION_PROMPT, image_b64).await {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!(error = ?e, "vision model call failed");
            return StrategyResult::failed(Strategy::ImageModel, format!("vision call: {e:#}"));
        }
    };

    match parse_model_records(&raw, VISION_CONFIDENCE_CEILING) {
        Some(mut records) => {
            for r in &mut records {
                r.confidence = r.confidence.min(VISION_CONFIDENCE_CEILING);
            }
            tracing::info!(count = records.len(), "vision model extracted records");
            StrategyResult::ok(Strategy::ImageModel, records)
        }
        None => StrategyResult::failed(
            Strategy::ImageModel,
            "could not parse vision model output as records",
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;

    struct VisionModel(&'static str);

    #[async_trait]
    impl ModelClient for VisionModel {
        async fn complete(&self, _s: &str, _u: &str) -> Result<String> {
            unreachable!("vision strategy never calls the text surface")
        }
        async fn complete_vision(&self, _s: &str, _u: &str, _i: &str) -> Result<String> {
            Ok(self.0.to_string())
        }
        fn name(&self) -> &'static str {
            "vision-stub"
        }
    }

    #[tokio::test]
    async fn confidence_is_capped() {
        let model = VisionModel(
            r#"[{"title":"SEBI Circular on Brokers","issue_date":"2026-02-25","confidence":0.95}]"#,
        );
        let res = extract_from_screenshot(&model, "aW1n").await;
        assert!(res.succeeded);
        assert_eq!(res.records[0].confidence, VISION_CONFIDENCE_CEILING);
    }

    #[tokio::test]
    async fn wrapped_object_output_is_accepted() {
        let model = VisionModel(
            r#"{"announcements":[{"title":"Amendment to Margin Rules","issue_date":"2026-01-10"}]}"#,
        );
        let res = extract_from_screenshot(&model, "aW1n").await;
        assert_eq!(res.records.len(), 1);
    }
}
