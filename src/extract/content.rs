// src/extract/content.rs
//! Content+model strategy: cleaned page markup goes to the chat model for
//! semantic extraction. The refined hint profile is used on retry and calls
//! out the failure modes seen in practice.

use crate::types::{Strategy, StrategyResult};

use super::{clean_markup, parse_model_records, HintProfile, ModelClient, SYSTEM_PROMPT};

/// Base confidence when the model omits one. Below the API strategy, above
/// the vision ceiling.
pub const CONTENT_BASE_CONFIDENCE: f32 = 0.75;

const EXTRACTION_PROMPT: &str = "\
Analyse the following HTML content from the SEBI website. Identify all \
repeating announcement / circular entries on the page. For each entry \
extract: title (full announcement title text), issue_date (normalised to \
YYYY-MM-DD), confidence (0.0 - 1.0). Return ONLY the JSON array.

The HTML content:
---
{markup}
---";

const REFINED_PROMPT: &str = "\
The previous extraction attempt produced invalid or incomplete results. Try \
again with extra care. Common issues to watch for: dates embedded in URLs \
(e.g. /jan-2026/ means January 2026); dates appearing as separate text near \
the title; titles that span multiple lines; dates in Indian format \
(DD/MM/YYYY or DD-Mon-YYYY). For each entry extract: title, issue_date \
(YYYY-MM-DD), confidence (0.0 - 1.0). Return ONLY the JSON array.

The HTML content:
---
{markup}
---";

/// Run the content+model strategy over rendered markup. Absorbs all
/// recoverable errors into the returned [`StrategyResult`].
pub async fn extract_from_markup(
    model: &dyn ModelClient,
    markup: &str,
    profile: HintProfile,
    max_chars: usize,
) -> StrategyResult {
    let cleaned = clean_markup(markup, max_chars);
    let template = match profile {
        HintProfile::Initial => EXTRACTION_PROMPT,
        HintProfile::Refined => REFINED_PROMPT,
    };
    let user = template.replace("{markup}", &cleaned);

    tracing::info!(
        provider = model.name(),
        profile = ?profile,
        chars = cleaned.len(),
        "content extraction"
    );

    let raw = match model.complete(SYSTEM_PROMPT, &user).await {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!(error = ?e, "model call failed");
            return StrategyResult::failed(Strategy::ContentModel, format!("model call: {e:#}"));
        }
    };

    match parse_model_records(&raw, CONTENT_BASE_CONFIDENCE) {
        Some(records) => {
            tracing::info!(count = records.len(), "model extracted records from markup");
            StrategyResult::ok(Strategy::ContentModel, records)
        }
        None => StrategyResult::failed(
            Strategy::ContentModel,
            "could not parse model output as records",
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct ScriptedModel {
        reply: Result<String, String>,
        last_user: Mutex<String>,
    }

    impl ScriptedModel {
        fn replying(s: &str) -> Self {
            Self {
                reply: Ok(s.to_string()),
                last_user: Mutex::new(String::new()),
            }
        }
    }

    #[async_trait]
    impl ModelClient for ScriptedModel {
        async fn complete(&self, _system: &str, user: &str) -> Result<String> {
            *self.last_user.lock().unwrap() = user.to_string();
            self.reply.clone().map_err(|e| anyhow!(e))
        }
        async fn complete_vision(&self, _s: &str, _u: &str, _i: &str) -> Result<String> {
            unreachable!("content strategy never calls vision")
        }
        fn name(&self) -> &'static str {
            "scripted"
        }
    }

    #[tokio::test]
    async fn parses_model_reply_with_default_confidence() {
        let model =
            ScriptedModel::replying(r#"[{"title":"SEBI Circular on Brokers","issue_date":"2026-02-25"}]"#);
        let res = extract_from_markup(&model, "<table>x</table>", HintProfile::Initial, 1000).await;
        assert!(res.succeeded);
        assert_eq!(res.records[0].confidence, CONTENT_BASE_CONFIDENCE);
    }

    #[tokio::test]
    async fn refined_profile_switches_prompt() {
        let model = ScriptedModel::replying("[]");
        let _ = extract_from_markup(&model, "<p>page</p>", HintProfile::Refined, 1000).await;
        let user = model.last_user.lock().unwrap().clone();
        assert!(user.contains("previous extraction attempt"));
    }

    #[tokio::test]
    async fn model_failure_becomes_failed_result() {
        let model = ScriptedModel {
            reply: Err("connect timeout".to_string()),
            last_user: Mutex::new(String::new()),
        };
        let res = extract_from_markup(&model, "<p>page</p>", HintProfile::Initial, 1000).await;
        assert!(!res.succeeded);
        assert!(res.error.as_deref().unwrap().contains("connect timeout"));
    }

    #[tokio::test]
    async fn unparseable_reply_is_a_parse_failure() {
        let model = ScriptedModel::replying("I could not find any announcements, sorry.");
        let res = extract_from_markup(&model, "<p>page</p>", HintProfile::Initial, 1000).await;
        assert!(!res.succeeded);
        assert!(res.error.is_some());
    }
}
