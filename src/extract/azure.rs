// src/extract/azure.rs
//! Azure OpenAI implementation of [`ModelClient`] over plain reqwest.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::config::Settings;

use super::ModelClient;

pub struct AzureModelClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    api_version: String,
    chat_deployment: String,
    vision_deployment: String,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}
#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}
#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

impl AzureModelClient {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("sebi-circular-scraper/0.1")
            .connect_timeout(Duration::from_secs(10))
            .timeout(settings.page_timeout)
            .build()
            .context("building reqwest client")?;
        Ok(Self {
            http,
            endpoint: settings.azure_endpoint.trim_end_matches('/').to_string(),
            api_key: settings.azure_key.clone(),
            api_version: settings.azure_api_version.clone(),
            chat_deployment: settings.llm_deployment.clone(),
            vision_deployment: settings.vision_deployment.clone(),
            temperature: settings.llm_temperature,
        })
    }

    async fn chat(&self, deployment: &str, messages: serde_json::Value) -> Result<String> {
        let url = format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint, deployment, self.api_version
        );
        let body = json!({
            "messages": messages,
            "temperature": self.temperature,
        });

        let resp = self
            .http
            .post(&url)
            .header("api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .context("sending chat completion request")?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            bail!("model call failed with {status}: {}", truncate(&detail, 300));
        }

        let parsed: ChatResponse = resp.json().await.context("decoding chat response")?;
        let content = parsed
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .unwrap_or_default();
        if content.is_empty() {
            bail!("model returned an empty completion");
        }
        Ok(content)
    }
}

#[async_trait]
impl ModelClient for AzureModelClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let messages = json!([
            {"role": "system", "content": system},
            {"role": "user", "content": user},
        ]);
        self.chat(&self.chat_deployment, messages).await
    }

    async fn complete_vision(&self, system: &str, user: &str, image_b64: &str) -> Result<String> {
        let messages = json!([
            {"role": "system", "content": system},
            {"role": "user", "content": [
                {"type": "text", "text": user},
                {"type": "image_url", "image_url": {
                    "url": format!("data:image/png;base64,{image_b64}"),
                    "detail": "high",
                }},
            ]},
        ]);
        self.chat(&self.vision_deployment, messages).await
    }

    fn name(&self) -> &'static str {
        "azure-openai"
    }
}

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
