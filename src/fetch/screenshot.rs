// src/fetch/screenshot.rs
//! Full-page screenshot capture via headless chromium, for the vision
//! fallback. The PNG is kept on disk next to the JSON artifact and handed to
//! the model as base64.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use base64::Engine;

use crate::config::Settings;

use super::{run_chromium, ScreenCapture};

pub struct BrowserCapture {
    headless: bool,
    timeout: Duration,
    out_dir: PathBuf,
}

impl BrowserCapture {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            headless: settings.headless,
            timeout: settings.page_timeout,
            out_dir: settings.output_dir.clone(),
        }
    }
}

#[async_trait]
impl ScreenCapture for BrowserCapture {
    async fn capture(&self, url: &str) -> Result<String> {
        std::fs::create_dir_all(&self.out_dir)
            .with_context(|| format!("creating {}", self.out_dir.display()))?;
        let path = self.out_dir.join("screenshot.png");

        tracing::info!(url, path = %path.display(), "capturing screenshot");
        run_chromium(
            self.headless,
            &[
                format!("--screenshot={}", path.display()),
                "--window-size=1920,1080".to_string(),
            ],
            url,
            self.timeout,
        )
        .await?;

        let bytes = tokio::fs::read(&path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        if bytes.is_empty() {
            return Err(anyhow!("browser produced an empty screenshot"));
        }

        let b64 = base64::engine::general_purpose::STANDARD.encode(&bytes);
        tracing::info!(bytes = bytes.len(), b64_len = b64.len(), "screenshot encoded");
        Ok(b64)
    }
}
