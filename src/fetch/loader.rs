// src/fetch/loader.rs
//! Page loader: renders the target with headless chromium (`--dump-dom`) so
//! JS-built listings are present, falling back to a plain HTTP GET when no
//! browser is available. Retries internally; these attempts are invisible to
//! the orchestrator's extraction retry budget.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;

use crate::config::Settings;

use super::{run_chromium, ContentLoader, BROWSER_USER_AGENT};

/// Rendered output shorter than this is a blank or error shell, not a page.
const MIN_PAGE_CHARS: usize = 256;

pub struct PageLoader {
    http: reqwest::Client,
    headless: bool,
    timeout: Duration,
    attempts: u32,
    retry_delay: Duration,
}

impl PageLoader {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .connect_timeout(Duration::from_secs(10))
            .timeout(settings.page_timeout)
            .build()
            .context("building reqwest client")?;
        Ok(Self {
            http,
            headless: settings.headless,
            timeout: settings.page_timeout,
            attempts: settings.load_attempts,
            retry_delay: settings.retry_delay,
        })
    }

    async fn render_with_browser(&self, url: &str) -> Result<String> {
        let output = run_chromium(
            self.headless,
            &["--dump-dom".to_string()],
            url,
            self.timeout,
        )
        .await?;
        let html = String::from_utf8_lossy(&output.stdout).to_string();
        validate_markup(&html)?;
        Ok(html)
    }

    async fn fetch_plain(&self, url: &str) -> Result<String> {
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .context("fetching page over http")?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("page fetch returned {status}"));
        }
        let html = resp.text().await.context("reading page body")?;
        validate_markup(&html)?;
        Ok(html)
    }
}

fn validate_markup(html: &str) -> Result<()> {
    if html.len() < MIN_PAGE_CHARS || !html.contains('<') {
        return Err(anyhow!(
            "rendered output too small to be a page ({} chars)",
            html.len()
        ));
    }
    Ok(())
}

#[async_trait]
impl ContentLoader for PageLoader {
    async fn load(&self, url: &str) -> Result<String> {
        let mut last_err = anyhow!("no load attempts made");
        for attempt in 1..=self.attempts {
            tracing::info!(attempt, total = self.attempts, url, "loading page");

            match self.render_with_browser(url).await {
                Ok(html) => {
                    tracing::info!(chars = html.len(), "page rendered via browser");
                    return Ok(html);
                }
                Err(e) => {
                    tracing::debug!(error = ?e, "browser render unavailable, trying plain http");
                }
            }

            match self.fetch_plain(url).await {
                Ok(html) => {
                    tracing::info!(chars = html.len(), "page fetched over http");
                    return Ok(html);
                }
                Err(e) => {
                    tracing::warn!(attempt, error = ?e, "page load attempt failed");
                    last_err = e;
                }
            }

            if attempt < self.attempts {
                tokio::time::sleep(self.retry_delay).await;
            }
        }
        Err(last_err.context(format!("failed to load page after {} attempts", self.attempts)))
    }
}
