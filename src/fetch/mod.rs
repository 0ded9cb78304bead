// src/fetch/mod.rs
//! I/O collaborators: page loading, structured-source probing, screenshot
//! capture, and PDF download. Each is a narrow trait so the pipeline can be
//! exercised with stubs.

pub mod download;
pub mod loader;
pub mod prober;
pub mod screenshot;

use std::process::Output;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;

use crate::types::ProbeResult;

/// Returns fully rendered page markup. Implementations retry internally up
/// to their configured attempt count before surfacing failure.
#[async_trait]
pub trait ContentLoader: Send + Sync {
    async fn load(&self, url: &str) -> Result<String>;
}

/// Looks for a backend data endpoint serving the target information as
/// directly parseable JSON. Never fails for "not found".
#[async_trait]
pub trait SourceProber: Send + Sync {
    async fn probe(&self, url: &str) -> ProbeResult;
}

/// Captures a full-page screenshot of the target, returned as base64 PNG.
#[async_trait]
pub trait ScreenCapture: Send + Sync {
    async fn capture(&self, url: &str) -> Result<String>;
}

const BROWSER_CANDIDATES: &[&str] = &[
    "chromium",
    "chromium-browser",
    "google-chrome",
    "google-chrome-stable",
];

const BROWSER_BIN_ENV: &str = "SCRAPER_BROWSER_BIN";

pub(crate) const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Run a headless-chromium invocation with the given extra args, trying the
/// env-configured binary first and then well-known names.
pub(crate) async fn run_chromium(
    headless: bool,
    extra_args: &[String],
    url: &str,
    timeout: Duration,
) -> Result<Output> {
    let mut args: Vec<String> = Vec::new();
    if headless {
        args.push("--headless=new".to_string());
    }
    args.push("--disable-gpu".to_string());
    args.push("--no-sandbox".to_string());
    args.push(format!("--user-agent={BROWSER_USER_AGENT}"));
    // Let late XHR-driven rendering settle before the page is read.
    args.push("--virtual-time-budget=10000".to_string());
    args.extend_from_slice(extra_args);
    args.push(url.to_string());

    let mut last_err: Option<anyhow::Error> = None;
    for bin in browser_candidates() {
        let child = tokio::process::Command::new(&bin)
            .args(&args)
            .kill_on_drop(true)
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .spawn();
        let child = match child {
            Ok(c) => c,
            Err(e) => {
                // Binary not present; try the next candidate.
                last_err = Some(anyhow!(e).context(format!("spawning {bin}")));
                continue;
            }
        };

        let output = tokio::time::timeout(timeout, child.wait_with_output())
            .await
            .map_err(|_| anyhow!("browser timed out after {timeout:?}"))?
            .with_context(|| format!("waiting for {bin}"))?;

        if output.status.success() {
            return Ok(output);
        }
        last_err = Some(anyhow!(
            "{bin} exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr)
                .chars()
                .take(200)
                .collect::<String>()
        ));
    }

    Err(last_err.unwrap_or_else(|| anyhow!("no chromium binary found")))
}

fn browser_candidates() -> Vec<String> {
    let mut out = Vec::new();
    if let Ok(bin) = std::env::var(BROWSER_BIN_ENV) {
        if !bin.trim().is_empty() {
            out.push(bin);
        }
    }
    out.extend(BROWSER_CANDIDATES.iter().map(|s| s.to_string()));
    out
}
