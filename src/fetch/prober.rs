// src/fetch/prober.rs
//! Structured-source prober. Fetches the target page, scans its markup for
//! XHR-ish endpoint URLs, and probes each one for a JSON payload shaped like
//! an announcement listing. A hit lets the pipeline bypass the model
//! entirely.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use once_cell::sync::OnceCell;
use regex::Regex;

use crate::config::Settings;
use crate::extract::api::looks_like_announcement_listing;
use crate::types::ProbeResult;

use super::{SourceProber, BROWSER_USER_AGENT};

/// Upper bound on endpoints probed per run; keeps a pathological page from
/// turning the probe phase into a crawl.
const MAX_CANDIDATES: usize = 5;

pub struct EndpointProber {
    http: reqwest::Client,
}

impl EndpointProber {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .connect_timeout(Duration::from_secs(10))
            .timeout(settings.page_timeout)
            .build()
            .context("building reqwest client")?;
        Ok(Self { http })
    }

    async fn probe_inner(&self, url: &str) -> Result<ProbeResult> {
        let page = self
            .http
            .get(url)
            .send()
            .await
            .context("fetching page for probing")?
            .text()
            .await
            .context("reading page body")?;

        let candidates = candidate_endpoints(&page, url);
        tracing::info!(count = candidates.len(), "probing candidate endpoints");

        for endpoint in candidates.into_iter().take(MAX_CANDIDATES) {
            match self.fetch_json(&endpoint).await {
                Ok(Some(payload)) if looks_like_announcement_listing(&payload) => {
                    tracing::info!(endpoint, "found announcement listing endpoint");
                    return Ok(ProbeResult::found(endpoint, payload));
                }
                Ok(_) => tracing::debug!(endpoint, "endpoint payload not announcement-shaped"),
                Err(e) => tracing::debug!(endpoint, error = ?e, "endpoint probe failed"),
            }
        }
        Ok(ProbeResult::default())
    }

    async fn fetch_json(&self, endpoint: &str) -> Result<Option<serde_json::Value>> {
        let resp = self
            .http
            .get(endpoint)
            .header("Accept", "application/json")
            .send()
            .await
            .context("probing endpoint")?;
        if !resp.status().is_success() {
            return Ok(None);
        }
        let body = resp.text().await.context("reading endpoint body")?;
        Ok(serde_json::from_str(&body).ok())
    }
}

#[async_trait]
impl SourceProber for EndpointProber {
    /// "Not found" and any transient error both collapse into a not-found
    /// result; probing is strictly best-effort.
    async fn probe(&self, url: &str) -> ProbeResult {
        match self.probe_inner(url).await {
            Ok(res) => res,
            Err(e) => {
                tracing::warn!(error = ?e, "network probe failed (non-fatal)");
                ProbeResult::default()
            }
        }
    }
}

/// Pull URLs that look like data endpoints out of page markup: quoted paths
/// mentioning json/api/ajax or the listing action, in script bodies or
/// attributes. Relative paths are resolved against the page's origin.
pub(crate) fn candidate_endpoints(markup: &str, page_url: &str) -> Vec<String> {
    static RE_URL: OnceCell<Regex> = OnceCell::new();
    let re = RE_URL.get_or_init(|| {
        Regex::new(r#"["']([^"'\s]{4,300}?(?:\.json|/api/|ajax|doListing)[^"'\s]{0,200}?)["']"#)
            .unwrap()
    });

    let origin = origin_of(page_url);
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for cap in re.captures_iter(markup) {
        let raw = &cap[1];
        let absolute = if raw.starts_with("http://") || raw.starts_with("https://") {
            raw.to_string()
        } else if raw.starts_with('/') {
            match &origin {
                Some(o) => format!("{o}{raw}"),
                None => continue,
            }
        } else {
            continue;
        };
        if absolute != page_url && seen.insert(absolute.clone()) {
            out.push(absolute);
        }
    }
    out
}

/// `scheme://host[:port]` of a URL, without a URL-parsing dependency.
fn origin_of(url: &str) -> Option<String> {
    let scheme_end = url.find("://")?;
    let rest = &url[scheme_end + 3..];
    let host_end = rest.find('/').unwrap_or(rest.len());
    Some(format!("{}{}", &url[..scheme_end + 3], &rest[..host_end]))
}
