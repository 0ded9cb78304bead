// src/fetch/download.rs
//! PDF discovery and download for validated records. SEBI detail pages embed
//! the document in an iframe whose `src` carries a `file=` parameter; a bare
//! `.pdf` link is the fallback. Downloads land in a
//! `category/subfolder/YYYY/Month/` tree.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use once_cell::sync::OnceCell;
use regex::Regex;

use crate::config::Settings;
use crate::types::Announcement;

use super::BROWSER_USER_AGENT;

const DEFAULT_SUBFOLDER: &str = "Circulars";
const MAX_FILENAME_CHARS: usize = 60;

pub struct PdfDownloader {
    http: reqwest::Client,
    base_dir: PathBuf,
}

impl PdfDownloader {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .context("building reqwest client")?;
        Ok(Self {
            http,
            base_dir: settings.output_dir.join("pdfs"),
        })
    }

    /// Resolve and download PDFs for every record carrying a detail URL.
    /// Per-record failures are logged and skipped; returns the count fetched.
    pub async fn fetch_all(&self, records: &mut [Announcement], today: NaiveDate) -> usize {
        let mut fetched = 0;
        for ann in records.iter_mut() {
            match self.fetch_one(ann, today).await {
                Ok(true) => fetched += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(title = %ann.title, error = ?e, "pdf download failed");
                }
            }
        }
        fetched
    }

    async fn fetch_one(&self, ann: &mut Announcement, today: NaiveDate) -> Result<bool> {
        if ann.pdf_url.is_none() {
            let Some(detail) = ann.detail_url.clone() else {
                return Ok(false);
            };
            ann.pdf_url = self.resolve_pdf_url(&detail).await;
        }
        let Some(pdf_url) = ann.pdf_url.clone() else {
            return Ok(false);
        };

        let category = ann.category.as_deref().unwrap_or("SEBI");
        let dir = structured_path(&self.base_dir, category, DEFAULT_SUBFOLDER, ann.issue_date, today);
        let file_name = format!("{}.pdf", sanitize_filename(&ann.title));
        let path = dir.join(&file_name);

        tracing::info!(url = %pdf_url, path = %path.display(), "downloading pdf");
        let resp = self
            .http
            .get(&pdf_url)
            .send()
            .await
            .context("requesting pdf")?;
        if !resp.status().is_success() {
            return Err(anyhow!("pdf fetch returned {}", resp.status()));
        }
        let bytes = resp.bytes().await.context("reading pdf body")?;

        std::fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
        std::fs::write(&path, &bytes).with_context(|| format!("writing {}", path.display()))?;

        ann.file_name = Some(file_name);
        ann.local_path = Some(path.display().to_string());
        Ok(true)
    }

    /// Fetch the intermediate detail page and pull the direct PDF URL out of
    /// its markup.
    async fn resolve_pdf_url(&self, detail_url: &str) -> Option<String> {
        let page = self
            .http
            .get(detail_url)
            .send()
            .await
            .ok()?
            .text()
            .await
            .ok()?;
        extract_pdf_url(&page)
    }
}

/// `iframe src="...file=<url>"` first, then any `.pdf` href.
pub(crate) fn extract_pdf_url(markup: &str) -> Option<String> {
    static RE_IFRAME: OnceCell<Regex> = OnceCell::new();
    static RE_LINK: OnceCell<Regex> = OnceCell::new();
    let re_iframe = RE_IFRAME.get_or_init(|| {
        Regex::new(r#"(?is)<iframe[^>]*src=["'][^"']*?[?&]file=([^"'&]+)"#).unwrap()
    });
    let re_link =
        RE_LINK.get_or_init(|| Regex::new(r#"(?i)href=["']([^"']+\.pdf)["']"#).unwrap());

    if let Some(cap) = re_iframe.captures(markup) {
        return Some(cap[1].to_string());
    }
    re_link.captures(markup).map(|cap| cap[1].to_string())
}

/// `base/category/subfolder/YYYY/Month/`; undated records file under today.
fn structured_path(
    base: &Path,
    category: &str,
    subfolder: &str,
    issue_date: Option<NaiveDate>,
    today: NaiveDate,
) -> PathBuf {
    let d = issue_date.unwrap_or(today);
    base.join(category)
        .join(subfolder)
        .join(d.format("%Y").to_string())
        .join(d.format("%B").to_string())
}

fn sanitize_filename(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .map(|c| if c.is_alphanumeric() || c == ' ' || c == '-' { c } else { ' ' })
        .collect();
    cleaned
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .take(MAX_FILENAME_CHARS)
        .collect()
}
