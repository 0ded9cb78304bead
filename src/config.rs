// src/config.rs
// Env-backed settings with documented defaults. Values are read once at
// startup and treated as immutable for the duration of a run.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Result};

const DEFAULT_SEBI_URL: &str =
    "https://www.sebi.gov.in/sebiweb/home/HomeAction.do?doListing=yes&sid=1&ssid=7&smid=0";
const DEFAULT_AZURE_ENDPOINT: &str = "https://arcaquest-emr.openai.azure.com/";
const DEFAULT_AZURE_API_VERSION: &str = "2024-12-01-preview";
const DEFAULT_DEPLOYMENT: &str = "gpt-4.1-mini";

#[derive(Debug, Clone)]
pub struct Settings {
    /// Target listing page.
    pub url: String,

    // Azure OpenAI
    pub azure_endpoint: String,
    pub azure_key: String,
    pub azure_api_version: String,
    pub llm_deployment: String,
    pub vision_deployment: String,
    pub llm_temperature: f32,

    // Browser / loader
    pub headless: bool,
    pub page_timeout: Duration,
    /// Loader-internal attempt count. Not the state machine's retry budget.
    pub load_attempts: u32,
    pub retry_delay: Duration,

    /// Extraction-strategy retry budget consumed by the state machine.
    pub max_retries: u32,

    // Validation
    pub min_announcement_year: i32,

    // Extraction
    pub max_markup_chars: usize,

    // Output
    pub output_dir: PathBuf,
    pub download_pdfs: bool,
}

impl Settings {
    pub fn from_env() -> Self {
        let page_timeout_ms: u64 = env_parse("PAGE_TIMEOUT_MS", 60_000);
        let retry_delay_secs: f64 = env_parse("RETRY_DELAY_SECONDS", 2.0);
        Self {
            url: env_str("SEBI_URL", DEFAULT_SEBI_URL),
            azure_endpoint: env_str("AZURE_OPENAI_ENDPOINT", DEFAULT_AZURE_ENDPOINT),
            azure_key: env_str("AZURE_OPENAI_KEY", ""),
            azure_api_version: env_str("AZURE_OPENAI_API_VERSION", DEFAULT_AZURE_API_VERSION),
            llm_deployment: env_str("LLM_DEPLOYMENT", DEFAULT_DEPLOYMENT),
            vision_deployment: env_str("VISION_DEPLOYMENT", DEFAULT_DEPLOYMENT),
            llm_temperature: env_parse("LLM_TEMPERATURE", 0.0),
            headless: env_bool("HEADLESS", true),
            page_timeout: Duration::from_millis(page_timeout_ms),
            load_attempts: env_parse("LOAD_ATTEMPTS", 3).max(1),
            retry_delay: Duration::from_secs_f64(retry_delay_secs.max(0.0)),
            max_retries: env_parse("MAX_RETRIES", 3),
            min_announcement_year: env_parse("MIN_ANNOUNCEMENT_YEAR", 1992), // SEBI founded
            max_markup_chars: env_parse("MAX_HTML_CHARS_FOR_LLM", 60_000),
            output_dir: PathBuf::from(env_str("OUTPUT_DIR", "output")),
            download_pdfs: env_bool("DOWNLOAD_PDFS", false),
        }
    }

    /// The one fatal setup condition: without a model credential the pipeline
    /// cannot start at all.
    pub fn require_model_key(&self) -> Result<()> {
        if self.azure_key.trim().is_empty() {
            return Err(anyhow!(
                "AZURE_OPENAI_KEY is not set; export it or add it to a .env file"
            ));
        }
        Ok(())
    }
}

fn env_str(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_parse<T: FromStr + Copy>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(v) => matches!(v.to_ascii_lowercase().as_str(), "true" | "1" | "yes"),
        Err(_) => default,
    }
}
