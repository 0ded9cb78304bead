// src/main.rs
//! CLI entrypoint. Wires the concrete collaborators into the pipeline, runs
//! one scrape, writes the artifacts, and maps the outcome to an exit code:
//!
//!   0  at least one validated record
//!   1  run completed but produced zero validated records
//!   2  fatal setup error (missing credential, unbuildable client)

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use sebi_circular_scraper::config::Settings;
use sebi_circular_scraper::extract::azure::AzureModelClient;
use sebi_circular_scraper::fetch::download::PdfDownloader;
use sebi_circular_scraper::fetch::loader::PageLoader;
use sebi_circular_scraper::fetch::prober::EndpointProber;
use sebi_circular_scraper::fetch::screenshot::BrowserCapture;
use sebi_circular_scraper::output;
use sebi_circular_scraper::validate::ValidationRules;
use sebi_circular_scraper::Pipeline;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("sebi_circular_scraper=info,warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().compact())
        .init();
}

async fn run() -> i32 {
    dotenvy::dotenv().ok();
    init_tracing();

    let settings = Settings::from_env();
    if let Err(e) = settings.require_model_key() {
        eprintln!("setup error: {e:#}");
        return 2;
    }

    let pipeline = match build_pipeline(&settings) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("setup error: {e:#}");
            return 2;
        }
    };

    tracing::info!(url = %settings.url, "starting scrape");
    let mut state = pipeline.run(&settings.url).await;

    if settings.download_pdfs && !state.validated.is_empty() {
        match PdfDownloader::from_settings(&settings) {
            Ok(downloader) => {
                let today = chrono::Utc::now().date_naive();
                let fetched = downloader.fetch_all(&mut state.validated, today).await;
                tracing::info!(fetched, "pdf downloads complete");
            }
            Err(e) => tracing::warn!(error = ?e, "pdf downloader unavailable"),
        }
    }

    match output::save_json(&state.validated, &settings.output_dir) {
        Ok(path) => println!("Saved {} record(s) to {}", state.validated.len(), path.display()),
        Err(e) => tracing::error!(error = ?e, "failed to write artifact"),
    }

    if !state.validated.is_empty() {
        println!();
        print!("{}", output::render_table(&state.validated));
    }
    if let Some(strategy) = state.strategy_used {
        println!("\nStrategy: {strategy}");
    }
    if let Some(stats) = &state.stats {
        println!("{}", stats.summary());
    }
    for err in &state.errors {
        tracing::warn!(%err, "recorded during run");
    }

    if state.validated.is_empty() {
        tracing::warn!("run completed with zero validated records");
        1
    } else {
        0
    }
}

fn build_pipeline(settings: &Settings) -> anyhow::Result<Pipeline> {
    let loader = PageLoader::from_settings(settings)?;
    let prober = EndpointProber::from_settings(settings)?;
    let capture = BrowserCapture::from_settings(settings);
    let model = AzureModelClient::from_settings(settings)?;
    Ok(Pipeline::new(
        Box::new(loader),
        Box::new(prober),
        Box::new(capture),
        Box::new(model),
        settings.max_retries,
        settings.max_markup_chars,
        ValidationRules::with_min_year(settings.min_announcement_year),
    ))
}

#[tokio::main]
async fn main() {
    std::process::exit(run().await);
}
