// src/lib.rs
// Public library surface for the SEBI circular scraper.

pub mod config;
pub mod extract;
pub mod fetch;
pub mod output;
pub mod pipeline;
pub mod types;
pub mod validate;

pub use config::Settings;
pub use pipeline::{decide_after_extraction, Pipeline, PipelineState, Transition};
pub use types::{Announcement, ProbeResult, Strategy, StrategyResult};
pub use validate::{validate, ValidationRules, ValidationStats};
