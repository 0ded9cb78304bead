// src/output.rs
//! Run artifacts: the JSON file plus a console table. The JSON file is
//! written even for an empty run, so downstream consumers can distinguish
//! "ran and found nothing" from "never ran".

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::types::Announcement;

const ARTIFACT_NAME: &str = "announcements.json";
const TABLE_TITLE_WIDTH: usize = 70;

/// Serialize validated records to `<dir>/announcements.json`. Written to a
/// temp file in the same directory and renamed so a crash never leaves a
/// half-written artifact.
pub fn save_json(records: &[Announcement], dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

    let body = serde_json::to_vec_pretty(records).context("serializing records")?;
    let path = dir.join(ARTIFACT_NAME);
    let tmp = dir.join(format!("{ARTIFACT_NAME}.tmp"));
    std::fs::write(&tmp, &body).with_context(|| format!("writing {}", tmp.display()))?;
    std::fs::rename(&tmp, &path)
        .with_context(|| format!("renaming into place at {}", path.display()))?;

    tracing::info!(path = %path.display(), count = records.len(), "artifact written");
    Ok(path)
}

/// Fixed-width summary table for the console.
pub fn render_table(records: &[Announcement]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:<4} {:<12} {:<6} {}\n",
        "No.", "Issue Date", "Conf.", "Title"
    ));
    out.push_str(&"-".repeat(4 + 1 + 12 + 1 + 6 + 1 + TABLE_TITLE_WIDTH));
    out.push('\n');
    for (i, ann) in records.iter().enumerate() {
        let date = ann
            .issue_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!(
            "{:<4} {:<12} {:<6.2} {}\n",
            i + 1,
            date,
            ann.confidence,
            truncate_chars(&ann.title, TABLE_TITLE_WIDTH)
        ));
    }
    out
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let cut: String = s.chars().take(max.saturating_sub(3)).collect();
    format!("{cut}...")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn table_shows_dash_for_missing_date_and_truncates_titles() {
        let mut long = Announcement::new("t".repeat(200), None, 0.5);
        long.title.insert_str(0, "SEBI ");
        let records = vec![
            Announcement::new(
                "SEBI Circular on Margin Requirements",
                NaiveDate::from_ymd_opt(2026, 2, 25),
                0.95,
            ),
            long,
        ];
        let table = render_table(&records);
        assert!(table.contains("2026-02-25"));
        assert!(table.contains("0.95"));
        let undated_line = table.lines().nth(3).unwrap();
        assert!(undated_line.contains(" - "));
        assert!(undated_line.trim_end().ends_with("..."));
    }
}
