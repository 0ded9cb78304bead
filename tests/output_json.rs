// tests/output_json.rs
// Artifact shape: date serialization, empty-run artifact, and absent
// optionals staying out of the JSON.

use chrono::NaiveDate;

use sebi_circular_scraper::output::save_json;
use sebi_circular_scraper::Announcement;

#[test]
fn dates_serialize_as_iso_and_absent_fields_are_omitted() {
    let dir = tempfile::tempdir().unwrap();
    let mut ann = Announcement::new(
        "SEBI Circular on Margin Requirements",
        NaiveDate::from_ymd_opt(2026, 2, 25),
        0.95,
    );
    ann.category = Some("SEBI".to_string());

    let path = save_json(&[ann], dir.path()).unwrap();
    let body = std::fs::read_to_string(&path).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&body).unwrap();

    let item = &parsed.as_array().unwrap()[0];
    assert_eq!(item["issue_date"], "2026-02-25");
    assert_eq!(item["category"], "SEBI");
    // Unset optionals are skipped entirely.
    assert!(item.get("pdf_url").is_none());
    assert!(item.get("local_path").is_none());
}

#[test]
fn empty_run_still_writes_an_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let path = save_json(&[], dir.path()).unwrap();

    assert!(path.ends_with("announcements.json"));
    let body = std::fs::read_to_string(&path).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(parsed, serde_json::json!([]));
}

#[test]
fn rewriting_replaces_the_previous_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let first = vec![Announcement::new("First Circular on Brokers", None, 0.8)];
    let second = vec![
        Announcement::new("Second Circular on Brokers", None, 0.8),
        Announcement::new("Third Circular on Brokers", None, 0.8),
    ];

    save_json(&first, dir.path()).unwrap();
    let path = save_json(&second, dir.path()).unwrap();

    let body = std::fs::read_to_string(&path).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(parsed.as_array().unwrap().len(), 2);
    assert!(!body.contains("First Circular"));
    // No leftover temp file.
    assert!(!dir.path().join("announcements.json.tmp").exists());
}
