// tests/validator_properties.rs
// Black-box properties of the validation engine: idempotence, ordering, and
// a full mixed-batch pass through every rule at once.

use chrono::NaiveDate;

use sebi_circular_scraper::{validate, Announcement, ValidationRules};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn ann(title: &str, date: Option<NaiveDate>, conf: f32) -> Announcement {
    Announcement::new(title, date, conf)
}

fn today() -> NaiveDate {
    d(2026, 3, 1)
}

#[test]
fn mixed_batch_applies_every_rule() {
    let input = vec![
        ann("ABC", Some(d(1980, 1, 1)), 0.5),
        ann("SEBI Circular on Gold Valuation", Some(d(2026, 2, 25)), 0.6),
        ann("sebi circular on gold valuation", Some(d(2026, 2, 25)), 0.9),
    ];
    let (out, stats) = validate(input, today(), &ValidationRules::default());

    // Short title goes first (its 1980 date is never even examined), the
    // duplicate keeps the first occurrence, the keyword boost lifts 0.6.
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].title, "SEBI Circular on Gold Valuation");
    assert_eq!(out[0].confidence, 0.70);
    assert_eq!(stats.removed_short_title, 1);
    assert_eq!(stats.removed_duplicates, 1);
    assert_eq!(stats.valid, 1);
}

#[test]
fn validation_is_idempotent() {
    let input = vec![
        ann("SEBI Circular on Brokers", Some(d(2025, 6, 1)), 0.55),
        ann("Margin update", Some(d(2025, 6, 2)), 0.9),
        ann("Notification on Settlement Cycles", None, 0.8),
        ann("Circular for Portfolio Managers", Some(d(2025, 6, 3)), 0.75),
    ];
    let rules = ValidationRules::default();

    let (once, _) = validate(input, today(), &rules);
    let (twice, stats) = validate(once.clone(), today(), &rules);

    assert_eq!(once, twice);
    assert_eq!(stats.valid, stats.total_input);
    assert_eq!(stats.removed_duplicates, 0);
    assert_eq!(stats.remapped_to_aif, 0);
}

#[test]
fn input_order_is_preserved() {
    let titles = [
        "Zeta Circular on Custodians",
        "Alpha Notification on Brokers",
        "Middle Amendment to Margin Rules",
    ];
    let input: Vec<_> = titles
        .iter()
        .enumerate()
        .map(|(i, t)| ann(t, Some(d(2025, 1, i as u32 + 1)), 0.8))
        .collect();

    let (out, _) = validate(input, today(), &ValidationRules::default());
    let got: Vec<_> = out.iter().map(|a| a.title.as_str()).collect();
    assert_eq!(got, titles);
}

#[test]
fn all_output_confidences_are_in_the_unit_interval() {
    let input = vec![
        ann("SEBI Circular on Gold Valuation", Some(d(2025, 1, 1)), 7.5),
        ann("Notification on Margin Rules", Some(d(2025, 1, 2)), -2.0),
        ann("Plain announcement heading", Some(d(2025, 1, 3)), 0.5),
    ];
    let (out, _) = validate(input, today(), &ValidationRules::default());
    assert_eq!(out.len(), 3);
    for a in &out {
        assert!((0.0..=1.0).contains(&a.confidence), "{}", a.confidence);
    }
}

#[test]
fn empty_input_yields_empty_output_and_zeroed_stats() {
    let (out, stats) = validate(vec![], today(), &ValidationRules::default());
    assert!(out.is_empty());
    assert_eq!(stats.total_input, 0);
    assert_eq!(stats.valid, 0);
}

#[test]
fn configured_min_year_moves_the_cutoff() {
    let rules = ValidationRules::with_min_year(2020);
    let (out, stats) = validate(
        vec![
            ann("Older Circular on Depositories", Some(d(2015, 5, 5)), 0.9),
            ann("Recent Circular on Depositories", Some(d(2021, 5, 5)), 0.9),
        ],
        today(),
        &rules,
    );
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].title, "Recent Circular on Depositories");
    assert_eq!(stats.removed_unrealistic_date, 1);
}
