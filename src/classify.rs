// src/classify.rs
// Pure leaf functions: open/closed derivation from raw feed fields, and the
// recency gate for first-time ingestion.

use std::collections::HashMap;

use chrono::{Duration, NaiveDate};

/// Default number of days a grant's `updated_at` may lag before first-time
/// ingestion is skipped.
pub const DEFAULT_RECENCY_CUTOFF_DAYS: i64 = 14;

/// Derive the open/closed status of a grant from its closing-date descriptors
/// and availability flags. First match wins:
/// 1. any closing-date text containing "open" (case-insensitive) -> open
/// 2. any availability flag set -> open
/// 3. closing dates present but none say open -> closed
/// 4. no closing-date data at all -> open
pub fn is_open(
    closing_dates: &HashMap<String, Option<String>>,
    available: &HashMap<String, bool>,
) -> bool {
    if closing_dates
        .values()
        .flatten()
        .any(|text| text.to_lowercase().contains("open"))
    {
        return true;
    }
    if available.values().any(|&flag| flag) {
        return true;
    }
    closing_dates.is_empty()
}

/// Whether an unseen grant is fresh enough to warrant full ingestion.
/// Missing or unparseable dates fail open: it is cheaper to re-ingest than to
/// silently drop a grant. The boundary is inclusive on whole dates.
pub fn is_recently_updated(updated_at: Option<&str>, cutoff_days: i64, today: NaiveDate) -> bool {
    let Some(raw) = updated_at else {
        return true;
    };
    match NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
        Ok(date) => date >= today - Duration::days(cutoff_days),
        Err(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dates(pairs: &[(&str, Option<&str>)]) -> HashMap<String, Option<String>> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.map(str::to_string)))
            .collect()
    }

    fn flags(pairs: &[(&str, bool)]) -> HashMap<String, bool> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn open_substring_wins_regardless_of_flags() {
        let cd = dates(&[("individual", Some("Open for Applications"))]);
        assert!(is_open(&cd, &flags(&[("individual", false)])));

        let cd = dates(&[("org", Some("OPENING SOON")), ("other", Some("Closed"))]);
        assert!(is_open(&cd, &HashMap::new()));
    }

    #[test]
    fn availability_flag_opens_when_no_open_text() {
        let cd = dates(&[("org", Some("Applications closed"))]);
        assert!(is_open(&cd, &flags(&[("org", true)])));
    }

    #[test]
    fn closing_data_without_open_means_closed() {
        let cd = dates(&[("org", Some("Applications closed")), ("ind", None)]);
        assert!(!is_open(&cd, &flags(&[("org", false)])));
    }

    #[test]
    fn no_data_defaults_to_open() {
        assert!(is_open(&HashMap::new(), &HashMap::new()));
    }

    #[test]
    fn null_closing_values_still_count_as_data() {
        // A map with only null values has keys, so rule 3 applies.
        let cd = dates(&[("org", None)]);
        assert!(!is_open(&cd, &HashMap::new()));
    }

    #[test]
    fn recency_missing_or_garbage_passes() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 24).unwrap();
        assert!(is_recently_updated(None, 14, today));
        assert!(is_recently_updated(Some("not-a-date"), 14, today));
        assert!(is_recently_updated(Some("24/08/2026"), 14, today));
    }

    #[test]
    fn recency_boundary_is_inclusive() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 24).unwrap();
        assert!(is_recently_updated(Some("2026-08-10"), 14, today)); // exactly 14 days
        assert!(!is_recently_updated(Some("2026-08-09"), 14, today)); // one day over
        assert!(is_recently_updated(Some("2026-08-24"), 14, today));
    }
}
