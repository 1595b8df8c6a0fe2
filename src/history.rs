//! Reads the previously written summary back into per-month counts.
//!
//! Two shapes are understood. The current one carries `monthly_series`
//! (`[{"ym": "YYYY-MM", "users": N}]`). The older daily shape carries `series`
//! (`[{"date": "YYYYMMDD", "users": N}]`) and is collapsed into months. Nothing
//! here fails: an unreadable or unrecognised file is treated as no history.

use crate::types::{MonthKey, MonthlyCount};
use crate::util::compact_date_to_key;
use serde_json::Value;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, warn};

const MONTHLY_FIELD: &str = "monthly_series";
const DAILY_FIELD: &str = "series";

/// Load history from `path`. Missing or corrupt files give an empty map.
pub fn load_history(path: &Path) -> MonthlyCount {
    match std::fs::read(path) {
        Ok(bytes) => parse_history(&bytes),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("no existing summary at {}", path.display());
            MonthlyCount::new()
        }
        Err(e) => {
            warn!("ignoring unreadable summary {}: {}", path.display(), e);
            MonthlyCount::new()
        }
    }
}

pub fn parse_history(bytes: &[u8]) -> MonthlyCount {
    match serde_json::from_slice::<Value>(bytes) {
        Ok(doc) => decode_history(&doc),
        Err(e) => {
            warn!("ignoring malformed summary: {}", e);
            MonthlyCount::new()
        }
    }
}

/// Normalize a decoded summary document into per-month counts.
///
/// The monthly series wins when both shapes are present. Repeated months are
/// summed rather than overwritten.
pub fn decode_history(doc: &Value) -> MonthlyCount {
    let mut monthly = MonthlyCount::new();

    let Some(obj) = doc.as_object() else {
        warn!("ignoring summary that is not a JSON object");
        return monthly;
    };

    if let Some(Value::Array(items)) = obj.get(MONTHLY_FIELD) {
        for item in items {
            let Some(key) = item.get("ym").and_then(Value::as_str).and_then(|s| s.parse::<MonthKey>().ok())
            else {
                continue;
            };
            add_count(&mut monthly, key, coerce_count(item.get("users")));
        }
    } else if let Some(Value::Array(items)) = obj.get(DAILY_FIELD) {
        for item in items {
            let Some(key) = item.get("date").and_then(Value::as_str).and_then(compact_date_to_key) else {
                continue;
            };
            add_count(&mut monthly, key, coerce_count(item.get("users")));
        }
        debug!("collapsed daily history into {} months", monthly.len());
    } else {
        warn!("summary has neither {} nor {}", MONTHLY_FIELD, DAILY_FIELD);
    }

    monthly
}

fn add_count(monthly: &mut MonthlyCount, key: MonthKey, users: u64) {
    let slot = monthly.entry(key).or_insert(0);
    *slot = slot.saturating_add(users);
}

/// Non-negative integer counts pass through; floats truncate; numeric strings
/// parse. Everything else, including negatives, is zero.
fn coerce_count(value: Option<&Value>) -> u64 {
    match value {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn counts(pairs: &[(&str, u64)]) -> MonthlyCount {
        pairs.iter().map(|(k, v)| (k.parse().unwrap(), *v)).collect()
    }

    #[test]
    fn test_monthly_schema() {
        let doc = json!({
            "monthly_series": [{"ym": "2024-01", "users": 12}, {"ym": "2024-02", "users": 3}],
            "total_users": 15
        });
        assert_eq!(decode_history(&doc), counts(&[("2024-01", 12), ("2024-02", 3)]));
    }

    #[test]
    fn test_monthly_duplicates_accumulate() {
        let doc = json!({
            "monthly_series": [
                {"ym": "2024-01", "users": 12},
                {"ym": "2024-01", "users": 8}
            ]
        });
        assert_eq!(decode_history(&doc), counts(&[("2024-01", 20)]));
    }

    #[test]
    fn test_huge_duplicate_counts_saturate() {
        let doc = json!({
            "monthly_series": [
                {"ym": "2020-01", "users": 1e30},
                {"ym": "2020-01", "users": 1},
                {"ym": "2020-02", "users": "18446744073709551615"},
                {"ym": "2020-02", "users": "18446744073709551615"}
            ]
        });
        assert_eq!(decode_history(&doc), counts(&[("2020-01", u64::MAX), ("2020-02", u64::MAX)]));

        let doc = json!({
            "series": [{"date": "20200101", "users": 1e30}, {"date": "20200102", "users": 7}]
        });
        assert_eq!(decode_history(&doc), counts(&[("2020-01", u64::MAX)]));
    }

    #[test]
    fn test_legacy_daily_schema_collapses_to_months() {
        let doc = json!({
            "series": [
                {"date": "20240101", "users": 5},
                {"date": "20240115", "users": 7},
                {"date": "20240201", "users": 3}
            ],
            "total": 15,
            "generated_at": "2024-02-02T00:00:00Z"
        });
        assert_eq!(decode_history(&doc), counts(&[("2024-01", 12), ("2024-02", 3)]));
    }

    #[test]
    fn test_monthly_schema_wins_over_legacy() {
        let doc = json!({
            "monthly_series": [{"ym": "2024-03", "users": 1}],
            "series": [{"date": "20240101", "users": 5}]
        });
        assert_eq!(decode_history(&doc), counts(&[("2024-03", 1)]));
    }

    #[test]
    fn test_non_array_monthly_falls_back_to_legacy() {
        let doc = json!({
            "monthly_series": "oops",
            "series": [{"date": "20240101", "users": 5}]
        });
        assert_eq!(decode_history(&doc), counts(&[("2024-01", 5)]));
    }

    #[test]
    fn test_garbage_entries_are_tolerated() {
        let doc = json!({
            "monthly_series": [
                {"ym": "2024-01", "users": "9"},
                {"ym": "2024-02"},
                {"ym": "2024-03", "users": null},
                {"ym": "2024-04", "users": "lots"},
                {"ym": "2024-05", "users": -4},
                {"ym": "2024-06", "users": 2.9},
                {"ym": 202407, "users": 1},
                {"ym": "July", "users": 1},
                {"users": 1},
                "not an object"
            ]
        });
        assert_eq!(
            decode_history(&doc),
            counts(&[
                ("2024-01", 9),
                ("2024-02", 0),
                ("2024-03", 0),
                ("2024-04", 0),
                ("2024-05", 0),
                ("2024-06", 2)
            ])
        );
    }

    #[test]
    fn test_legacy_malformed_dates_skipped() {
        let doc = json!({
            "series": [
                {"date": "2024-01-01", "users": 5},
                {"date": "202401", "users": 5},
                {"date": 20240101, "users": 5},
                {"date": "20240102", "users": 1}
            ]
        });
        assert_eq!(decode_history(&doc), counts(&[("2024-01", 1)]));
    }

    #[test]
    fn test_unrecognised_documents_are_empty() {
        assert!(decode_history(&json!([1, 2, 3])).is_empty());
        assert!(decode_history(&json!({"total_users": 5})).is_empty());
        assert!(parse_history(b"{not json").is_empty());
        assert!(parse_history(b"").is_empty());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_history(&dir.path().join("users.json")).is_empty());
    }

    #[test]
    fn test_load_directory_instead_of_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_history(dir.path()).is_empty());
    }

    #[test]
    fn test_load_existing_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"monthly_series": [{{"ym": "2020-01", "users": 50}}]}}"#).unwrap();
        assert_eq!(load_history(file.path()), counts(&[("2020-01", 50)]));
    }
}
