use chrono::{Months, NaiveDate};

use crate::types::MonthKey;

/// Convert a chrono NaiveDate to the Data API date format (YYYY-MM-DD)
///
/// # Arguments
/// * `date` - The NaiveDate to convert
///
/// # Returns
/// A string in YYYY-MM-DD format
///
/// # Example
/// ```rust
/// use chrono::NaiveDate;
/// use rust_ga4_users::util::date_to_iso;
///
/// let date = NaiveDate::from_ymd_opt(2023, 12, 25).unwrap();
/// assert_eq!(date_to_iso(date), "2023-12-25");
/// ```
pub fn date_to_iso(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// The same day-of-month as `date`, `months` calendar months earlier.
///
/// When that day does not exist in the target month the result is clamped to the
/// month's last day, so 2024-03-31 minus one month is 2024-02-29.
///
/// # Example
/// ```rust
/// use chrono::NaiveDate;
/// use rust_ga4_users::util::months_ago;
///
/// let date = NaiveDate::from_ymd_opt(2024, 7, 31).unwrap();
/// assert_eq!(months_ago(date, 1), NaiveDate::from_ymd_opt(2024, 6, 30));
/// ```
pub fn months_ago(date: NaiveDate, months: u32) -> Option<NaiveDate> {
    // chrono clamps to the last valid day of the target month
    date.checked_sub_months(Months::new(months))
}

/// Decode a compact "YYYYMM" dimension value into a MonthKey.
pub fn compact_month_to_key(value: &str) -> Option<MonthKey> {
    if value.len() != 6 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year = value[0..4].parse().ok()?;
    let month = value[4..6].parse().ok()?;
    MonthKey::new(year, month)
}

/// Truncate a compact "YYYYMMDD" date to its MonthKey.
pub fn compact_date_to_key(value: &str) -> Option<MonthKey> {
    if value.len() != 8 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    compact_month_to_key(&value[0..6])
}
