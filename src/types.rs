use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A calendar year-month, rendered canonically as "YYYY-MM".
///
/// Ordering is chronological. Years are limited to four digits, so the ordering
/// matches lexicographic ordering of the rendered form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    year: i32,
    month: u32
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if !(0..=9999).contains(&year) || !(1..=12).contains(&month) {
            return None;
        }
        Some(MonthKey { year, month })
    }

    pub fn of(date: NaiveDate) -> Self {
        use chrono::Datelike;
        MonthKey {
            year: date.year(),
            month: date.month()
        }
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidMonthKey(pub String);

impl fmt::Display for InvalidMonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid year-month '{}', expected YYYY-MM", self.0)
    }
}

impl std::error::Error for InvalidMonthKey {}

impl FromStr for MonthKey {
    type Err = InvalidMonthKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidMonthKey(s.to_string());
        let bytes = s.as_bytes();
        if bytes.len() != 7 || bytes[4] != b'-' {
            return Err(invalid());
        }
        let digits = |range: std::ops::Range<usize>| bytes[range].iter().all(u8::is_ascii_digit);
        if !digits(0..4) || !digits(5..7) {
            return Err(invalid());
        }
        let year = s[0..4].parse().map_err(|_| invalid())?;
        let month = s[5..7].parse().map_err(|_| invalid())?;
        MonthKey::new(year, month).ok_or_else(invalid)
    }
}

impl Serialize for MonthKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MonthKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Active-user counts keyed by month. Iteration is chronological.
pub type MonthlyCount = BTreeMap<MonthKey, u64>;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MonthlyEntry {
    pub ym: MonthKey,
    pub users: u64
}

/// The summary file written for the static site.
///
/// `total_users` is the sum of the monthly counts. Users active in several months
/// are counted once per month, so it is not a unique-user figure.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PersistedSummary {
    pub monthly_series: Vec<MonthlyEntry>,
    pub total_users: u64,
    pub today: NaiveDate,
    pub today_users: u64,
    #[serde(with = "crate::custom_datetime")]
    pub generated_at: DateTime<Utc>
}

impl PersistedSummary {
    pub fn month_count(&self) -> usize {
        self.monthly_series.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum ReportDimension {
    #[serde(rename = "yearMonth")]
    YearMonth,
    #[serde(rename = "date")]
    Date
}

impl fmt::Display for ReportDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportDimension::YearMonth => write!(f, "yearMonth"),
            ReportDimension::Date => write!(f, "date")
        }
    }
}

pub const ACTIVE_USERS: &str = "activeUsers";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub start_date: String,
    pub end_date: String
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Dimension {
    pub name: ReportDimension
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Metric {
    pub name: String
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReportRequest {
    pub date_ranges: Vec<DateRange>,
    pub dimensions: Vec<Dimension>,
    pub metrics: Vec<Metric>
}

impl RunReportRequest {
    /// Active users over `[start, end]`, broken down by a single dimension.
    pub fn active_users(dimension: ReportDimension, start: NaiveDate, end: NaiveDate) -> Self {
        RunReportRequest {
            date_ranges: vec![DateRange {
                start_date: crate::util::date_to_iso(start),
                end_date: crate::util::date_to_iso(end)
            }],
            dimensions: vec![Dimension { name: dimension }],
            metrics: vec![Metric {
                name: ACTIVE_USERS.to_string()
            }]
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ReportValue {
    #[serde(default)]
    pub value: Option<String>
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    #[serde(default)]
    pub dimension_values: Vec<ReportValue>,
    #[serde(default)]
    pub metric_values: Vec<ReportValue>
}

impl ReportRow {
    pub fn dimension(&self) -> Option<&str> {
        self.dimension_values.first()?.value.as_deref()
    }

    /// First metric as a count; missing or unparsable values count as zero.
    pub fn count(&self) -> u64 {
        self.metric_values
            .first()
            .and_then(|v| v.value.as_deref())
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0)
    }
}

/// Rows are omitted entirely when the property has no data for the range.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReportResponse {
    #[serde(default)]
    pub rows: Vec<ReportRow>
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_key_parse_and_display() {
        let key: MonthKey = "2024-03".parse().unwrap();
        assert_eq!(key, MonthKey::new(2024, 3).unwrap());
        assert_eq!(key.to_string(), "2024-03");
        assert_eq!(MonthKey::new(987, 1).unwrap().to_string(), "0987-01");
    }

    #[test]
    fn test_month_key_rejects_malformed() {
        for bad in ["2024-3", "2024-13", "2024-00", "202403", "24-03", "2024/03", "abcd-ef", ""] {
            assert!(bad.parse::<MonthKey>().is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn test_month_key_order_matches_string_order() {
        let mut keys: Vec<MonthKey> = ["2024-10", "2023-12", "2024-02", "2024-01"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        let mut strings: Vec<String> = keys.iter().map(MonthKey::to_string).collect();
        keys.sort();
        strings.sort();
        let rendered: Vec<String> = keys.iter().map(MonthKey::to_string).collect();
        assert_eq!(rendered, strings);
        assert_eq!(rendered, vec!["2023-12", "2024-01", "2024-02", "2024-10"]);
    }

    #[test]
    fn test_request_body_shape() {
        let start = NaiveDate::from_ymd_opt(2024, 8, 18).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 10, 18).unwrap();
        let request = RunReportRequest::active_users(ReportDimension::YearMonth, start, end);
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "dateRanges": [{"startDate": "2024-08-18", "endDate": "2025-10-18"}],
                "dimensions": [{"name": "yearMonth"}],
                "metrics": [{"name": "activeUsers"}]
            })
        );
    }

    #[test]
    fn test_response_without_rows() {
        let response: RunReportResponse =
            serde_json::from_str(r#"{"kind": "analyticsData#runReport"}"#).unwrap();
        assert!(response.rows.is_empty());
    }

    #[test]
    fn test_response_row_values() {
        let response: RunReportResponse = serde_json::from_str(
            r#"{
                "rows": [
                    {"dimensionValues": [{"value": "202406"}], "metricValues": [{"value": "40"}]},
                    {"dimensionValues": [{"value": "202407"}], "metricValues": [{"value": "n/a"}]}
                ],
                "rowCount": 2
            }"#
        )
        .unwrap();
        assert_eq!(response.rows[0].dimension(), Some("202406"));
        assert_eq!(response.rows[0].count(), 40);
        assert_eq!(response.rows[1].count(), 0);
    }
}
