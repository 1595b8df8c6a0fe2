use crate::types::MonthKey;
use crate::util::months_ago;
use chrono::NaiveDate;
use std::fmt;

/// The trailing date range refreshed from the Data API on every run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportWindow {
    /// Yesterday. Today is always partial and is reported separately.
    pub end: NaiveDate,
    /// Same day-of-month as `end`, `lookback_months` earlier, clamped to month end.
    pub start: NaiveDate,
}

impl ReportWindow {
    /// Compute the live window for a run on `today`.
    ///
    /// Returns `None` when the lookback is zero or the dates fall outside the
    /// supported calendar range.
    pub fn ending_before(today: NaiveDate, lookback_months: u32) -> Option<Self> {
        if lookback_months == 0 {
            return None;
        }
        let end = today.pred_opt()?;
        let start = months_ago(end, lookback_months)?;
        Some(ReportWindow { end, start })
    }

    /// Months before this key are settled history; months from it onward are refetched.
    pub fn start_month(&self) -> MonthKey {
        MonthKey::of(self.start)
    }
}

impl fmt::Display for ReportWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}
