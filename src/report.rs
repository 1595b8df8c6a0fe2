use crate::error::PullError;
use crate::http::AnalyticsClient;
use crate::types::{MonthlyCount, ReportDimension, RunReportRequest, RunReportResponse};
use crate::util::compact_month_to_key;
use crate::window::ReportWindow;
use chrono::NaiveDate;
use tracing::{debug, warn};

/// The two active-user queries a run needs.
#[allow(async_fn_in_trait)]
pub trait MetricsSource {
    /// Active users per month over the whole window.
    async fn monthly_active_users(&self, window: &ReportWindow) -> Result<MonthlyCount, PullError>;

    /// Active users for a single day.
    async fn daily_active_users(&self, day: NaiveDate) -> Result<u64, PullError>;
}

/// Run a report for the client's property.
///
/// # Arguments
/// * `client` - The authorized Data API client
/// * `request` - Date range, dimension and metric to report on
///
/// # Returns
/// The decoded report, with no rows if the property had no activity
pub async fn run_report(client: &AnalyticsClient, request: &RunReportRequest) -> Result<RunReportResponse, PullError> {
    let response_text = client.property_post(":runReport", request).await?;
    let response: RunReportResponse = serde_json::from_str(&response_text)?;
    Ok(response)
}

/// Fold `yearMonth` rows into per-month counts.
///
/// Rows whose dimension is not a six digit year-month are skipped. Rows for
/// the same month are summed.
pub fn monthly_counts(response: &RunReportResponse) -> MonthlyCount {
    let mut monthly = MonthlyCount::new();
    for row in &response.rows {
        match row.dimension().and_then(compact_month_to_key) {
            Some(key) => {
                let slot = monthly.entry(key).or_insert(0);
                *slot = slot.saturating_add(row.count());
            }
            None => warn!("skipping report row with dimension {:?}", row.dimension()),
        }
    }
    monthly
}

/// The first row's count, or zero when the day has no data yet.
pub fn single_day_count(response: &RunReportResponse) -> u64 {
    response.rows.first().map(|row| row.count()).unwrap_or(0)
}

impl MetricsSource for AnalyticsClient {
    async fn monthly_active_users(&self, window: &ReportWindow) -> Result<MonthlyCount, PullError> {
        let request = RunReportRequest::active_users(ReportDimension::YearMonth, window.start, window.end);
        let response = run_report(self, &request).await?;
        debug!("monthly report for {} returned {} rows", window, response.rows.len());
        Ok(monthly_counts(&response))
    }

    async fn daily_active_users(&self, day: NaiveDate) -> Result<u64, PullError> {
        let request = RunReportRequest::active_users(ReportDimension::Date, day, day);
        let response = run_report(self, &request).await?;
        debug!("daily report for {} returned {} rows", day, response.rows.len());
        Ok(single_day_count(&response))
    }
}
