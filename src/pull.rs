use crate::config::Config;
use crate::error::PullError;
use crate::history::load_history;
use crate::report::MetricsSource;
use crate::summary::{build_summary, merge_months, write_summary};
use crate::types::PersistedSummary;
use crate::window::ReportWindow;
use chrono::{DateTime, NaiveDate, Utc};
use std::path::Path;
use tracing::info;

/// Refresh the summary at `path` for a run on `today`.
///
/// Both queries complete before the existing file is read or replaced, so a
/// failed query leaves the previous summary untouched.
pub async fn pull_users<S: MetricsSource>(
    source: &S,
    path: &Path,
    lookback_months: u32,
    today: NaiveDate,
    now: DateTime<Utc>
) -> Result<PersistedSummary, PullError> {
    let window = ReportWindow::ending_before(today, lookback_months).ok_or_else(|| {
        PullError::Configuration(format!(
            "cannot compute a {} month window ending before {}",
            lookback_months, today
        ))
    })?;
    info!("refreshing active users for {}", window);

    let fresh = source.monthly_active_users(&window).await?;
    let today_users = source.daily_active_users(today).await?;

    let history = load_history(path);
    let merged = merge_months(&history, &fresh, window.start_month());
    let summary = build_summary(&merged, today, today_users, now);

    write_summary(path, &summary)?;
    info!(
        months = summary.month_count(),
        total = summary.total_users,
        today = summary.today_users,
        "summary written"
    );
    Ok(summary)
}

/// Today's date in the configured reporting time zone.
pub fn today_in(config: &Config, now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&config.timezone).date_naive()
}
