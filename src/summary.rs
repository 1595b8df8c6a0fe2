use crate::error::PullError;
use crate::types::{MonthKey, MonthlyCount, MonthlyEntry, PersistedSummary};
use chrono::{DateTime, NaiveDate, Utc};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Combine settled history with freshly fetched months.
///
/// History before `live_from` is carried forward unchanged. Every month from
/// `live_from` onward comes only from `fresh`, so a month the API no longer
/// reports is dropped and a reported month replaces the stored value.
pub fn merge_months(history: &MonthlyCount, fresh: &MonthlyCount, live_from: MonthKey) -> MonthlyCount {
    let mut merged: MonthlyCount = history.range(..live_from).map(|(k, v)| (*k, *v)).collect();
    for (key, users) in fresh {
        let _ = merged.insert(*key, *users);
    }
    merged
}

/// Sum of monthly counts, saturating at `u64::MAX`. Not a unique-user count.
pub fn total_users(merged: &MonthlyCount) -> u64 {
    merged.values().fold(0u64, |total, users| total.saturating_add(*users))
}

pub fn build_summary(
    merged: &MonthlyCount,
    today: NaiveDate,
    today_users: u64,
    generated_at: DateTime<Utc>
) -> PersistedSummary {
    PersistedSummary {
        monthly_series: merged
            .iter()
            .map(|(ym, users)| MonthlyEntry { ym: *ym, users: *users })
            .collect(),
        total_users: total_users(merged),
        today,
        today_users,
        generated_at
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Replace the file at `path` with `summary`.
///
/// The parent directory is created if needed. The document is written to a
/// sibling temporary file first and renamed into place, so readers never see a
/// half-written summary.
pub fn write_summary(path: &Path, summary: &PersistedSummary) -> Result<(), PullError> {
    let json_output = serde_json::to_string_pretty(summary)
        .map_err(|e| PullError::Io(format!("failed to encode summary: {}", e)))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| PullError::Io(format!("failed to create {}: {}", parent.display(), e)))?;
    }

    let tmp = temp_path(path);
    if let Err(e) = fs::write(&tmp, json_output + "\n") {
        let _ = fs::remove_file(&tmp);
        return Err(PullError::Io(format!("failed to write {}: {}", tmp.display(), e)));
    }
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(PullError::Io(format!("failed to replace {}: {}", path.display(), e)));
    }

    debug!("wrote {} months to {}", summary.month_count(), path.display());
    Ok(())
}
