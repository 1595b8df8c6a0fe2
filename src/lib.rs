pub mod config;
pub mod custom_datetime;
mod error;
pub mod history;
pub mod http;
pub mod pull;
pub mod report;
pub mod summary;
pub mod types;
pub mod util;
pub mod window;

// Re-export commonly used types
pub use types::{MonthKey, MonthlyCount, MonthlyEntry, PersistedSummary, ReportDimension, RunReportRequest, RunReportResponse};

pub use config::{Config, ServiceAccountKey};
pub use error::PullError;
pub use http::AnalyticsClient;
pub use report::MetricsSource;
pub use window::ReportWindow;

// Re-export the run entry points
pub use history::load_history;
pub use pull::{pull_users, today_in};
pub use summary::{build_summary, merge_months, write_summary};
