use anyhow::Result;
use chrono::Utc;
use rust_ga4_users::{pull_users, today_in, AnalyticsClient, Config};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env()?;
    info!(
        property = %config.property_id,
        path = %config.output_path.display(),
        lookback = config.lookback_months,
        "configuration loaded"
    );

    let client = AnalyticsClient::new(&config.property_id, config.credentials.clone())?;
    let now = Utc::now();
    let today = today_in(&config, now);

    let summary = pull_users(&client, &config.output_path, config.lookback_months, today, now).await?;

    println!(
        "Wrote {} (months={}, total={}, today={})",
        config.output_path.display(),
        summary.month_count(),
        summary.total_users,
        summary.today_users
    );
    Ok(())
}
