use anyhow::Result;
use booking::CleanupJobs;
use chrono::Utc;
use sea_orm::Database;
use tracing::{debug, info};

use crate::config::{Settings, redact_database_url};

/// One-shot run of both maintenance jobs, for cron-driven deployments.
pub async fn cleanup(settings: Settings) -> Result<()> {
    debug!("Database URL: {}", redact_database_url(&settings.database_url));
    let db = Database::connect(&settings.database_url).await?;

    let jobs = CleanupJobs::new(
        db,
        chrono::Duration::days(settings.scheduler.cancelled_retention_days),
    );
    let now = Utc::now().naive_utc();

    let report = jobs.mark_past_as_no_show(now).await?;
    let purged = jobs.purge_cancelled(now).await?;

    info!(
        "Cleanup finished: {} no-shows ({} failed), {} cancelled appointments purged (retention {} days)",
        report.converted,
        report.failed,
        purged,
        jobs.retention().num_days()
    );
    Ok(())
}
