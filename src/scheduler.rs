//! Background runtime for the cleanup jobs.
//!
//! Each job gets its own tokio task. Tasks tick on a fixed schedule and
//! exit once the shutdown channel flips to `true` (or its sender is dropped).

use anyhow::{Context, Result};
use booking::CleanupJobs;
use chrono::{DateTime, NaiveTime, Utc};
use sea_orm::DatabaseConnection;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::config::SchedulerSettings;

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone)]
pub struct Scheduler {
    jobs: CleanupJobs,
    no_show_at: NaiveTime,
    purge_every: Duration,
}

impl Scheduler {
    pub fn new(db: DatabaseConnection, settings: &SchedulerSettings) -> Result<Self> {
        let no_show_at = NaiveTime::from_hms_opt(settings.no_show_hour_utc, 0, 0)
            .with_context(|| format!("invalid no-show hour {}", settings.no_show_hour_utc))?;
        let retention = chrono::Duration::try_days(settings.cancelled_retention_days)
            .with_context(|| {
                format!("retention of {} days is out of range", settings.cancelled_retention_days)
            })?;
        let purge_every = settings
            .purge_interval_hours
            .checked_mul(60 * 60)
            .map(Duration::from_secs)
            .with_context(|| {
                format!("purge interval of {} hours is out of range", settings.purge_interval_hours)
            })?;

        Ok(Self {
            jobs: CleanupJobs::new(db, retention),
            no_show_at,
            purge_every,
        })
    }

    /// Starts both jobs. The returned handles finish after shutdown.
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        let first_no_show = until(next_daily_run(Utc::now(), self.no_show_at));
        info!(
            "Scheduling no-show sweep daily at {} UTC (first in {:?}), purge every {:?}",
            self.no_show_at, first_no_show, self.purge_every
        );

        let no_show_jobs = self.jobs.clone();
        let no_show = tokio::spawn(run_periodically(
            "no-show",
            first_no_show,
            DAY,
            shutdown.clone(),
            move || {
                let jobs = no_show_jobs.clone();
                async move { run_no_show(&jobs).await }
            },
        ));

        let purge_jobs = self.jobs;
        let purge = tokio::spawn(run_periodically(
            "purge",
            self.purge_every,
            self.purge_every,
            shutdown,
            move || {
                let jobs = purge_jobs.clone();
                async move { run_purge(&jobs).await }
            },
        ));

        vec![no_show, purge]
    }
}

async fn run_periodically<F, Fut>(
    name: &'static str,
    first_delay: Duration,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
    job: F,
) where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = ()>,
{
    let mut ticker = interval_at(Instant::now() + first_delay, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                debug!("Running {} job", name);
                job().await;
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    info!("Stopping {} job", name);
                    break;
                }
            }
        }
    }
}

// Job failures are logged; the next tick retries.
async fn run_no_show(jobs: &CleanupJobs) {
    match jobs.mark_past_as_no_show(Utc::now().naive_utc()).await {
        Ok(report) => info!(
            "No-show sweep converted {} of {} appointments",
            report.converted, report.matched
        ),
        Err(e) => error!("No-show sweep failed: {}", e),
    }
}

async fn run_purge(jobs: &CleanupJobs) {
    match jobs.purge_cancelled(Utc::now().naive_utc()).await {
        Ok(deleted) => info!("Purge removed {} cancelled appointments", deleted),
        Err(e) => error!("Cancelled purge failed: {}", e),
    }
}

/// Next instant at `at` (UTC) strictly after `now`.
fn next_daily_run(now: DateTime<Utc>, at: NaiveTime) -> DateTime<Utc> {
    let today = now.date_naive().and_time(at).and_utc();
    if today > now {
        today
    } else {
        today + chrono::Duration::days(1)
    }
}

fn until(when: DateTime<Utc>) -> Duration {
    (when - Utc::now()).to_std().unwrap_or_default()
}
