use anyhow::Result;
use booking::PasswordHashing;
use config::{Config, Environment, File, Map};
use sea_orm::Database;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::schemas::AppState;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://clinic.db?mode=rwc";
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3000";
pub const MAX_PURGE_INTERVAL_HOURS: u64 = 24 * 365;
pub const MAX_RETENTION_DAYS: i64 = 36_500;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("scheduler.no_show_hour_utc must be between 0 and 23, got {0}")]
    InvalidNoShowHour(u32),

    #[error("scheduler.purge_interval_hours must be between 1 and 8760, got {0}")]
    InvalidPurgeInterval(u64),

    #[error("scheduler.cancelled_retention_days must be between 1 and 36500, got {0}")]
    InvalidRetention(i64),
}

/// Application settings.
///
/// Sources, later ones winning: built-in defaults, an optional
/// `clinic.toml` in the working directory, then `CLINIC_*` environment
/// variables (`CLINIC_SCHEDULER__ENABLED=false` for nested keys).
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database_url: String,
    pub bind_address: String,
    pub scheduler: SchedulerSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerSettings {
    pub enabled: bool,
    /// Hour of the day (UTC) at which the no-show sweep runs
    pub no_show_hour_utc: u32,
    pub purge_interval_hours: u64,
    pub cancelled_retention_days: i64,
}

impl Settings {
    pub fn load() -> Result<Self, SettingsError> {
        Self::from_sources(Some("clinic"), None)
    }

    /// `env` replaces the process environment when given.
    fn from_sources(
        file: Option<&str>,
        env: Option<Map<String, String>>,
    ) -> Result<Self, SettingsError> {
        let mut builder = Config::builder()
            .set_default("database_url", DEFAULT_DATABASE_URL)?
            .set_default("bind_address", DEFAULT_BIND_ADDRESS)?
            .set_default("scheduler.enabled", true)?
            .set_default("scheduler.no_show_hour_utc", 2)?
            .set_default("scheduler.purge_interval_hours", 6)?
            .set_default("scheduler.cancelled_retention_days", 90)?;

        if let Some(name) = file {
            builder = builder.add_source(File::with_name(name).required(false));
        }

        let settings: Settings = builder
            .add_source(
                Environment::with_prefix("CLINIC")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), SettingsError> {
        let scheduler = &self.scheduler;
        if scheduler.no_show_hour_utc > 23 {
            return Err(SettingsError::InvalidNoShowHour(scheduler.no_show_hour_utc));
        }
        if !(1..=MAX_PURGE_INTERVAL_HOURS).contains(&scheduler.purge_interval_hours) {
            return Err(SettingsError::InvalidPurgeInterval(
                scheduler.purge_interval_hours,
            ));
        }
        if !(1..=MAX_RETENTION_DAYS).contains(&scheduler.cancelled_retention_days) {
            return Err(SettingsError::InvalidRetention(
                scheduler.cancelled_retention_days,
            ));
        }
        Ok(())
    }

    /// Applies command line overrides.
    pub fn with_overrides(mut self, database_url: Option<String>, bind_address: Option<String>) -> Self {
        if let Some(url) = database_url {
            self.database_url = url;
        }
        if let Some(address) = bind_address {
            self.bind_address = address;
        }
        self
    }
}

/// Masks the password in a connection URL so it can be logged.
///
/// `postgres://clinic:secret@db:5432/clinic` becomes
/// `postgres://clinic:***@db:5432/clinic`. URLs without credentials are
/// returned unchanged.
pub fn redact_database_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let before_query = rest.find('?').map_or(rest, |end| &rest[..end]);
    let Some(at) = before_query.rfind('@') else {
        return url.to_string();
    };
    match rest[..at].split_once(':') {
        Some((user, _)) => format!("{}://{}:***{}", scheme, user, &rest[at..]),
        None => url.to_string(),
    }
}

/// Connect to the database and build the shared handler state
pub async fn initialize_app_state_with_url(database_url: &str) -> Result<AppState> {
    info!("Connecting to database");
    debug!("Database URL: {}", redact_database_url(database_url));
    let db = Database::connect(database_url).await?;

    Ok(AppState::new(db, PasswordHashing::default()))
}
