use anyhow::Result;
use booking::PasswordHashing;
use tracing::info;

use super::initdb::connect_and_migrate;
use super::serve::run_server;
use crate::config::Settings;
use crate::schemas::AppState;

pub async fn migrate_and_serve(settings: Settings) -> Result<()> {
    info!("Applying database migrations and starting server");

    let db = connect_and_migrate(&settings.database_url).await?;
    info!("Database migrations completed successfully");

    run_server(AppState::new(db, PasswordHashing::default()), &settings).await
}
