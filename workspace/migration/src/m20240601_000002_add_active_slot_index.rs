use model::entities::appointment::{self, AppointmentStatus};
use model::entities::prelude::Appointment;
use sea_orm::{ActiveEnum, ConnectionTrait, EntityName, IdenStatic};
use sea_orm_migration::prelude::*;

const INDEX_NAME: &str = "uq_appointments_active_slot";

/// Closes the read-then-write window of the booking conflict check: a doctor
/// can hold only one SCHEDULED/CONFIRMED appointment per timestamp.
///
/// Partial indexes are not expressible through the schema builder, so the
/// statement is issued as SQL. It is valid for both SQLite and PostgreSQL.
#[derive(DeriveMigrationName)]
pub struct Migration;

fn create_index_sql() -> String {
    let active = AppointmentStatus::ACTIVE
        .iter()
        .map(|status| format!("'{}'", status.to_value()))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "CREATE UNIQUE INDEX IF NOT EXISTS {} ON {} ({}, {}) WHERE {} IN ({})",
        INDEX_NAME,
        Appointment.table_name(),
        appointment::Column::DoctorName.as_str(),
        appointment::Column::AppointmentDate.as_str(),
        appointment::Column::Status.as_str(),
        active,
    )
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(&create_index_sql())
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name(INDEX_NAME)
                    .table(Alias::new(Appointment.table_name()))
                    .to_owned(),
            )
            .await?;

        Ok(())
    }
}
