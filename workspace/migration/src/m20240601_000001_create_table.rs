use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create users table
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(pk_auto(Users::Id))
                    .col(string_len(Users::Username, 50).unique_key())
                    .col(string_len(Users::Email, 255).unique_key())
                    .col(string(Users::PasswordHash))
                    .col(string_len_null(Users::FullName, 100))
                    .col(string_len_null(Users::PhoneNumber, 15))
                    .col(string_len_null(Users::Address, 255))
                    .col(string_len(Users::Role, 20).default("USER"))
                    .col(boolean(Users::Active).default(true))
                    .to_owned(),
            )
            .await?;

        // Create appointments table
        manager
            .create_table(
                Table::create()
                    .table(Appointments::Table)
                    .if_not_exists()
                    .col(pk_auto(Appointments::Id))
                    .col(integer(Appointments::UserId))
                    .col(string_len(Appointments::PatientName, 100))
                    .col(string_len_null(Appointments::PatientPhone, 15))
                    .col(date_time(Appointments::AppointmentDate))
                    .col(string_len(Appointments::DoctorName, 100))
                    .col(string_len_null(Appointments::Department, 50))
                    .col(string_len_null(Appointments::Reason, 500))
                    .col(string_len(Appointments::Status, 20).default("SCHEDULED"))
                    .col(string_len_null(Appointments::Notes, 255))
                    .col(date_time(Appointments::CreatedAt))
                    .col(date_time(Appointments::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_appointment_user")
                            .from(Appointments::Table, Appointments::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Lookup indexes: by owner, by date (conflict and stale scans), by status
        manager
            .create_index(
                Index::create()
                    .name("idx_appointments_user_id")
                    .table(Appointments::Table)
                    .col(Appointments::UserId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_appointments_appointment_date")
                    .table(Appointments::Table)
                    .col(Appointments::AppointmentDate)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_appointments_status")
                    .table(Appointments::Table)
                    .col(Appointments::Status)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop tables in reverse order to avoid foreign key constraints
        manager
            .drop_table(Table::drop().table(Appointments::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Username,
    Email,
    PasswordHash,
    FullName,
    PhoneNumber,
    Address,
    Role,
    Active,
}

#[derive(DeriveIden)]
enum Appointments {
    Table,
    Id,
    UserId,
    PatientName,
    PatientPhone,
    AppointmentDate,
    DoctorName,
    Department,
    Reason,
    Status,
    Notes,
    CreatedAt,
    UpdatedAt,
}
