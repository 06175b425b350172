//! Booking rules for the clinic backend.
//!
//! [`UserService`] and [`AppointmentService`] own the business checks
//! (duplicate accounts, past dates, double-booked doctors); [`CleanupJobs`]
//! holds the periodic maintenance the scheduler runs. All of them operate on
//! a shared SeaORM connection and report failures as [`BookingError`].

pub mod appointment;
pub mod cleanup;
pub mod error;
pub mod password;
pub mod user;

pub use appointment::{AppointmentPatch, AppointmentService, NewAppointment};
pub use cleanup::{CleanupJobs, NoShowReport};
pub use error::{BookingError, Result};
pub use password::PasswordHashing;
pub use user::{NewUser, UserPatch, UserService};

#[cfg(test)]
pub(crate) mod testing {
    use migration::{Migrator, MigratorTrait};
    use model::entities::user;
    use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, Set};

    use crate::{PasswordHashing, UserService};

    pub async fn setup_db() -> DatabaseConnection {
        let db = Database::connect("sqlite::memory:")
            .await
            .expect("Failed to connect to test database");
        Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations on test database");
        db
    }

    /// A user service with cheap hashing parameters.
    pub fn test_users(db: DatabaseConnection) -> UserService {
        let hashing = PasswordHashing::with_params(8, 1, 1).expect("valid argon2 params");
        UserService::new(db, hashing)
    }

    pub async fn insert_user(db: &DatabaseConnection, username: &str) -> user::Model {
        user::ActiveModel {
            username: Set(username.to_string()),
            email: Set(format!("{}@clinic.test", username)),
            password_hash: Set("unused".to_string()),
            role: Set("USER".to_string()),
            active: Set(true),
            ..Default::default()
        }
        .insert(db)
        .await
        .expect("Failed to insert test user")
    }
}
