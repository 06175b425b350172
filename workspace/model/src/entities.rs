//! SeaORM entities for the clinic booking backend.
//!
//! Two tables: `users` and `appointments`. Appointments reference their
//! owner by `user_id`; there is no lazy loading, callers look the user up
//! explicitly when they need it.

pub mod appointment;
pub mod user;

pub mod prelude {
    //! A prelude module for easy importing of all entities.
    pub use super::appointment::AppointmentStatus;
    pub use super::appointment::Entity as Appointment;
    pub use super::user::Entity as User;
}
