use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

/// Error types for the booking services.
///
/// The first six variants are business-rule failures and carry a message
/// fit for an API client. `PasswordHash` and `Database` are infrastructure
/// failures.
#[derive(Error, Debug)]
pub enum BookingError {
    /// Bad input, e.g. an appointment date that is not in the future
    #[error("{0}")]
    Validation(String),

    /// A doctor already holds an active appointment at the requested time
    #[error("{0}")]
    Conflict(String),

    /// The referenced user or appointment does not exist
    #[error("{0}")]
    NotFound(String),

    /// Username or email already taken
    #[error("{0}")]
    Duplicate(String),

    /// A user cannot be deleted while appointments still reference them
    #[error("{0}")]
    HasAppointments(String),

    /// Bad credentials or wrong current password
    #[error("{0}")]
    Auth(String),

    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl BookingError {
    /// Stable machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            BookingError::Validation(_) => "VALIDATION_ERROR",
            BookingError::Conflict(_) => "APPOINTMENT_CONFLICT",
            BookingError::NotFound(_) => "NOT_FOUND",
            BookingError::Duplicate(_) => "DUPLICATE",
            BookingError::HasAppointments(_) => "USER_HAS_APPOINTMENTS",
            BookingError::Auth(_) => "AUTH_ERROR",
            BookingError::PasswordHash(_) => "PASSWORD_HASH_ERROR",
            BookingError::Database(_) => "DATABASE_ERROR",
        }
    }

    /// True for errors caused by the caller rather than the infrastructure.
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            BookingError::PasswordHash(_) | BookingError::Database(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, BookingError>;

pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_business_errors_display_their_message() {
        let err = BookingError::Conflict("slot taken".to_string());
        assert_eq!(err.to_string(), "slot taken");
        assert_eq!(err.code(), "APPOINTMENT_CONFLICT");
        assert!(err.is_client_error());
    }

    #[test]
    fn test_user_with_appointments_has_its_own_code() {
        let err = BookingError::HasAppointments("still booked".to_string());
        assert_eq!(err.code(), "USER_HAS_APPOINTMENTS");
        assert_ne!(err.code(), BookingError::Conflict(String::new()).code());
        assert!(err.is_client_error());
    }

    #[test]
    fn test_database_errors_are_not_client_errors() {
        let err = BookingError::from(DbErr::Custom("boom".to_string()));
        assert_eq!(err.code(), "DATABASE_ERROR");
        assert!(!err.is_client_error());
        assert!(!is_unique_violation(&DbErr::Custom("boom".to_string())));
    }
}
