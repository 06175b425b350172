use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::StatusCode,
    response::Json,
};
use booking::{AppointmentService, BookingError, PasswordHashing, UserService};
use model::entities::prelude::AppointmentStatus;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::{OpenApi, ToSchema};
use validator::ValidationErrors;

use crate::handlers::appointments::{
    AppointmentResponse, CreateAppointmentRequest, UpdateAppointmentRequest,
};
use crate::handlers::users::{
    LoginRequest, LoginResponse, RegisterUserRequest, UpdateUserRequest, UserResponse,
};

/// Application state shared across handlers
#[derive(Clone, Debug)]
pub struct AppState {
    /// Database connection
    pub db: DatabaseConnection,
    pub users: UserService,
    pub appointments: AppointmentService,
}

impl AppState {
    pub fn new(db: DatabaseConnection, hashing: PasswordHashing) -> Self {
        Self {
            users: UserService::new(db.clone(), hashing),
            appointments: AppointmentService::new(db.clone()),
            db,
        }
    }
}

/// Error response
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Error code
    pub code: String,
    /// Success status (always false for errors)
    pub success: bool,
}

/// Error half of handler results
pub type ApiError = (StatusCode, Json<ErrorResponse>);

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
            success: false,
        }
    }

    /// Business-rule failures become 400 with their message; infrastructure
    /// failures become 500 without details.
    pub fn from_booking(err: BookingError) -> ApiError {
        if err.is_client_error() {
            (
                StatusCode::BAD_REQUEST,
                Json(Self::new(err.to_string(), err.code())),
            )
        } else {
            error!("Request failed: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(Self::new("Internal server error", err.code())),
            )
        }
    }

    pub fn from_validation(errors: ValidationErrors) -> ApiError {
        (
            StatusCode::BAD_REQUEST,
            Json(Self::new(errors.to_string(), "VALIDATION_ERROR")),
        )
    }
}

/// JSON body extractor whose rejections use the `ErrorResponse` shape.
///
/// Missing fields, malformed values and bad content types all become
/// 400 `VALIDATION_ERROR`.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err((
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new(rejection.body_text(), "VALIDATION_ERROR")),
            )),
        }
    }
}

/// Plain confirmation message
#[derive(Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Health check response
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
    /// Database connection status
    pub database: String,
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::health_check,
        crate::handlers::appointments::create_appointment,
        crate::handlers::appointments::get_appointments,
        crate::handlers::appointments::get_appointment,
        crate::handlers::appointments::get_user_appointments,
        crate::handlers::appointments::get_appointments_by_status,
        crate::handlers::appointments::get_appointments_in_range,
        crate::handlers::appointments::update_appointment,
        crate::handlers::appointments::cancel_appointment,
        crate::handlers::appointments::delete_appointment,
        crate::handlers::users::register_user,
        crate::handlers::users::login_user,
        crate::handlers::users::get_users,
        crate::handlers::users::get_user,
        crate::handlers::users::get_user_by_username,
        crate::handlers::users::update_user,
        crate::handlers::users::delete_user,
    ),
    components(
        schemas(
            ErrorResponse,
            MessageResponse,
            HealthResponse,
            AppointmentStatus,
            AppointmentResponse,
            CreateAppointmentRequest,
            UpdateAppointmentRequest,
            UserResponse,
            RegisterUserRequest,
            UpdateUserRequest,
            LoginRequest,
            LoginResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "appointments", description = "Appointment booking endpoints"),
        (name = "users", description = "User account endpoints"),
    ),
    info(
        title = "Clinic API",
        description = "Clinic appointment booking backend",
        version = "0.1.0"
    )
)]
pub struct ApiDoc;
