use crate::handlers::not_blank;
use crate::schemas::{ApiError, ApiJson, AppState, ErrorResponse, MessageResponse};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use booking::{BookingError, NewUser, UserPatch};
use model::entities::user;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

/// Request body for registering a user
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUserRequest {
    /// Username (must be unique)
    #[validate(length(min = 3, max = 50), custom(function = "not_blank"))]
    pub username: String,
    /// Email address (must be unique)
    #[validate(email, length(max = 255))]
    pub email: String,
    #[validate(length(min = 6))]
    pub password: String,
    #[validate(length(max = 100))]
    pub full_name: Option<String>,
    #[validate(length(max = 15))]
    pub phone_number: Option<String>,
    #[validate(length(max = 255))]
    pub address: Option<String>,
    /// Defaults to USER
    #[validate(length(max = 20))]
    pub role: Option<String>,
}

/// Request body for updating a user. Omitted fields are kept.
///
/// Changing the password needs `currentPassword`; an empty `newPassword`
/// is ignored.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[validate(length(max = 100))]
    pub full_name: Option<String>,
    #[validate(length(max = 15))]
    pub phone_number: Option<String>,
    #[validate(length(max = 255))]
    pub address: Option<String>,
    #[validate(email, length(max = 255))]
    pub email: Option<String>,
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub message: String,
    pub user: UserResponse,
}

/// User response model. Never carries the password hash.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub role: String,
    pub active: bool,
}

impl From<user::Model> for UserResponse {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            email: model.email,
            full_name: model.full_name,
            phone_number: model.phone_number,
            address: model.address,
            role: model.role,
            active: model.active,
        }
    }
}

/// Register a new user
#[utoipa::path(
    post,
    path = "/api/users/register",
    tag = "users",
    request_body = RegisterUserRequest,
    responses(
        (status = 201, description = "User registered", body = UserResponse),
        (status = 400, description = "Invalid request or duplicate username/email", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state, request), fields(username = %request.username))]
pub async fn register_user(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    request
        .validate()
        .map_err(ErrorResponse::from_validation)?;

    let new_user = NewUser {
        username: request.username,
        email: request.email,
        password: request.password,
        full_name: request.full_name,
        phone_number: request.phone_number,
        address: request.address,
        role: request.role,
    };

    match state.users.register(new_user).await {
        Ok(created) => {
            info!("User registered with ID: {}", created.id);
            Ok((StatusCode::CREATED, Json(UserResponse::from(created))))
        }
        Err(e) => {
            warn!("Registration failed: {}", e);
            Err(ErrorResponse::from_booking(e))
        }
    }
}

/// Log in with username and password
#[utoipa::path(
    post,
    path = "/api/users/login",
    tag = "users",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 500, description = "Login failed", body = ErrorResponse)
    )
)]
#[instrument(skip(state, request), fields(username = %request.username))]
pub async fn login_user(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    match state
        .users
        .authenticate(&request.username, &request.password)
        .await
    {
        Ok(found) => {
            info!("User {} logged in", found.id);
            Ok(Json(LoginResponse {
                message: "Login successful".to_string(),
                user: UserResponse::from(found),
            }))
        }
        Err(BookingError::Auth(_)) => {
            debug!("Rejected login");
            Err((
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse::new("Invalid credentials", "AUTH_ERROR")),
            ))
        }
        Err(e) => {
            error!("Login failed: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new("Login failed", e.code())),
            ))
        }
    }
}

/// Get all users
#[utoipa::path(
    get,
    path = "/api/users",
    tag = "users",
    responses(
        (status = 200, description = "Users retrieved", body = Vec<UserResponse>),
        (status = 500, description = "Internal server error")
    )
)]
#[instrument(skip(state))]
pub async fn get_users(State(state): State<AppState>) -> Result<Json<Vec<UserResponse>>, StatusCode> {
    match state.users.list().await {
        Ok(users) => {
            debug!("Retrieved {} users", users.len());
            Ok(Json(users.into_iter().map(UserResponse::from).collect()))
        }
        Err(e) => {
            error!("Failed to retrieve users: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

fn found_or_404(
    result: booking::Result<Option<user::Model>>,
) -> Result<Json<UserResponse>, StatusCode> {
    match result {
        Ok(Some(found)) => Ok(Json(UserResponse::from(found))),
        Ok(None) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            error!("Failed to retrieve user: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Get a specific user by ID
#[utoipa::path(
    get,
    path = "/api/users/{id}",
    tag = "users",
    params(
        ("id" = i32, Path, description = "User ID"),
    ),
    responses(
        (status = 200, description = "User retrieved", body = UserResponse),
        (status = 404, description = "User not found"),
        (status = 500, description = "Internal server error")
    )
)]
#[instrument(skip(state))]
pub async fn get_user(
    Path(id): Path<i32>,
    State(state): State<AppState>,
) -> Result<Json<UserResponse>, StatusCode> {
    found_or_404(state.users.find_by_id(id).await)
}

/// Get a specific user by username
#[utoipa::path(
    get,
    path = "/api/users/username/{username}",
    tag = "users",
    params(
        ("username" = String, Path, description = "Username"),
    ),
    responses(
        (status = 200, description = "User retrieved", body = UserResponse),
        (status = 404, description = "User not found"),
        (status = 500, description = "Internal server error")
    )
)]
#[instrument(skip(state))]
pub async fn get_user_by_username(
    Path(username): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<UserResponse>, StatusCode> {
    found_or_404(state.users.find_by_username(&username).await)
}

/// Update a user's profile, email or password
#[utoipa::path(
    put,
    path = "/api/users/{id}",
    tag = "users",
    params(
        ("id" = i32, Path, description = "User ID"),
    ),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 400, description = "Invalid request, duplicate email or wrong password", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state, request))]
pub async fn update_user(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<UpdateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    request
        .validate()
        .map_err(ErrorResponse::from_validation)?;

    let patch = UserPatch {
        full_name: request.full_name,
        phone_number: request.phone_number,
        address: request.address,
        email: request.email,
        current_password: request.current_password,
        new_password: request.new_password,
    };

    match state.users.update(id, patch).await {
        Ok(updated) => Ok(Json(UserResponse::from(updated))),
        Err(e) => {
            warn!("Failed to update user {}: {}", id, e);
            Err(ErrorResponse::from_booking(e))
        }
    }
}

/// Delete a user
#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    tag = "users",
    params(
        ("id" = i32, Path, description = "User ID"),
    ),
    responses(
        (status = 200, description = "User deleted", body = MessageResponse),
        (status = 400, description = "Unknown user or user still has appointments", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn delete_user(
    Path(id): Path<i32>,
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .users
        .delete(id)
        .await
        .map_err(ErrorResponse::from_booking)?;
    info!("User {} deleted", id);
    Ok(Json(MessageResponse::new("User deleted successfully")))
}
