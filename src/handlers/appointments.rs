use crate::handlers::not_blank;
use crate::schemas::{ApiError, ApiJson, AppState, ErrorResponse, MessageResponse};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use axum_valid::Valid;
use booking::{AppointmentPatch, NewAppointment};
use chrono::NaiveDateTime;
use model::entities::{appointment, prelude::AppointmentStatus};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, trace, warn};
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

/// Request body for booking an appointment
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAppointmentRequest {
    /// Booking user
    pub user_id: i32,
    #[validate(length(min = 1, max = 100), custom(function = "not_blank"))]
    pub patient_name: String,
    #[validate(length(max = 15))]
    pub patient_phone: Option<String>,
    /// Start of the appointment, UTC (e.g. 2030-05-01T09:30:00)
    pub appointment_date: NaiveDateTime,
    #[validate(length(min = 1, max = 100), custom(function = "not_blank"))]
    pub doctor_name: String,
    #[validate(length(max = 50))]
    pub department: Option<String>,
    #[validate(length(max = 500))]
    pub reason: Option<String>,
    #[validate(length(max = 255))]
    pub notes: Option<String>,
}

/// Request body for a partial appointment update. Omitted fields are kept.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAppointmentRequest {
    #[validate(length(min = 1, max = 100), custom(function = "not_blank"))]
    pub patient_name: Option<String>,
    #[validate(length(max = 15))]
    pub patient_phone: Option<String>,
    pub appointment_date: Option<NaiveDateTime>,
    #[validate(length(min = 1, max = 100), custom(function = "not_blank"))]
    pub doctor_name: Option<String>,
    #[validate(length(max = 50))]
    pub department: Option<String>,
    #[validate(length(max = 500))]
    pub reason: Option<String>,
    pub status: Option<AppointmentStatus>,
    #[validate(length(max = 255))]
    pub notes: Option<String>,
}

impl From<UpdateAppointmentRequest> for AppointmentPatch {
    fn from(request: UpdateAppointmentRequest) -> Self {
        Self {
            patient_name: request.patient_name,
            patient_phone: request.patient_phone,
            appointment_date: request.appointment_date,
            doctor_name: request.doctor_name,
            department: request.department,
            reason: request.reason,
            status: request.status,
            notes: request.notes,
        }
    }
}

/// Query parameters for listing appointments in a date window
#[derive(Debug, Deserialize, ToSchema, IntoParams, Validate)]
#[into_params(parameter_in = Query)]
#[validate(schema(function = "validate_range"))]
pub struct AppointmentRangeQuery {
    /// Inclusive lower bound
    pub start: NaiveDateTime,
    /// Inclusive upper bound
    pub end: NaiveDateTime,
    pub status: AppointmentStatus,
}

fn validate_range(query: &AppointmentRangeQuery) -> Result<(), ValidationError> {
    if query.start > query.end {
        return Err(ValidationError::new("start_after_end"));
    }
    Ok(())
}

/// Appointment response model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentResponse {
    pub id: i32,
    pub user_id: i32,
    pub patient_name: String,
    pub patient_phone: Option<String>,
    pub appointment_date: NaiveDateTime,
    pub doctor_name: String,
    pub department: Option<String>,
    pub reason: Option<String>,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<appointment::Model> for AppointmentResponse {
    fn from(model: appointment::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            patient_name: model.patient_name,
            patient_phone: model.patient_phone,
            appointment_date: model.appointment_date,
            doctor_name: model.doctor_name,
            department: model.department,
            reason: model.reason,
            status: model.status,
            notes: model.notes,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

fn to_responses(models: Vec<appointment::Model>) -> Vec<AppointmentResponse> {
    models.into_iter().map(AppointmentResponse::from).collect()
}

/// Book a new appointment
#[utoipa::path(
    post,
    path = "/api/appointments",
    tag = "appointments",
    request_body = CreateAppointmentRequest,
    responses(
        (status = 201, description = "Appointment booked", body = AppointmentResponse),
        (status = 400, description = "Invalid request, past date, taken slot or unknown user", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn create_appointment(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<AppointmentResponse>), ApiError> {
    trace!("Entering create_appointment function");
    request.validate().map_err(|e| {
        debug!("Appointment request failed validation: {}", e);
        ErrorResponse::from_validation(e)
    })?;

    let new_appointment = NewAppointment {
        user_id: request.user_id,
        patient_name: request.patient_name,
        patient_phone: request.patient_phone,
        appointment_date: request.appointment_date,
        doctor_name: request.doctor_name,
        department: request.department,
        reason: request.reason,
        notes: request.notes,
    };

    match state.appointments.create(new_appointment).await {
        Ok(created) => {
            info!("Appointment {} booked with {}", created.id, created.doctor_name);
            Ok((StatusCode::CREATED, Json(AppointmentResponse::from(created))))
        }
        Err(e) => {
            warn!("Failed to book appointment: {}", e);
            Err(ErrorResponse::from_booking(e))
        }
    }
}

/// Get all appointments
#[utoipa::path(
    get,
    path = "/api/appointments",
    tag = "appointments",
    responses(
        (status = 200, description = "Appointments retrieved", body = Vec<AppointmentResponse>),
        (status = 500, description = "Internal server error")
    )
)]
#[instrument(skip(state))]
pub async fn get_appointments(
    State(state): State<AppState>,
) -> Result<Json<Vec<AppointmentResponse>>, StatusCode> {
    match state.appointments.list().await {
        Ok(appointments) => {
            debug!("Retrieved {} appointments", appointments.len());
            Ok(Json(to_responses(appointments)))
        }
        Err(e) => {
            error!("Failed to retrieve appointments: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Get a specific appointment by ID
#[utoipa::path(
    get,
    path = "/api/appointments/{id}",
    tag = "appointments",
    params(
        ("id" = i32, Path, description = "Appointment ID"),
    ),
    responses(
        (status = 200, description = "Appointment retrieved", body = AppointmentResponse),
        (status = 404, description = "Appointment not found"),
        (status = 500, description = "Internal server error")
    )
)]
#[instrument(skip(state))]
pub async fn get_appointment(
    Path(id): Path<i32>,
    State(state): State<AppState>,
) -> Result<Json<AppointmentResponse>, StatusCode> {
    match state.appointments.find_by_id(id).await {
        Ok(Some(found)) => Ok(Json(AppointmentResponse::from(found))),
        Ok(None) => {
            warn!("Appointment with ID {} not found", id);
            Err(StatusCode::NOT_FOUND)
        }
        Err(e) => {
            error!("Failed to retrieve appointment {}: {}", id, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Get the appointments of a user, latest first
#[utoipa::path(
    get,
    path = "/api/appointments/user/{user_id}",
    tag = "appointments",
    params(
        ("user_id" = i32, Path, description = "User ID"),
    ),
    responses(
        (status = 200, description = "Appointments retrieved", body = Vec<AppointmentResponse>),
        (status = 400, description = "Unknown user", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_user_appointments(
    Path(user_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<Json<Vec<AppointmentResponse>>, ApiError> {
    state
        .appointments
        .list_by_user(user_id)
        .await
        .map(|appointments| Json(to_responses(appointments)))
        .map_err(ErrorResponse::from_booking)
}

/// Get appointments in a given status
#[utoipa::path(
    get,
    path = "/api/appointments/status/{status}",
    tag = "appointments",
    params(
        ("status" = AppointmentStatus, Path, description = "Appointment status, e.g. SCHEDULED"),
    ),
    responses(
        (status = 200, description = "Appointments retrieved", body = Vec<AppointmentResponse>),
        (status = 400, description = "Unknown status"),
        (status = 500, description = "Internal server error")
    )
)]
#[instrument(skip(state))]
pub async fn get_appointments_by_status(
    Path(status): Path<AppointmentStatus>,
    State(state): State<AppState>,
) -> Result<Json<Vec<AppointmentResponse>>, StatusCode> {
    match state.appointments.list_by_status(status).await {
        Ok(appointments) => Ok(Json(to_responses(appointments))),
        Err(e) => {
            error!("Failed to retrieve {:?} appointments: {}", status, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Get appointments in a status within a date window
#[utoipa::path(
    get,
    path = "/api/appointments/range",
    tag = "appointments",
    params(AppointmentRangeQuery),
    responses(
        (status = 200, description = "Appointments retrieved", body = Vec<AppointmentResponse>),
        (status = 400, description = "Invalid range"),
        (status = 500, description = "Internal server error")
    )
)]
#[instrument(skip(state))]
pub async fn get_appointments_in_range(
    Valid(Query(query)): Valid<Query<AppointmentRangeQuery>>,
    State(state): State<AppState>,
) -> Result<Json<Vec<AppointmentResponse>>, StatusCode> {
    debug!("Listing {:?} appointments between {} and {}", query.status, query.start, query.end);
    match state
        .appointments
        .list_in_range(query.start, query.end, query.status)
        .await
    {
        Ok(appointments) => Ok(Json(to_responses(appointments))),
        Err(e) => {
            error!("Failed to retrieve appointments in range: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Update an appointment
#[utoipa::path(
    put,
    path = "/api/appointments/{id}",
    tag = "appointments",
    params(
        ("id" = i32, Path, description = "Appointment ID"),
    ),
    request_body = UpdateAppointmentRequest,
    responses(
        (status = 200, description = "Appointment updated", body = AppointmentResponse),
        (status = 400, description = "Invalid request or unknown appointment", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn update_appointment(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<UpdateAppointmentRequest>,
) -> Result<Json<AppointmentResponse>, ApiError> {
    request
        .validate()
        .map_err(ErrorResponse::from_validation)?;

    match state.appointments.update(id, request.into()).await {
        Ok(updated) => Ok(Json(AppointmentResponse::from(updated))),
        Err(e) => {
            warn!("Failed to update appointment {}: {}", id, e);
            Err(ErrorResponse::from_booking(e))
        }
    }
}

/// Cancel an appointment
#[utoipa::path(
    put,
    path = "/api/appointments/{id}/cancel",
    tag = "appointments",
    params(
        ("id" = i32, Path, description = "Appointment ID"),
    ),
    responses(
        (status = 200, description = "Appointment cancelled", body = MessageResponse),
        (status = 400, description = "Unknown appointment", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn cancel_appointment(
    Path(id): Path<i32>,
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .appointments
        .cancel(id)
        .await
        .map_err(ErrorResponse::from_booking)?;
    Ok(Json(MessageResponse::new("Appointment cancelled successfully")))
}

/// Delete an appointment
#[utoipa::path(
    delete,
    path = "/api/appointments/{id}",
    tag = "appointments",
    params(
        ("id" = i32, Path, description = "Appointment ID"),
    ),
    responses(
        (status = 200, description = "Appointment deleted", body = MessageResponse),
        (status = 400, description = "Unknown appointment", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn delete_appointment(
    Path(id): Path<i32>,
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .appointments
        .delete(id)
        .await
        .map_err(ErrorResponse::from_booking)?;
    Ok(Json(MessageResponse::new("Appointment deleted successfully")))
}
