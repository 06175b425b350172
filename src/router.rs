use crate::handlers::{
    appointments::{
        cancel_appointment, create_appointment, delete_appointment, get_appointment,
        get_appointments, get_appointments_by_status, get_appointments_in_range,
        get_user_appointments, update_appointment,
    },
    health::health_check,
    users::{
        delete_user, get_user, get_user_by_username, get_users, login_user, register_user,
        update_user,
    },
};
use crate::schemas::{ApiDoc, AppState};
use axum::{
    routing::{get, post, put},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Create application router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        // Appointments
        .route(
            "/api/appointments",
            post(create_appointment).get(get_appointments),
        )
        .route("/api/appointments/range", get(get_appointments_in_range))
        .route("/api/appointments/user/:user_id", get(get_user_appointments))
        .route(
            "/api/appointments/status/:status",
            get(get_appointments_by_status),
        )
        .route(
            "/api/appointments/:id",
            get(get_appointment)
                .put(update_appointment)
                .delete(delete_appointment),
        )
        .route("/api/appointments/:id/cancel", put(cancel_appointment))
        // Users
        .route("/api/users", get(get_users))
        .route("/api/users/register", post(register_user))
        .route("/api/users/login", post(login_user))
        .route("/api/users/username/:username", get(get_user_by_username))
        .route(
            "/api/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(TimeoutLayer::new(Duration::from_secs(30)))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
