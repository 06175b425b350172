#[cfg(test)]
mod tests {
    use crate::schemas::ApiDoc;
    use utoipa::openapi::{PathItemType, RefOr, schema::Schema};
    use utoipa::OpenApi;

    fn object_properties(name: &str) -> Vec<String> {
        let openapi = ApiDoc::openapi();
        let components = openapi.components.expect("components are generated");
        match components.schemas.get(name) {
            Some(RefOr::T(Schema::Object(obj))) => obj.properties.keys().cloned().collect(),
            _ => panic!("{} should be an object schema", name),
        }
    }

    #[test]
    fn test_openapi_schema_generation() {
        let openapi = ApiDoc::openapi();
        let components = openapi.components.as_ref().unwrap();

        for name in [
            "ErrorResponse",
            "HealthResponse",
            "MessageResponse",
            "AppointmentResponse",
            "AppointmentStatus",
            "UserResponse",
        ] {
            assert!(components.schemas.contains_key(name), "missing schema {}", name);
        }

        assert!(serde_json::to_string(&openapi).is_ok());
    }

    #[test]
    fn test_error_response_schema_structure() {
        let properties = object_properties("ErrorResponse");
        for field in ["error", "code", "success"] {
            assert!(properties.iter().any(|p| p == field));
        }
    }

    #[test]
    fn test_response_models_use_camel_case() {
        let appointment = object_properties("AppointmentResponse");
        assert!(appointment.iter().any(|p| p == "appointmentDate"));
        assert!(appointment.iter().any(|p| p == "doctorName"));
        assert!(!appointment.iter().any(|p| p == "doctor_name"));

        let user = object_properties("UserResponse");
        assert!(user.iter().any(|p| p == "fullName"));
        assert!(!user.iter().any(|p| p.contains("password")));
    }

    #[test]
    fn test_openapi_paths() {
        let openapi = ApiDoc::openapi();
        let paths = &openapi.paths.paths;

        let health = paths.get("/health").expect("/health is documented");
        let health_get = health.operations.get(&PathItemType::Get).unwrap();
        assert!(health_get.responses.responses.contains_key("200"));
        assert!(health_get.responses.responses.contains_key("500"));

        for path in [
            "/api/appointments",
            "/api/appointments/{id}",
            "/api/appointments/{id}/cancel",
            "/api/appointments/user/{user_id}",
            "/api/appointments/status/{status}",
            "/api/appointments/range",
            "/api/users",
            "/api/users/{id}",
            "/api/users/register",
            "/api/users/login",
            "/api/users/username/{username}",
        ] {
            assert!(paths.contains_key(path), "missing path {}", path);
        }

        let login = paths.get("/api/users/login").unwrap();
        let login_post = login.operations.get(&PathItemType::Post).unwrap();
        assert!(login_post.responses.responses.contains_key("401"));
    }

    #[test]
    fn test_all_error_responses_reference_correct_schema() {
        let openapi_json = serde_json::to_string(&ApiDoc::openapi()).unwrap();

        assert!(!openapi_json.contains("crate.schemas.ErrorResponse"));
        assert!(!openapi_json.contains("crate::schemas::ErrorResponse"));
        assert!(openapi_json.contains("ErrorResponse"));
    }
}
