use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Configure Swagger UI endpoints
pub fn configure_swagger_routes() -> SwaggerUi {
    SwaggerUi::new("/api-docs").url("/api-docs/openapi.json", ApiDoc::openapi())
}

// API Documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        // Health endpoints
        crate::api::handlers::health::health_check,

        // User endpoints
        crate::api::handlers::users::verify_user_id,
        crate::api::handlers::users::verify_existing_user,
        crate::api::handlers::users::register_user,

        // Blood pressure endpoints
        crate::api::handlers::readings::update_blood_pressure,
        crate::api::handlers::readings::get_readings,

        // Advice endpoints
        crate::api::handlers::advice::generate_advice,
        crate::api::handlers::advice::chat,

        // Report endpoints
        crate::api::handlers::reports::send_report
    ),
    components(
        schemas(
            crate::entities::common::ErrorResponse,
            crate::entities::user::Gender,
            crate::entities::user::PublicUser,
            crate::entities::user::UserIdAvailability,
            crate::entities::user::VerifyExistingUserRequest,
            crate::entities::user::VerifyExistingUserResponse,
            crate::entities::user::RegisterRequest,
            crate::entities::user::RegisterResponse,
            crate::entities::blood_pressure::PublicReading,
            crate::entities::blood_pressure::PublicInsights,
            crate::entities::blood_pressure::UpdateBloodPressureRequest,
            crate::entities::blood_pressure::UpdateBloodPressureResponse,
            crate::entities::blood_pressure::HistoryResponse,
            crate::entities::advice::AdviceRequest,
            crate::entities::advice::AdviceResponse,
            crate::entities::advice::ChatRequest,
            crate::entities::advice::ChatResponse,
            crate::entities::advice::SendReportRequest,
            crate::entities::advice::SendReportResponse,
            crate::api::handlers::health::HealthResponse,
            crate::api::handlers::health::ComponentStatus,
            crate::api::handlers::health::ComponentHealthStatus
        )
    ),
    tags(
        (name = "health", description = "Health check endpoint"),
        (name = "users", description = "Registration and user verification"),
        (name = "blood_pressure", description = "Readings and history"),
        (name = "advice", description = "AI advice and chat"),
        (name = "reports", description = "Emailed reports")
    ),
    info(
        title = "BPGuide API",
        version = "0.1.0",
        description = "Blood pressure tracking with AI-generated advice",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        ),
    ),
    servers(
        (url = "/", description = "Local development server")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_doc_generation() {
        let openapi = ApiDoc::openapi();

        assert_eq!(openapi.info.title, "BPGuide API");
        assert_eq!(openapi.info.version, "0.1.0");

        let tags = openapi.tags.as_ref().expect("tags are defined");
        assert!(tags.iter().any(|tag| tag.name == "advice"));

        for path in [
            "/health",
            "/chat",
            "/api/verify-userid/{userId}",
            "/api/verify-existing-user",
            "/api/register",
            "/api/update-bp",
            "/api/users/{userId}/readings",
            "/api/advice",
            "/api/send-report",
        ] {
            assert!(openapi.paths.paths.contains_key(path), "missing path {}", path);
        }
    }
}
