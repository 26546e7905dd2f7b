use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{de, Deserialize, Deserializer, Serialize};
use tracing::error;
use utoipa::ToSchema;
use validator::{Validate, ValidationErrors};

use bp_guide_domain::services::advice::{AdviceError, InferenceError};
use bp_guide_domain::services::describe_validation_errors;
use bp_guide_domain::services::report::ReportError;
use bp_guide_domain::services::ServiceError;

/// Error response format for API
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error type/code - machine-readable identifier
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional details about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    fn new(error: &str, message: impl Into<String>) -> Self {
        Self {
            error: error.to_string(),
            message: message.into(),
            details: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("not_found", message)
    }

    pub fn validation_error(message: impl Into<String>, details: Option<serde_json::Value>) -> Self {
        Self {
            details,
            ..Self::new("validation_error", message)
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("bad_request", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("conflict", message)
    }

    /// A downstream service failed
    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new("bad_gateway", message)
    }

    pub fn internal_error() -> Self {
        Self::new("internal_error", "An unexpected error occurred")
    }

    pub fn status(&self) -> StatusCode {
        match self.error.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "validation_error" | "bad_request" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            "bad_gateway" => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<ValidationErrors> for ErrorResponse {
    fn from(errors: ValidationErrors) -> Self {
        let details: serde_json::Map<String, serde_json::Value> = errors
            .field_errors()
            .iter()
            .map(|(field, errs)| {
                let messages: Vec<String> = errs
                    .iter()
                    .map(|e| e.message.as_ref().map(|m| m.to_string()).unwrap_or_else(|| e.code.to_string()))
                    .collect();
                (field.to_string(), serde_json::json!(messages))
            })
            .collect();

        ErrorResponse::validation_error(
            describe_validation_errors(&errors),
            Some(serde_json::Value::Object(details)),
        )
    }
}

/// Read a user id sent either as a JSON number or as the trimmed form text
///
/// Range checks stay with the request's `Validate` rules.
pub fn deserialize_user_id<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawUserId {
        Number(i64),
        Text(String),
    }

    match RawUserId::deserialize(deserializer)? {
        RawUserId::Number(id) => Ok(id),
        RawUserId::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("userId must be a number, got {:?}", text))),
    }
}

/// Validate a request body, mapping failures to a 400 response
pub fn validate_request<T: Validate>(request: &T) -> Result<(), ErrorResponse> {
    request.validate().map_err(ErrorResponse::from)
}

impl From<ServiceError> for ErrorResponse {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(msg) => ErrorResponse::validation_error(msg, None),
            ServiceError::UserNotFound(id) => ErrorResponse::not_found(format!("User {} not found", id)),
            ServiceError::UserExists(id) => {
                ErrorResponse::conflict(format!("User ID {} is already registered", id))
            }
            ServiceError::Repository(msg) => {
                error!("Repository failure: {}", msg);
                ErrorResponse::internal_error()
            }
        }
    }
}

impl From<AdviceError> for ErrorResponse {
    fn from(err: AdviceError) -> Self {
        match err {
            AdviceError::UserNotFound(id) => ErrorResponse::not_found(format!("User {} not found", id)),
            AdviceError::Storage(msg) => {
                error!("Advice storage failure: {}", msg);
                ErrorResponse::internal_error()
            }
        }
    }
}

impl From<ReportError> for ErrorResponse {
    fn from(err: ReportError) -> Self {
        match err {
            ReportError::Validation(msg) => ErrorResponse::validation_error(msg, None),
            ReportError::UserNotFound(id) => ErrorResponse::not_found(format!("User {} not found", id)),
            ReportError::InvalidChart(msg) => ErrorResponse::bad_request(format!("Invalid chart image: {}", msg)),
            ReportError::Notifier(e) => {
                error!("Report delivery failed: {}", e);
                ErrorResponse::bad_gateway("Failed to send report email")
            }
            ReportError::Storage(msg) => {
                error!("Report storage failure: {}", msg);
                ErrorResponse::internal_error()
            }
        }
    }
}

impl From<InferenceError> for ErrorResponse {
    fn from(err: InferenceError) -> Self {
        error!("Chat completion failed: {}", err);
        Self::new("internal_error", "Failed to process chat request")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ErrorResponse::not_found("x").status(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorResponse::validation_error("x", None).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorResponse::conflict("x").status(), StatusCode::CONFLICT);
        assert_eq!(ErrorResponse::bad_gateway("x").status(), StatusCode::BAD_GATEWAY);
        assert_eq!(ErrorResponse::internal_error().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_service_errors() {
        assert_eq!(ErrorResponse::from(ServiceError::UserNotFound(1234)).status(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorResponse::from(ServiceError::UserExists(1234)).status(), StatusCode::CONFLICT);
        assert_eq!(
            ErrorResponse::from(ServiceError::Repository("disk".to_string())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[derive(Debug, Deserialize)]
    struct IdBody {
        #[serde(deserialize_with = "deserialize_user_id")]
        id: i64,
    }

    #[test]
    fn test_user_id_accepts_number_or_text() {
        let from_number: IdBody = serde_json::from_str(r#"{"id": 1234}"#).unwrap();
        assert_eq!(from_number.id, 1234);

        let from_text: IdBody = serde_json::from_str(r#"{"id": " 4321 "}"#).unwrap();
        assert_eq!(from_text.id, 4321);

        assert!(serde_json::from_str::<IdBody>(r#"{"id": "12ab"}"#).is_err());
        assert!(serde_json::from_str::<IdBody>(r#"{"id": null}"#).is_err());
    }
}
