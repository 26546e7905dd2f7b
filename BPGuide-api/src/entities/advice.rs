use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use bp_guide_domain::services::report::ReportRequest;

use super::common::deserialize_user_id;

/// Body of `POST /api/advice`
#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdviceRequest {
    #[serde(deserialize_with = "deserialize_user_id")]
    #[validate(range(min = 1000, max = 9999, message = "User ID must be a 4-digit number"))]
    pub user_id: i64,

    #[validate(range(min = 60, max = 250, message = "Systolic must be between 60 and 250"))]
    pub systolic: u16,

    #[validate(range(min = 40, max = 150, message = "Diastolic must be between 40 and 150"))]
    pub diastolic: u16,
}

/// Advice text, possibly a fallback message, with the reading's category
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AdviceResponse {
    pub advice: String,
    pub category: String,
}

/// Body of `POST /chat`
#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
pub struct ChatRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Message is required"))]
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ChatResponse {
    pub reply: String,
}

/// Body of `POST /api/send-report`
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendReportRequest {
    pub email: String,
    #[serde(deserialize_with = "deserialize_user_id")]
    pub user_id: i64,
    #[serde(default)]
    pub problem: String,
    pub systolic: u16,
    pub diastolic: u16,
    pub advice: String,
    /// Base64 PNG of the history chart, `data:` URL prefix allowed
    pub chart_image: Option<String>,
}

impl From<SendReportRequest> for ReportRequest {
    fn from(request: SendReportRequest) -> Self {
        Self {
            email: request.email,
            user_id: request.user_id,
            problem: request.problem,
            systolic: request.systolic,
            diastolic: request.diastolic,
            advice: request.advice,
            chart_image: request.chart_image,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SendReportResponse {
    pub sent: bool,
    pub message: String,
}
