use axum::{extract::State, Json};
use tracing::{info, instrument};

use crate::entities::advice::{SendReportRequest, SendReportResponse};
use crate::entities::common::ErrorResponse;
use crate::state::AppState;

/// Email the reading, advice and history summary to the user
#[utoipa::path(
    post,
    path = "/api/send-report",
    request_body = SendReportRequest,
    responses(
        (status = 200, description = "Report handed to the mail relay", body = SendReportResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 502, description = "Mail relay failed", body = ErrorResponse),
    ),
    tag = "reports"
)]
#[instrument(skip(state, request), fields(user_id = request.user_id))]
pub async fn send_report(
    State(state): State<AppState>,
    Json(request): Json<SendReportRequest>,
) -> Result<Json<SendReportResponse>, ErrorResponse> {
    let email = request.email.clone();
    state.reports.send_report(request.into()).await?;

    info!("Report sent via {} notifier", state.reports.notifier_kind());
    Ok(Json(SendReportResponse {
        sent: true,
        message: format!("Report sent to {}", email.trim()),
    }))
}
