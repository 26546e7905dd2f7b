use axum::{
    extract::{Path, State},
    Json,
};
use tracing::{info, instrument};

use bp_guide_domain::entities::blood_pressure::PressureValues;
use bp_guide_domain::entities::user::VisitRequest;
use bp_guide_domain::services::insights::calculate_insights;

use crate::entities::blood_pressure::{
    HistoryResponse, PublicInsights, PublicReading, UpdateBloodPressureRequest,
    UpdateBloodPressureResponse,
};
use crate::entities::common::ErrorResponse;
use crate::state::AppState;

/// Record a returning user's visit
///
/// Language and problem changes and the new reading are stored together.
#[utoipa::path(
    post,
    path = "/api/update-bp",
    request_body = UpdateBloodPressureRequest,
    responses(
        (status = 200, description = "Reading stored", body = UpdateBloodPressureResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
    ),
    tag = "blood_pressure"
)]
#[instrument(skip(state, request), fields(user_id = request.user_id))]
pub async fn update_blood_pressure(
    State(state): State<AppState>,
    Json(request): Json<UpdateBloodPressureRequest>,
) -> Result<Json<UpdateBloodPressureResponse>, ErrorResponse> {
    let visit = VisitRequest {
        user_id: request.user_id,
        language: request.language,
        problem: request.problem,
    };
    let values = PressureValues {
        systolic: request.systolic,
        diastolic: request.diastolic,
    };

    let summary = state.readings.record_visit(visit, values).await?;
    info!(
        "Stored {}/{} for user {}",
        summary.reading.systolic, summary.reading.diastolic, request.user_id
    );

    Ok(Json(UpdateBloodPressureResponse {
        reading: summary.reading.into(),
        history: summary.history.into_iter().map(PublicReading::from).collect(),
        insights: summary.insights.into(),
    }))
}

/// A user's reading history, oldest first
#[utoipa::path(
    get,
    path = "/api/users/{userId}/readings",
    params(
        ("userId" = i64, Path, description = "Four digit user id")
    ),
    responses(
        (status = 200, description = "Reading history", body = HistoryResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
    ),
    tag = "blood_pressure"
)]
#[instrument(skip(state))]
pub async fn get_readings(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<HistoryResponse>, ErrorResponse> {
    let history = state.readings.get_history(user_id).await?;
    let insights = calculate_insights(&history).map(PublicInsights::from);

    Ok(Json(HistoryResponse {
        user_id,
        readings: history.into_iter().map(PublicReading::from).collect(),
        insights,
    }))
}
