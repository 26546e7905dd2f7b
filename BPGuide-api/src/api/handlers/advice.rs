use axum::{extract::State, Json};
use tracing::{debug, instrument};

use bp_guide_domain::services::insights::categorize_blood_pressure;

use crate::entities::advice::{AdviceRequest, AdviceResponse, ChatRequest, ChatResponse};
use crate::entities::common::{validate_request, ErrorResponse};
use crate::state::AppState;

/// AI advice for a reading
///
/// Inference failures still answer 200 with a fallback text.
#[utoipa::path(
    post,
    path = "/api/advice",
    request_body = AdviceRequest,
    responses(
        (status = 200, description = "Advice or fallback text", body = AdviceResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
    ),
    tag = "advice"
)]
#[instrument(skip(state))]
pub async fn generate_advice(
    State(state): State<AppState>,
    Json(request): Json<AdviceRequest>,
) -> Result<Json<AdviceResponse>, ErrorResponse> {
    validate_request(&request)?;

    let advice = state
        .advice
        .generate_advice(request.user_id, request.systolic, request.diastolic)
        .await?;
    let category = categorize_blood_pressure(request.systolic, request.diastolic);
    debug!("Advice ready for user {}", request.user_id);

    Ok(Json(AdviceResponse {
        advice,
        category: category.label().to_string(),
    }))
}

/// Free-form chat completion, not cached
#[utoipa::path(
    post,
    path = "/chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Model reply", body = ChatResponse),
        (status = 400, description = "Message is required", body = ErrorResponse),
        (status = 500, description = "Inference failed", body = ErrorResponse),
    ),
    tag = "advice"
)]
#[instrument(skip(state, request))]
pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ErrorResponse> {
    validate_request(&request)?;

    let reply = state.advice.chat(&request.message).await?;
    Ok(Json(ChatResponse { reply }))
}
