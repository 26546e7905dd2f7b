use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use tracing::{info, instrument};

use bp_guide_domain::entities::blood_pressure::PressureValues;
use bp_guide_domain::entities::user::RegisterUserRequest;

use crate::entities::blood_pressure::PublicReading;
use crate::entities::common::{validate_request, ErrorResponse};
use crate::entities::user::{
    PublicUser, RegisterRequest, RegisterResponse, UserIdAvailability, VerifyExistingUserRequest,
    VerifyExistingUserResponse,
};
use crate::state::AppState;

/// Check whether a user id is free for registration
#[utoipa::path(
    get,
    path = "/api/verify-userid/{userId}",
    params(
        ("userId" = i64, Path, description = "Four digit user id")
    ),
    responses(
        (status = 200, description = "Availability of the id", body = UserIdAvailability),
        (status = 400, description = "Not a 4-digit id", body = ErrorResponse),
    ),
    tag = "users"
)]
#[instrument(skip(state))]
pub async fn verify_user_id(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<UserIdAvailability>, ErrorResponse> {
    if !(1000..=9999).contains(&user_id) {
        return Err(ErrorResponse::bad_request("User ID must be a 4-digit number"));
    }

    let available = state.readings.is_user_id_available(user_id).await?;
    info!("User id {} available: {}", user_id, available);
    Ok(Json(UserIdAvailability { available }))
}

/// Confirm a returning user and return their profile
#[utoipa::path(
    post,
    path = "/api/verify-existing-user",
    request_body = VerifyExistingUserRequest,
    responses(
        (status = 200, description = "User exists", body = VerifyExistingUserResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
    ),
    tag = "users"
)]
#[instrument(skip(state))]
pub async fn verify_existing_user(
    State(state): State<AppState>,
    Json(request): Json<VerifyExistingUserRequest>,
) -> Result<Json<VerifyExistingUserResponse>, ErrorResponse> {
    validate_request(&request)?;

    let user = state.readings.verify_user(request.user_id).await?;
    Ok(Json(VerifyExistingUserResponse {
        verified: true,
        user: PublicUser::from(user),
    }))
}

/// Register a new user with their first reading
#[utoipa::path(
    post,
    path = "/api/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered", body = RegisterResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 409, description = "User id already taken", body = ErrorResponse),
    ),
    tag = "users"
)]
#[instrument(skip(state, request), fields(user_id = request.user_id))]
pub async fn register_user(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let profile = RegisterUserRequest {
        user_id: request.user_id,
        name: request.name,
        age: request.age,
        gender: request.gender.into(),
        language: request.language,
        problem: request.problem,
    };
    let values = PressureValues {
        systolic: request.systolic,
        diastolic: request.diastolic,
    };

    let (user, reading) = state.readings.register_user(profile, values).await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user: PublicUser::from(user),
            reading: PublicReading::from(reading),
        }),
    ))
}
