use std::sync::Arc;

use axum::http::StatusCode;
use serde_json::json;

use bp_guide_data::repository::InMemoryRepository;
use bp_guide_domain::services::advice::{InferenceError, FALLBACK_RATE_LIMITED, FALLBACK_UNAVAILABLE};
use bp_guide_domain::testing::{registered_store, RecordingNotifier, ScriptedInferenceClient};

use super::{build_app, empty_app, post_json, send};

#[tokio::test]
async fn test_advice_is_generated_then_cached() {
    let client = Arc::new(ScriptedInferenceClient::always_ok("Cut back on salt."));
    let app = build_app(
        registered_store(1234).await,
        client.clone(),
        Arc::new(RecordingNotifier::default()),
    );
    let request = json!({ "userId": 1234, "systolic": 142, "diastolic": 91 });

    let (status, body) = send(&app, post_json("/api/advice", request.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["advice"], "Cut back on salt.");
    assert_eq!(body["category"], "Hypertension Stage 2");

    let (status, body) = send(&app, post_json("/api/advice", request)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["advice"], "Cut back on salt.");
    assert_eq!(client.calls(), 1);
}

#[tokio::test]
async fn test_advice_falls_back_when_rate_limited() {
    let client = Arc::new(ScriptedInferenceClient::always_err(InferenceError::RateLimited));
    let app = build_app(
        registered_store(1234).await,
        client.clone(),
        Arc::new(RecordingNotifier::default()),
    );

    let request = json!({ "userId": 1234, "systolic": 118, "diastolic": 75 });
    let (status, body) = send(&app, post_json("/api/advice", request)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["advice"], FALLBACK_RATE_LIMITED);
    assert_eq!(body["category"], "Normal");
    assert_eq!(client.calls(), 3);
}

#[tokio::test]
async fn test_advice_falls_back_on_upstream_failure() {
    let client = Arc::new(ScriptedInferenceClient::always_err(InferenceError::Upstream { status: 500 }));
    let app = build_app(
        registered_store(1234).await,
        client.clone(),
        Arc::new(RecordingNotifier::default()),
    );

    let request = json!({ "userId": 1234, "systolic": 125, "diastolic": 70 });
    let (status, body) = send(&app, post_json("/api/advice", request.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["advice"], FALLBACK_UNAVAILABLE);

    // Fallbacks are not cached, so the next request tries again
    let calls_after_first = client.calls();
    send(&app, post_json("/api/advice", request)).await;
    assert!(client.calls() > calls_after_first);
}

#[tokio::test]
async fn test_advice_unknown_user() {
    let app = empty_app();

    let request = json!({ "userId": 7777, "systolic": 120, "diastolic": 80 });
    let (status, body) = send(&app, post_json("/api/advice", request)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn test_chat_requires_message() {
    let app = empty_app();

    let (status, body) = send(&app, post_json("/chat", json!({ "message": "" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, _) = send(&app, post_json("/chat", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_chat_replies() {
    let app = empty_app();

    let (status, body) = send(&app, post_json("/chat", json!({ "message": "Is coffee ok?" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reply"], "Stay active.");
}

#[tokio::test]
async fn test_chat_failure_is_internal_error() {
    let app = build_app(
        Arc::new(InMemoryRepository::new()),
        Arc::new(ScriptedInferenceClient::always_err(InferenceError::EmptyResponse)),
        Arc::new(RecordingNotifier::default()),
    );

    let (status, body) = send(&app, post_json("/chat", json!({ "message": "Hello" }))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Failed to process chat request");
}
