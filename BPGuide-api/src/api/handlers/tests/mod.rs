// Router-level tests for the HTTP handlers
// Requests go through the full router with in-memory storage and scripted inference

mod advice_test;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use bp_guide_data::repository::{InMemoryRepository, ReadingStore};
use bp_guide_domain::config::AdviceConfig;
use bp_guide_domain::services::advice::{InferenceClient, RetryPolicy};
use bp_guide_domain::services::notifier::Notifier;
use bp_guide_domain::testing::{RecordingNotifier, ScriptedInferenceClient};

use crate::{create_app, AppState};

/// Advice settings without waits between calls or retries
fn test_config() -> AdviceConfig {
    AdviceConfig {
        min_interval: Duration::ZERO,
        retry: RetryPolicy {
            base_delay: Duration::ZERO,
            ..RetryPolicy::default()
        },
        ..AdviceConfig::default()
    }
}

fn build_app(
    store: Arc<dyn ReadingStore>,
    client: Arc<dyn InferenceClient>,
    notifier: Arc<dyn Notifier>,
) -> Router {
    create_app(AppState::new(store, client, notifier, &test_config()))
}

/// Router over an empty store whose inference always answers "Stay active."
fn empty_app() -> Router {
    build_app(
        Arc::new(InMemoryRepository::new()),
        Arc::new(ScriptedInferenceClient::always_ok("Stay active.")),
        Arc::new(RecordingNotifier::default()),
    )
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Send one request and decode the JSON body
async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}
