use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::debug;

use crate::api::handlers::{advice, health, readings, reports, users};
use crate::openapi::configure_swagger_routes;
use crate::state::AppState;

/// Create the application router
pub fn create_app(state: AppState) -> Router {
    debug!("Creating application router");

    let api_routes = Router::new()
        .route("/verify-userid/:user_id", get(users::verify_user_id))
        .route("/verify-existing-user", post(users::verify_existing_user))
        .route("/register", post(users::register_user))
        .route("/update-bp", post(readings::update_blood_pressure))
        .route("/users/:user_id/readings", get(readings::get_readings))
        .route("/advice", post(advice::generate_advice))
        .route("/send-report", post(reports::send_report));

    let app = Router::new()
        .route("/health", get(health::health_check))
        .route("/chat", post(advice::chat))
        .nest("/api", api_routes)
        .with_state(state)
        .merge(configure_swagger_routes());

    debug!("Routes configured");
    apply_middleware(app)
}

/// CORS, security headers and request tracing
fn apply_middleware(app: Router) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .max_age(Duration::from_secs(3600));

    let security_headers = ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ));

    app.layer(cors)
        .layer(security_headers)
        .layer(TraceLayer::new_for_http())
}
