//! Route definitions and router setup
//!
//! Configures all API routes and middleware.

mod engines;
mod governance;
mod intake;
mod metrics;
mod runbook;

use crate::config::Settings;
use crate::state::SharedState;
use axum::{
    http::{header, Method},
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    request_id::MakeRequestUuid,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
    ServiceBuilderExt,
};
use tracing::Level;

/// Create the application router with all routes and middleware
pub fn create_router(state: SharedState, settings: &Settings) -> Router {
    // Build CORS layer
    let cors = build_cors_layer(settings);

    // Build tracing/logging layer
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    // Build middleware stack
    let middleware = ServiceBuilder::new()
        .set_x_request_id(MakeRequestUuid)
        .layer(trace_layer)
        .layer(CompressionLayer::new())
        .layer(cors)
        .propagate_x_request_id();

    // Build the router
    Router::new()
        // Health check
        .route("/health", get(health_check))

        // Engine governance
        .route("/api/engines", get(engines::list_engines))
        .route("/api/engines/states", get(engines::list_engine_states))
        .route("/api/engines/transition", post(engines::transition))
        .route("/api/engines/transition/evaluate", post(engines::evaluate_transition))
        .route("/api/engines/actions", get(engines::list_actions))
        .route("/api/engines/actions/check", post(engines::check_action))
        .route(
            "/api/engines/kill-switch",
            get(engines::kill_switch_status).post(engines::set_kill_switch),
        )

        // Intake quarantine
        .route("/api/intake/items", post(intake::upsert_item).get(intake::list_items))
        .route("/api/intake/items/{id}", get(intake::get_item))
        .route("/api/intake/items/{id}/promote", post(intake::promote_item))
        .route("/api/intake/items/{id}/reject", post(intake::reject_item))

        // Governance decision ledger
        .route(
            "/api/governance/decisions",
            post(governance::record_decision).get(governance::list_decisions),
        )
        .route("/api/governance/decisions/latest-final", get(governance::latest_final))
        .route("/api/governance/decisions/{id}", get(governance::get_decision))

        // Runbook
        .route("/api/runbook/status", get(runbook::status))

        // Gate metrics
        .route("/api/metrics", get(metrics::get_metrics).put(metrics::set_metrics))

        // Apply middleware and state
        .layer(middleware)
        .with_state(state)
}

/// Build CORS layer from settings
fn build_cors_layer(settings: &Settings) -> CorsLayer {
    let origins: Vec<_> = settings
        .cors
        .allowed_origins
        .iter()
        .filter_map(|s| s.parse().ok())
        .collect();

    if origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
            .max_age(Duration::from_secs(3600))
    } else {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
            .max_age(Duration::from_secs(3600))
    }
}

/// Health check endpoint
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "success": true,
        "message": "Server is running fine.",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}
