//! Metrics endpoint for pingwatch.
//!
//! Serves the Prometheus scrape endpoint plus health and target status APIs.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use prometheus::Registry;
use serde::Serialize;
use tower_http::trace::{DefaultMakeSpan, TraceLayer};

use crate::metrics;
use crate::monitor::{TargetHandle, TargetSnapshot};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub registry: Registry,
    pub targets: Vec<TargetHandle>,
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    running: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    total: Option<usize>,
}

/// Create the Axum router with all routes.
pub fn create_router(state: AppState) -> Router {
    let app_state = Arc::new(state);

    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/healthz", get(healthz_handler))
        .route("/readyz", get(readyz_handler))
        .route("/api/targets", get(targets_handler))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(true)),
        )
        .with_state(app_state)
}

/// Prometheus scrape endpoint.
async fn metrics_handler(State(state): State<Arc<AppState>>) -> Response {
    match metrics::encode(&state.registry) {
        Ok(body) => ([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Metrics encoding failed");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("Error: {}", e)).into_response()
        }
    }
}

/// Liveness probe.
async fn healthz_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        running: None,
        total: None,
    })
}

/// Readiness probe: every loop must be running.
async fn readyz_handler(State(state): State<Arc<AppState>>) -> Response {
    let total = state.targets.len();
    let running = state
        .targets
        .iter()
        .filter(|t| t.status.borrow().running)
        .count();

    let (code, status) = if running == total {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not_ready")
    };

    (
        code,
        Json(HealthResponse {
            status: status.to_string(),
            running: Some(running),
            total: Some(total),
        }),
    )
        .into_response()
}

/// Target status API.
async fn targets_handler(State(state): State<Arc<AppState>>) -> Json<Vec<TargetSnapshot>> {
    Json(state.targets.iter().map(TargetHandle::snapshot).collect())
}
