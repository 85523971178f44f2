//! WebAPI - REST API Endpoints
//!
//! ## Responsibilities
//!
//! - HTTP API routes
//! - Request validation
//! - Response formatting
//! - SSE / WebSocket stream endpoints

mod routes;
mod streams;

pub use routes::create_router;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use crate::models::{HealthResponse, StatusResponse};
use crate::state::AppState;

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let detector_ok = match &state.detector {
        Some(detector) => detector.health_check().await.unwrap_or(false),
        None => false,
    };

    let response = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_sec: state.started_at.elapsed().as_secs(),
        detector_connected: detector_ok,
        store_enabled: state.store.is_enabled(),
    };

    Json(response)
}

/// Server status endpoint
pub async fn server_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(StatusResponse {
        status: "running".to_string(),
        requests_received: state.request_count(),
        latest_reading: state.mailbox.peek_latest().await,
        ultrasonic_subscribers: state.sensor_hub.subscriber_count(),
        camera_subscribers: state.detection_hub.subscriber_count(),
        detector_configured: state.detector.is_some(),
        store_enabled: state.store.is_enabled(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}
