//! API Routes

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use super::streams::{camera_stream, ultrasonic_stream, websocket_handler};
use crate::detection_filter::RawBox;
use crate::error::{Error, Result};
use crate::frame_processor::ZoneReport;
use crate::models::{ApiResponse, ReadingAck, SensorDistanceResponse};
use crate::sensor_mailbox::{SensorPosition, SensorReading};
use crate::state::AppState;

/// Create API router
pub fn create_router(state: AppState) -> Router {
    let max_frame_bytes = state.config.max_frame_bytes;

    Router::new()
        // Health & Status
        .route("/healthz", get(super::health_check))
        .route("/api/status", get(super::server_status))
        // Ultrasonic ingress / egress
        .route("/api/ultrasonic", post(report_reading))
        .route("/api/ultrasonic/latest", get(get_latest_reading))
        .route("/api/ultrasonic-get", get(get_latest_reading))
        .route("/api/ultrasonic/instant", get(get_instant_reading))
        .route("/api/ultrasonic-sensor/get/latest", get(get_sensor_latest))
        .route("/api/ultrasonic/stream", get(ultrasonic_stream))
        // Camera
        .route(
            "/api/camera/frame",
            post(ingest_frame).layer(DefaultBodyLimit::max(max_frame_bytes)),
        )
        .route("/api/camera/detections", post(ingest_detections))
        .route("/api/camera/get/latest", get(get_latest_zones))
        .route("/api/camera/stream", get(camera_stream))
        // WebSocket
        .route("/api/ws", get(websocket_handler))
        .with_state(state)
}

// ========================================
// Ultrasonic Handlers
// ========================================

/// POST /api/ultrasonic
async fn report_reading(
    State(state): State<AppState>,
    Json(reading): Json<SensorReading>,
) -> Result<Json<ApiResponse<ReadingAck>>> {
    let request_id = state.count_request();
    reading.validate()?;

    state.mailbox.update(reading).await;
    let delivered = state.sensor_hub.publish(reading);

    for position in SensorPosition::ALL {
        state
            .store
            .store_reading(position.sensor_id(), reading.distance(position));
    }

    tracing::info!(
        request_id,
        left = reading.left,
        center = reading.center,
        right = reading.right,
        delivered,
        "Ultrasonic reading received"
    );

    Ok(Json(ApiResponse::success(ReadingAck {
        status: "data received".to_string(),
        reading,
        delivered,
    })))
}

/// GET /api/ultrasonic/latest
async fn get_latest_reading(
    State(state): State<AppState>,
) -> Json<ApiResponse<Option<SensorReading>>> {
    Json(ApiResponse::success(state.mailbox.peek_latest().await))
}

/// GET /api/ultrasonic/instant
async fn get_instant_reading(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<SensorReading>>> {
    let reading = state.mailbox.take_instant().await?;
    Ok(Json(ApiResponse::success(reading)))
}

#[derive(Debug, Deserialize)]
struct SensorQuery {
    sensor_id: u8,
}

/// GET /api/ultrasonic-sensor/get/latest?sensor_id=N
async fn get_sensor_latest(
    State(state): State<AppState>,
    Query(query): Query<SensorQuery>,
) -> Result<Json<SensorDistanceResponse>> {
    let position = SensorPosition::from_sensor_id(query.sensor_id).ok_or_else(|| {
        Error::Validation(format!("sensor_id must be 1, 2 or 3, got {}", query.sensor_id))
    })?;

    let distance = state
        .mailbox
        .peek_sensor(position)
        .await
        .ok_or_else(|| Error::NotFound("no ultrasonic reading received yet".to_string()))?;

    Ok(Json(SensorDistanceResponse {
        sensor_id: position.sensor_id(),
        position: position.as_str().to_string(),
        distance,
        proximity: state.config.proximity.classify(distance),
    }))
}

// ========================================
// Camera Handlers
// ========================================

#[derive(Debug, Deserialize)]
struct FrameQuery {
    frame_ref: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DetectionsRequest {
    frame_ref: Option<String>,
    #[serde(default)]
    boxes: Vec<RawBox>,
}

fn frame_ref_or_new(frame_ref: Option<String>) -> String {
    frame_ref
        .filter(|r| !r.trim().is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

/// Run the fusion pipeline, persist and publish the report
fn fuse_and_publish(state: &AppState, frame_ref: String, boxes: &[RawBox]) -> ZoneReport {
    let report = state.frame_processor.process(&frame_ref, boxes);
    state.store.store_detections(frame_ref, report.zones.clone());
    let delivered = state.detection_hub.publish(report.clone());

    tracing::info!(
        frame_ref = %report.frame_ref,
        kept = report.kept_count,
        delivered,
        "Zone report published"
    );

    report
}

/// POST /api/camera/frame (raw image body)
async fn ingest_frame(
    State(state): State<AppState>,
    Query(query): Query<FrameQuery>,
    body: Bytes,
) -> Result<Json<ApiResponse<ZoneReport>>> {
    state.count_request();
    if body.is_empty() {
        return Err(Error::Validation("empty frame body".to_string()));
    }

    let frame_ref = frame_ref_or_new(query.frame_ref);
    let boxes = match &state.detector {
        Some(detector) => detector.detect(body.to_vec(), &frame_ref).await,
        None => {
            tracing::warn!(frame_ref = %frame_ref, "No detector configured, frame has no detections");
            Vec::new()
        }
    };

    Ok(Json(ApiResponse::success(fuse_and_publish(
        &state, frame_ref, &boxes,
    ))))
}

/// POST /api/camera/detections (boxes from an external detector)
async fn ingest_detections(
    State(state): State<AppState>,
    Json(req): Json<DetectionsRequest>,
) -> Json<ApiResponse<ZoneReport>> {
    state.count_request();
    let frame_ref = frame_ref_or_new(req.frame_ref);
    Json(ApiResponse::success(fuse_and_publish(
        &state, frame_ref, &req.boxes,
    )))
}

/// GET /api/camera/get/latest
async fn get_latest_zones(State(state): State<AppState>) -> Json<ApiResponse<Option<ZoneReport>>> {
    Json(ApiResponse::success(state.detection_hub.latest()))
}
