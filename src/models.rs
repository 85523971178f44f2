//! Shared models and types for ParkSense
//!
//! Response bodies shared by several routes.

use crate::sensor_mailbox::{ProximityLevel, SensorReading};
use serde::{Deserialize, Serialize};

/// Standard API response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_sec: u64,
    pub detector_connected: bool,
    pub store_enabled: bool,
}

/// Server status (request counters, live subscribers)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub requests_received: u64,
    pub latest_reading: Option<SensorReading>,
    pub ultrasonic_subscribers: usize,
    pub camera_subscribers: usize,
    pub detector_configured: bool,
    pub store_enabled: bool,
    pub timestamp: String,
}

/// Acknowledgement of an ultrasonic report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadingAck {
    pub status: String,
    pub reading: SensorReading,
    /// Stream subscribers that received the update
    pub delivered: usize,
}

/// One sensor's latest distance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorDistanceResponse {
    pub sensor_id: u8,
    pub position: String,
    pub distance: f64,
    pub proximity: ProximityLevel,
}

/// Payload of one stream event
#[derive(Debug, Clone, Serialize)]
pub struct StreamFrame<'a, T> {
    pub value: &'a T,
    pub timestamp: String,
}
