//! DetectorClient - Object Detector Adapter
//!
//! ## Responsibilities
//!
//! - Send camera frames to the detector service
//! - Parse raw boxes from the response
//! - Health check
//!
//! The frame pipeline treats every detector failure as "no detections this
//! frame"; `detect` logs the failure and returns an empty vector.

use crate::detection_filter::RawBox;
use crate::error::{Error, Result};
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Detector response body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectResponse {
    #[serde(default)]
    pub boxes: Vec<RawBox>,

    /// Inference time reported by the detector
    #[serde(default)]
    pub inference_ms: Option<u64>,
}

/// Detector HTTP client
pub struct DetectorClient {
    client: reqwest::Client,
    base_url: String,
}

impl DetectorClient {
    /// Create new detector client
    pub fn new(base_url: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check detector health
    pub async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/healthz", self.base_url);
        match self.client.get(&url).send().await {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    /// Run detection on an encoded image, propagating failures
    pub async fn try_detect(&self, image: Vec<u8>, frame_ref: &str) -> Result<DetectResponse> {
        let url = format!("{}/v1/detect", self.base_url);

        let form = Form::new()
            .part(
                "image",
                Part::bytes(image)
                    .file_name(format!("{}.jpg", frame_ref))
                    .mime_str("image/jpeg")?,
            )
            .text("frame_ref", frame_ref.to_string());

        let resp = self.client.post(&url).multipart(form).send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Detector(format!(
                "detector returned {}: {}",
                status, body
            )));
        }

        let parsed: DetectResponse = resp.json().await?;
        Ok(parsed)
    }

    /// Run detection on an encoded image; any failure yields no boxes
    pub async fn detect(&self, image: Vec<u8>, frame_ref: &str) -> Vec<RawBox> {
        let size_bytes = image.len();
        match self.try_detect(image, frame_ref).await {
            Ok(resp) => {
                tracing::debug!(
                    frame_ref = %frame_ref,
                    size_bytes,
                    boxes = resp.boxes.len(),
                    inference_ms = ?resp.inference_ms,
                    "Detector responded"
                );
                resp.boxes
            }
            Err(e) => {
                tracing::warn!(
                    frame_ref = %frame_ref,
                    error = %e,
                    "Detector unavailable, treating frame as empty"
                );
                Vec::new()
            }
        }
    }
}
