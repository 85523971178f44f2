//! FrameProcessor - Camera Frame Fusion Pipeline
//!
//! Raw detector boxes -> DetectionFilter -> ZoneAssigner -> ZoneReport.
//! Persistence and broadcast of the report are done by the caller.

use crate::detection_filter::{DetectionFilter, FilterConfig, RawBox};
use crate::error::{Error, Result};
use crate::zone_assigner::{ZoneAssigner, ZoneBreakpoints, ZoneSummary};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Per-frame result published to camera subscribers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneReport {
    pub frame_ref: String,
    pub processed_at: DateTime<Utc>,
    /// Boxes returned by the detector
    pub raw_count: usize,
    /// Boxes surviving the filter
    pub kept_count: usize,
    pub zones: ZoneSummary,
}

/// Fusion settings loadable from a JSON file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FusionConfig {
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub breakpoints: ZoneBreakpoints,
}

impl FusionConfig {
    pub fn validate(&self) -> Result<()> {
        self.filter.validate()?;
        self.breakpoints.validate()
    }

    /// Load and validate a JSON fusion config
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read fusion config {}: {}", path.display(), e))
        })?;
        let config: FusionConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }
}

/// FrameProcessor instance
#[derive(Debug, Clone, Default)]
pub struct FrameProcessor {
    filter: DetectionFilter,
    assigner: ZoneAssigner,
}

impl FrameProcessor {
    pub fn new(config: FusionConfig) -> Self {
        Self {
            filter: DetectionFilter::new(config.filter),
            assigner: ZoneAssigner::new(config.breakpoints),
        }
    }

    pub fn breakpoints(&self) -> ZoneBreakpoints {
        self.assigner.breakpoints()
    }

    /// Summarize one frame's raw detections
    pub fn process(&self, frame_ref: &str, boxes: &[RawBox]) -> ZoneReport {
        let detections = self.filter.filter(boxes);
        let zones = self.assigner.assign(&detections);

        tracing::debug!(
            frame_ref = %frame_ref,
            raw = boxes.len(),
            kept = detections.len(),
            left = ?zones.left.as_ref().map(|d| &d.class_label),
            center = ?zones.center.as_ref().map(|d| &d.class_label),
            right = ?zones.right.as_ref().map(|d| &d.class_label),
            "Frame processed"
        );

        ZoneReport {
            frame_ref: frame_ref.to_string(),
            processed_at: Utc::now(),
            raw_count: boxes.len(),
            kept_count: detections.len(),
            zones,
        }
    }
}
