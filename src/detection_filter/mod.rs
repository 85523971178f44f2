//! DetectionFilter - Raw Detector Output Filtering
//!
//! ## Responsibilities
//!
//! - Drop classes outside the allow-list
//! - Drop boxes too narrow to be a real object of their class
//! - Compute horizontal center and width of surviving boxes

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Raw box as produced by the object detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBox {
    pub class_id: i32,
    pub confidence: f32,
    /// (x1, y1, x2, y2) in frame pixels
    pub bbox: [f32; 4],
}

impl RawBox {
    pub fn new(class_id: i32, confidence: f32, bbox: [f32; 4]) -> Self {
        Self {
            class_id,
            confidence,
            bbox,
        }
    }

    /// Horizontal extent of the box
    pub fn width(&self) -> f32 {
        self.bbox[2] - self.bbox[0]
    }

    /// Horizontal center of the box
    pub fn x_center(&self) -> f32 {
        (self.bbox[0] + self.bbox[2]) / 2.0
    }
}

/// Filtered detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub class_label: String,
    pub confidence: f32,
    pub x_center: f32,
    pub width: f32,
}

/// One allow-listed detector class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassRule {
    pub class_id: i32,
    pub label: String,
}

/// DetectionFilter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Allow-listed classes (class id -> label)
    pub classes: Vec<ClassRule>,
    /// Minimum box width per label; labels without an entry use 0
    #[serde(default)]
    pub min_widths: HashMap<String, f32>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        // COCO ids for road users, widths tuned for the bumper camera
        let classes = [
            (0, "person", 20.0),
            (1, "bicycle", 10.0),
            (2, "car", 60.0),
            (3, "motorcycle", 10.0),
            (5, "bus", 60.0),
            (7, "truck", 60.0),
        ];

        Self {
            classes: classes
                .iter()
                .map(|(id, label, _)| ClassRule {
                    class_id: *id,
                    label: label.to_string(),
                })
                .collect(),
            min_widths: classes
                .iter()
                .map(|(_, label, width)| (label.to_string(), *width))
                .collect(),
        }
    }
}

impl FilterConfig {
    /// Reject duplicate class ids and unusable thresholds
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashMap::new();
        for rule in &self.classes {
            if let Some(prev) = seen.insert(rule.class_id, &rule.label) {
                return Err(Error::Config(format!(
                    "class id {} mapped twice ({} and {})",
                    rule.class_id, prev, rule.label
                )));
            }
        }

        for (label, width) in &self.min_widths {
            if !width.is_finite() || *width < 0.0 {
                return Err(Error::Config(format!(
                    "min width for {} must be a non-negative number, got {}",
                    label, width
                )));
            }
        }

        Ok(())
    }
}

/// DetectionFilter instance
#[derive(Debug, Clone)]
pub struct DetectionFilter {
    labels: HashMap<i32, String>,
    min_widths: HashMap<String, f32>,
}

impl DetectionFilter {
    /// Create new DetectionFilter
    pub fn new(config: FilterConfig) -> Self {
        Self {
            labels: config
                .classes
                .into_iter()
                .map(|rule| (rule.class_id, rule.label))
                .collect(),
            min_widths: config.min_widths,
        }
    }

    /// Minimum width for a label (0 when unspecified)
    pub fn min_width(&self, label: &str) -> f32 {
        self.min_widths.get(label).copied().unwrap_or(0.0)
    }

    /// Keep allow-listed boxes strictly wider than their label's minimum
    pub fn filter(&self, boxes: &[RawBox]) -> Vec<Detection> {
        let detections: Vec<Detection> = boxes
            .iter()
            .filter_map(|raw| {
                let label = self.labels.get(&raw.class_id)?;
                let width = raw.width();

                // Strict comparison also rejects zero and negative widths
                if !(width > self.min_width(label)) {
                    return None;
                }

                Some(Detection {
                    class_label: label.clone(),
                    confidence: raw.confidence,
                    x_center: raw.x_center(),
                    width,
                })
            })
            .collect();

        tracing::trace!(
            raw = boxes.len(),
            kept = detections.len(),
            "Detections filtered"
        );

        detections
    }
}

impl Default for DetectionFilter {
    fn default() -> Self {
        Self::new(FilterConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boxed(class_id: i32, x1: f32, x2: f32) -> RawBox {
        RawBox::new(class_id, 0.9, [x1, 10.0, x2, 80.0])
    }

    #[test]
    fn test_unlisted_class_dropped_regardless_of_width() {
        let filter = DetectionFilter::default();
        let out = filter.filter(&[boxed(99, 0.0, 250.0)]);
        assert!(out.is_empty());
    }

    #[test]
    fn test_min_width_is_strict() {
        let filter = DetectionFilter::default();

        let at_threshold = filter.filter(&[boxed(0, 10.0, 30.0)]);
        assert!(at_threshold.is_empty());

        let above = filter.filter(&[RawBox::new(0, 0.5, [0.0, 0.0, 20.01, 5.0])]);
        assert_eq!(above.len(), 1);
        assert_eq!(above[0].class_label, "person");
    }

    #[test]
    fn test_center_width_and_confidence() {
        let filter = DetectionFilter::default();
        let out = filter.filter(&[RawBox::new(2, 0.42, [40.0, 0.0, 140.0, 90.0])]);

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].class_label, "car");
        assert_eq!(out[0].x_center, 90.0);
        assert_eq!(out[0].width, 100.0);
        assert_eq!(out[0].confidence, 0.42);
    }

    #[test]
    fn test_empty_input() {
        let filter = DetectionFilter::default();
        assert!(filter.filter(&[]).is_empty());
    }

    #[test]
    fn test_non_positive_width_never_kept() {
        let filter = DetectionFilter::new(FilterConfig {
            classes: vec![ClassRule {
                class_id: 4,
                label: "airplane".to_string(),
            }],
            min_widths: HashMap::new(),
        });

        assert_eq!(filter.min_width("airplane"), 0.0);
        assert!(filter.filter(&[boxed(4, 50.0, 50.0)]).is_empty());
        assert!(filter.filter(&[boxed(4, 60.0, 50.0)]).is_empty());
        assert_eq!(filter.filter(&[boxed(4, 50.0, 51.0)]).len(), 1);
    }

    #[test]
    fn test_config_validation() {
        assert!(FilterConfig::default().validate().is_ok());

        let mut dup = FilterConfig::default();
        dup.classes.push(ClassRule {
            class_id: 0,
            label: "pedestrian".to_string(),
        });
        assert!(dup.validate().is_err());

        let mut negative = FilterConfig::default();
        negative.min_widths.insert("car".to_string(), -1.0);
        assert!(negative.validate().is_err());
    }
}
