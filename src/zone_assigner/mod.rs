//! ZoneAssigner - Per-Zone Detection Summary
//!
//! ## Responsibilities
//!
//! - Split the horizontal field of view into Left / Center / Right
//! - Pick the widest (closest) detection in each zone
//!
//! A zone with no detection is reported as absent, never as a zero-valued
//! placeholder.

use crate::detection_filter::Detection;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Horizontal zone of the camera frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Zone {
    Left,
    Center,
    Right,
}

impl Zone {
    pub const ALL: [Zone; 3] = [Zone::Left, Zone::Center, Zone::Right];

    pub fn as_str(&self) -> &'static str {
        match self {
            Zone::Left => "left",
            Zone::Center => "center",
            Zone::Right => "right",
        }
    }
}

/// Zone breakpoints on the x axis (`left_end < center_end`)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoneBreakpoints {
    /// End of the left zone (exclusive)
    pub left_end: f32,
    /// End of the center zone (exclusive)
    pub center_end: f32,
}

impl Default for ZoneBreakpoints {
    fn default() -> Self {
        Self {
            left_end: 100.0,
            center_end: 200.0,
        }
    }
}

impl ZoneBreakpoints {
    pub fn new(left_end: f32, center_end: f32) -> Result<Self> {
        let breakpoints = Self {
            left_end,
            center_end,
        };
        breakpoints.validate()?;
        Ok(breakpoints)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.left_end.is_finite() || !self.center_end.is_finite() {
            return Err(Error::Config("zone breakpoints must be finite".to_string()));
        }
        if self.left_end >= self.center_end {
            return Err(Error::Config(format!(
                "zone breakpoints must be increasing, got {} >= {}",
                self.left_end, self.center_end
            )));
        }
        Ok(())
    }

    /// Parse "b1,b2"
    pub fn parse(raw: &str) -> Result<Self> {
        let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
        if parts.len() != 2 {
            return Err(Error::Config(format!(
                "expected two comma-separated breakpoints, got '{}'",
                raw
            )));
        }

        let parse_one = |s: &str| {
            s.parse::<f32>()
                .map_err(|e| Error::Config(format!("invalid breakpoint '{}': {}", s, e)))
        };

        Self::new(parse_one(parts[0])?, parse_one(parts[1])?)
    }

    /// Zone containing a horizontal center
    pub fn zone_of(&self, x_center: f32) -> Zone {
        if x_center < self.left_end {
            Zone::Left
        } else if x_center < self.center_end {
            Zone::Center
        } else {
            Zone::Right
        }
    }
}

/// Widest detection per zone for one frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ZoneSummary {
    pub left: Option<Detection>,
    pub center: Option<Detection>,
    pub right: Option<Detection>,
}

impl ZoneSummary {
    pub fn get(&self, zone: Zone) -> Option<&Detection> {
        match zone {
            Zone::Left => self.left.as_ref(),
            Zone::Center => self.center.as_ref(),
            Zone::Right => self.right.as_ref(),
        }
    }

    fn slot_mut(&mut self, zone: Zone) -> &mut Option<Detection> {
        match zone {
            Zone::Left => &mut self.left,
            Zone::Center => &mut self.center,
            Zone::Right => &mut self.right,
        }
    }

    /// Occupied zones in Left, Center, Right order
    pub fn occupied(&self) -> impl Iterator<Item = (Zone, &Detection)> {
        Zone::ALL
            .into_iter()
            .filter_map(move |zone| self.get(zone).map(|d| (zone, d)))
    }

    pub fn is_empty(&self) -> bool {
        self.occupied().next().is_none()
    }
}

/// ZoneAssigner instance
#[derive(Debug, Clone, Default)]
pub struct ZoneAssigner {
    breakpoints: ZoneBreakpoints,
}

impl ZoneAssigner {
    pub fn new(breakpoints: ZoneBreakpoints) -> Self {
        Self { breakpoints }
    }

    pub fn breakpoints(&self) -> ZoneBreakpoints {
        self.breakpoints
    }

    /// Build the zone summary for one frame
    pub fn assign(&self, detections: &[Detection]) -> ZoneSummary {
        let mut summary = ZoneSummary::default();

        for detection in detections {
            let slot = summary.slot_mut(self.breakpoints.zone_of(detection.x_center));
            // Replace only on strictly wider: ties keep the first seen
            let wider = slot
                .as_ref()
                .map_or(true, |current| detection.width > current.width);
            if wider {
                *slot = Some(detection.clone());
            }
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(label: &str, x_center: f32, width: f32) -> Detection {
        Detection {
            class_label: label.to_string(),
            confidence: 0.8,
            x_center,
            width,
        }
    }

    #[test]
    fn test_widest_per_zone() {
        let assigner = ZoneAssigner::default();
        let summary = assigner.assign(&[det("person", 20.0, 15.0), det("car", 60.0, 40.0)]);

        let left = summary.left.expect("left zone occupied");
        assert_eq!(left.width, 40.0);
        assert_eq!(left.class_label, "car");
        assert!(summary.center.is_none());
        assert!(summary.right.is_none());
    }

    #[test]
    fn test_center_gets_its_own_detection() {
        let assigner = ZoneAssigner::default();
        let summary = assigner.assign(&[
            det("car", 50.0, 70.0),
            det("bus", 150.0, 90.0),
            det("truck", 250.0, 65.0),
        ]);

        assert_eq!(summary.left.as_ref().map(|d| d.class_label.as_str()), Some("car"));
        assert_eq!(summary.center.as_ref().map(|d| d.class_label.as_str()), Some("bus"));
        assert_eq!(summary.right.as_ref().map(|d| d.class_label.as_str()), Some("truck"));
    }

    #[test]
    fn test_ties_keep_first_seen() {
        let assigner = ZoneAssigner::default();
        let summary = assigner.assign(&[det("person", 120.0, 30.0), det("bicycle", 180.0, 30.0)]);
        assert_eq!(summary.center.unwrap().class_label, "person");
    }

    #[test]
    fn test_breakpoint_edges() {
        let bp = ZoneBreakpoints::default();
        assert_eq!(bp.zone_of(0.0), Zone::Left);
        assert_eq!(bp.zone_of(99.99), Zone::Left);
        assert_eq!(bp.zone_of(100.0), Zone::Center);
        assert_eq!(bp.zone_of(199.99), Zone::Center);
        assert_eq!(bp.zone_of(200.0), Zone::Right);
        assert_eq!(bp.zone_of(640.0), Zone::Right);
        assert_eq!(bp.zone_of(-3.0), Zone::Left);
    }

    #[test]
    fn test_empty_frame() {
        let summary = ZoneAssigner::default().assign(&[]);
        assert!(summary.is_empty());
        assert_eq!(summary.occupied().count(), 0);
    }

    #[test]
    fn test_parse_breakpoints() {
        let bp = ZoneBreakpoints::parse("213, 426").unwrap();
        assert_eq!(bp.left_end, 213.0);
        assert_eq!(bp.center_end, 426.0);

        assert!(ZoneBreakpoints::parse("200,100").is_err());
        assert!(ZoneBreakpoints::parse("100").is_err());
        assert!(ZoneBreakpoints::parse("a,b").is_err());
    }
}
