//! SensorMailbox - Single-Slot Ultrasonic Reading Cache
//!
//! ## Responsibilities
//!
//! - Hold the most recent three-sensor reading (last write wins)
//! - Non-destructive "latest" reads
//! - Destructive "instant" reads (take-and-clear)
//!
//! The mailbox does not publish by itself; the ingress route composes
//! `update` with `BroadcastHub::publish`.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Distances (cm) reported by the three ultrasonic sensors
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    #[serde(alias = "sensor_1")]
    pub left: f64,
    #[serde(alias = "sensor_2")]
    pub center: f64,
    #[serde(alias = "sensor_3")]
    pub right: f64,
}

impl SensorReading {
    pub fn new(left: f64, center: f64, right: f64) -> Self {
        Self {
            left,
            center,
            right,
        }
    }

    pub fn distance(&self, position: SensorPosition) -> f64 {
        match position {
            SensorPosition::Left => self.left,
            SensorPosition::Center => self.center,
            SensorPosition::Right => self.right,
        }
    }

    /// Distances must be finite and non-negative
    pub fn validate(&self) -> Result<()> {
        for position in SensorPosition::ALL {
            let value = self.distance(position);
            if !value.is_finite() || value < 0.0 {
                return Err(Error::Validation(format!(
                    "{} distance must be a non-negative number, got {}",
                    position.as_str(),
                    value
                )));
            }
        }
        Ok(())
    }
}

/// Mounting position of an ultrasonic sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorPosition {
    Left,
    Center,
    Right,
}

impl SensorPosition {
    pub const ALL: [SensorPosition; 3] = [
        SensorPosition::Left,
        SensorPosition::Center,
        SensorPosition::Right,
    ];

    /// Sensor id as wired on the rig (1 = left, 2 = center, 3 = right)
    pub fn from_sensor_id(sensor_id: u8) -> Option<Self> {
        match sensor_id {
            1 => Some(SensorPosition::Left),
            2 => Some(SensorPosition::Center),
            3 => Some(SensorPosition::Right),
            _ => None,
        }
    }

    pub fn sensor_id(&self) -> u8 {
        match self {
            SensorPosition::Left => 1,
            SensorPosition::Center => 2,
            SensorPosition::Right => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SensorPosition::Left => "left",
            SensorPosition::Center => "center",
            SensorPosition::Right => "right",
        }
    }
}

/// Coarse proximity band for a distance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProximityLevel {
    Danger,
    Warning,
    Clear,
}

/// Distance bands in cm
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProximityThresholds {
    /// Below this distance: danger
    pub danger_below: f64,
    /// Below this distance: warning
    pub warning_below: f64,
}

impl Default for ProximityThresholds {
    fn default() -> Self {
        Self {
            danger_below: 100.0,
            warning_below: 200.0,
        }
    }
}

impl ProximityThresholds {
    pub fn classify(&self, distance: f64) -> ProximityLevel {
        if distance < self.danger_below {
            ProximityLevel::Danger
        } else if distance < self.warning_below {
            ProximityLevel::Warning
        } else {
            ProximityLevel::Clear
        }
    }
}

/// SensorMailbox instance
pub struct SensorMailbox {
    current: RwLock<Option<SensorReading>>,
}

impl SensorMailbox {
    /// Create new, empty SensorMailbox
    pub fn new() -> Self {
        Self {
            current: RwLock::new(None),
        }
    }

    /// Overwrite the current reading
    pub async fn update(&self, reading: SensorReading) {
        let mut current = self.current.write().await;
        *current = Some(reading);
        tracing::debug!(
            left = reading.left,
            center = reading.center,
            right = reading.right,
            "Ultrasonic reading updated"
        );
    }

    /// Current reading without consuming it
    pub async fn peek_latest(&self) -> Option<SensorReading> {
        *self.current.read().await
    }

    /// One sensor's distance from the current reading, without consuming it
    pub async fn peek_sensor(&self, position: SensorPosition) -> Option<f64> {
        self.peek_latest()
            .await
            .map(|reading| reading.distance(position))
    }

    /// Return and clear the current reading
    pub async fn take_instant(&self) -> Result<SensorReading> {
        self.current
            .write()
            .await
            .take()
            .ok_or_else(|| Error::Empty("no ultrasonic reading pending".to_string()))
    }
}

impl Default for SensorMailbox {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_take_instant_consumes_once() {
        let mailbox = SensorMailbox::new();
        let r1 = SensorReading::new(120.0, 80.5, 300.0);

        mailbox.update(r1).await;
        assert_eq!(mailbox.take_instant().await.unwrap(), r1);
        assert!(matches!(mailbox.take_instant().await, Err(Error::Empty(_))));
    }

    #[tokio::test]
    async fn test_peek_is_idempotent() {
        let mailbox = SensorMailbox::new();
        assert_eq!(mailbox.peek_latest().await, None);

        let r1 = SensorReading::new(10.0, 20.0, 30.0);
        mailbox.update(r1).await;
        assert_eq!(mailbox.peek_latest().await, Some(r1));
        assert_eq!(mailbox.peek_latest().await, Some(r1));
        assert_eq!(mailbox.peek_sensor(SensorPosition::Right).await, Some(30.0));

        // Peeking leaves the value for an instant read
        assert_eq!(mailbox.take_instant().await.unwrap(), r1);
        assert_eq!(mailbox.peek_latest().await, None);
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let mailbox = SensorMailbox::new();
        mailbox.update(SensorReading::new(1.0, 1.0, 1.0)).await;
        mailbox.update(SensorReading::new(2.0, 2.0, 2.0)).await;
        assert_eq!(
            mailbox.take_instant().await.unwrap(),
            SensorReading::new(2.0, 2.0, 2.0)
        );
    }

    #[tokio::test]
    async fn test_racing_update_and_take_never_tear() {
        let mailbox = Arc::new(SensorMailbox::new());
        let writer = {
            let mailbox = mailbox.clone();
            tokio::spawn(async move {
                for i in 0..200 {
                    let v = i as f64;
                    mailbox.update(SensorReading::new(v, v, v)).await;
                    tokio::task::yield_now().await;
                }
            })
        };

        let mut taken = Vec::new();
        for _ in 0..200 {
            if let Ok(reading) = mailbox.take_instant().await {
                taken.push(reading);
            }
            tokio::task::yield_now().await;
        }
        writer.await.unwrap();

        for reading in taken {
            assert_eq!(reading.left, reading.center);
            assert_eq!(reading.center, reading.right);
        }
    }

    #[test]
    fn test_sensor_ids_and_aliases() {
        assert_eq!(SensorPosition::from_sensor_id(2), Some(SensorPosition::Center));
        assert_eq!(SensorPosition::from_sensor_id(4), None);
        assert_eq!(SensorPosition::Right.sensor_id(), 3);

        let reading: SensorReading =
            serde_json::from_str(r#"{"sensor_1": 1.5, "sensor_2": 2.5, "sensor_3": 3.5}"#).unwrap();
        assert_eq!(reading, SensorReading::new(1.5, 2.5, 3.5));
    }

    #[test]
    fn test_validation() {
        assert!(SensorReading::new(0.0, 12.0, 400.0).validate().is_ok());
        assert!(SensorReading::new(-1.0, 12.0, 400.0).validate().is_err());
        assert!(SensorReading::new(1.0, f64::NAN, 400.0).validate().is_err());
    }

    #[test]
    fn test_proximity_bands() {
        let thresholds = ProximityThresholds::default();
        assert_eq!(thresholds.classify(99.9), ProximityLevel::Danger);
        assert_eq!(thresholds.classify(100.0), ProximityLevel::Warning);
        assert_eq!(thresholds.classify(199.0), ProximityLevel::Warning);
        assert_eq!(thresholds.classify(200.0), ProximityLevel::Clear);
    }
}
