//! ReadingStore - MySQL Persistence for Readings and Zone Detections
//!
//! ## Responsibilities
//!
//! - Schema bootstrap
//! - Insert ultrasonic readings (one row per sensor)
//! - Insert per-zone detections of a frame
//!
//! `store_*` calls are fire-and-forget: they spawn the insert and only log
//! failures. Without a configured pool every call is skipped.

use crate::error::Result;
use crate::zone_assigner::ZoneSummary;
use chrono::Utc;
use sqlx::MySqlPool;

const CREATE_READINGS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS ultrasonic_readings (
    reading_id BIGINT UNSIGNED AUTO_INCREMENT PRIMARY KEY,
    sensor_id TINYINT UNSIGNED NOT NULL,
    distance_cm DOUBLE NOT NULL,
    recorded_at DATETIME(3) NOT NULL,
    INDEX idx_sensor_time (sensor_id, recorded_at)
)
"#;

const CREATE_DETECTIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS zone_detections (
    detection_id BIGINT UNSIGNED AUTO_INCREMENT PRIMARY KEY,
    frame_ref VARCHAR(128) NOT NULL,
    zone VARCHAR(16) NOT NULL,
    class_label VARCHAR(64) NOT NULL,
    confidence FLOAT NOT NULL,
    x_center FLOAT NOT NULL,
    width FLOAT NOT NULL,
    recorded_at DATETIME(3) NOT NULL,
    INDEX idx_frame (frame_ref)
)
"#;

/// ReadingStore instance
#[derive(Clone)]
pub struct ReadingStore {
    pool: Option<MySqlPool>,
}

impl ReadingStore {
    /// Store backed by a MySQL pool
    pub fn with_pool(pool: MySqlPool) -> Self {
        Self { pool: Some(pool) }
    }

    /// Store that skips every write
    pub fn disabled() -> Self {
        Self { pool: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.pool.is_some()
    }

    /// Create tables if missing
    pub async fn init_schema(&self) -> Result<()> {
        let Some(pool) = &self.pool else {
            return Ok(());
        };

        sqlx::query(CREATE_READINGS_TABLE).execute(pool).await?;
        sqlx::query(CREATE_DETECTIONS_TABLE).execute(pool).await?;
        tracing::info!("ReadingStore schema ready");
        Ok(())
    }

    /// Insert one sensor distance
    pub async fn insert_reading(&self, sensor_id: u8, distance_cm: f64) -> Result<()> {
        let Some(pool) = &self.pool else {
            return Ok(());
        };

        sqlx::query(
            "INSERT INTO ultrasonic_readings (sensor_id, distance_cm, recorded_at) VALUES (?, ?, ?)",
        )
        .bind(sensor_id)
        .bind(distance_cm)
        .bind(Utc::now().naive_utc())
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Insert the occupied zones of a frame; returns rows written
    pub async fn insert_detections(&self, frame_ref: &str, summary: &ZoneSummary) -> Result<u64> {
        let Some(pool) = &self.pool else {
            return Ok(0);
        };

        let recorded_at = Utc::now().naive_utc();
        let mut tx = pool.begin().await?;
        let mut rows = 0;

        for (zone, detection) in summary.occupied() {
            let result = sqlx::query(
                r#"INSERT INTO zone_detections
                   (frame_ref, zone, class_label, confidence, x_center, width, recorded_at)
                   VALUES (?, ?, ?, ?, ?, ?, ?)"#,
            )
            .bind(frame_ref)
            .bind(zone.as_str())
            .bind(&detection.class_label)
            .bind(detection.confidence)
            .bind(detection.x_center)
            .bind(detection.width)
            .bind(recorded_at)
            .execute(&mut *tx)
            .await?;
            rows += result.rows_affected();
        }

        tx.commit().await?;
        Ok(rows)
    }

    /// Persist a sensor distance in the background
    pub fn store_reading(&self, sensor_id: u8, distance_cm: f64) {
        if !self.is_enabled() {
            tracing::trace!(sensor_id, "ReadingStore disabled, reading not persisted");
            return;
        }

        let store = self.clone();
        tokio::spawn(async move {
            if let Err(e) = store.insert_reading(sensor_id, distance_cm).await {
                tracing::warn!(sensor_id, error = %e, "Failed to persist ultrasonic reading");
            }
        });
    }

    /// Persist a frame's zone summary in the background
    pub fn store_detections(&self, frame_ref: String, summary: ZoneSummary) {
        if !self.is_enabled() || summary.is_empty() {
            tracing::trace!(frame_ref = %frame_ref, "Zone summary not persisted");
            return;
        }

        let store = self.clone();
        tokio::spawn(async move {
            match store.insert_detections(&frame_ref, &summary).await {
                Ok(rows) => tracing::debug!(frame_ref = %frame_ref, rows, "Zone detections persisted"),
                Err(e) => {
                    tracing::warn!(frame_ref = %frame_ref, error = %e, "Failed to persist zone detections")
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection_filter::Detection;

    #[tokio::test]
    async fn test_disabled_store_skips_writes() {
        let store = ReadingStore::disabled();
        assert!(!store.is_enabled());
        assert!(store.init_schema().await.is_ok());
        assert!(store.insert_reading(1, 42.0).await.is_ok());

        let summary = ZoneSummary {
            left: Some(Detection {
                class_label: "car".to_string(),
                confidence: 0.9,
                x_center: 40.0,
                width: 70.0,
            }),
            ..Default::default()
        };
        assert_eq!(store.insert_detections("frame-1", &summary).await.unwrap(), 0);

        // Fire-and-forget variants return immediately
        store.store_reading(2, 10.0);
        store.store_detections("frame-2".to_string(), summary);
    }
}
