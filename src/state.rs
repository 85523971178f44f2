//! Application state
//!
//! Holds all shared components and state

use crate::broadcast_hub::{BroadcastHub, DEFAULT_IDLE_TIMEOUT};
use crate::detector_client::DetectorClient;
use crate::error::{Error, Result};
use crate::frame_processor::{FrameProcessor, FusionConfig, ZoneReport};
use crate::reading_store::ReadingStore;
use crate::sensor_mailbox::{ProximityThresholds, SensorMailbox, SensorReading};
use crate::zone_assigner::ZoneBreakpoints;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Database URL (persistence disabled when unset)
    pub database_url: Option<String>,
    /// Object detector URL (camera frames yield no detections when unset)
    pub detector_url: Option<String>,
    /// Detector request timeout
    pub detector_timeout: Duration,
    /// Idle window before a stream subscriber gets a keep-alive
    pub stream_idle_timeout: Duration,
    /// Zone breakpoints (overridden by the fusion config file when set)
    pub zone_breakpoints: ZoneBreakpoints,
    /// Optional JSON file with class allow-list, min widths and breakpoints
    pub fusion_config_path: Option<PathBuf>,
    /// Maximum accepted camera frame size
    pub max_frame_bytes: usize,
    /// Proximity bands for per-sensor readouts
    pub proximity: ProximityThresholds,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            database_url: None,
            detector_url: None,
            detector_timeout: Duration::from_secs(10),
            stream_idle_timeout: DEFAULT_IDLE_TIMEOUT,
            zone_breakpoints: ZoneBreakpoints::default(),
            fusion_config_path: None,
            max_frame_bytes: 10 * 1024 * 1024,
            proximity: ProximityThresholds::default(),
        }
    }
}

fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("{}='{}': {}", key, raw, e))),
        Err(_) => Ok(default),
    }
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl AppConfig {
    /// Read configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let zone_breakpoints = match env_opt("ZONE_BREAKPOINTS") {
            Some(raw) => ZoneBreakpoints::parse(&raw)?,
            None => defaults.zone_breakpoints,
        };

        let stream_idle_secs: u64 = env_parse("STREAM_IDLE_SECS", 30)?;
        if stream_idle_secs == 0 {
            return Err(Error::Config("STREAM_IDLE_SECS must be positive".to_string()));
        }

        Ok(Self {
            host: env_opt("HOST").unwrap_or(defaults.host),
            port: env_parse("PORT", defaults.port)?,
            database_url: env_opt("DATABASE_URL"),
            detector_url: env_opt("DETECTOR_URL"),
            detector_timeout: Duration::from_secs(env_parse("DETECTOR_TIMEOUT_SECS", 10)?),
            stream_idle_timeout: Duration::from_secs(stream_idle_secs),
            zone_breakpoints,
            fusion_config_path: env_opt("FUSION_CONFIG_PATH").map(PathBuf::from),
            max_frame_bytes: env_parse("MAX_FRAME_BYTES", defaults.max_frame_bytes)?,
            proximity: defaults.proximity,
        })
    }

    /// Fusion settings: the config file if given, else defaults + env breakpoints
    pub fn fusion_config(&self) -> Result<FusionConfig> {
        match &self.fusion_config_path {
            Some(path) => FusionConfig::from_file(path),
            None => Ok(FusionConfig {
                breakpoints: self.zone_breakpoints,
                ..Default::default()
            }),
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Application config
    pub config: AppConfig,
    /// Latest ultrasonic reading
    pub mailbox: Arc<SensorMailbox>,
    /// Live ultrasonic readings
    pub sensor_hub: Arc<BroadcastHub<SensorReading>>,
    /// Live per-frame zone reports
    pub detection_hub: Arc<BroadcastHub<ZoneReport>>,
    /// Camera frame pipeline
    pub frame_processor: Arc<FrameProcessor>,
    /// Object detector (None when not configured)
    pub detector: Option<Arc<DetectorClient>>,
    /// Reading / detection persistence
    pub store: ReadingStore,
    /// Ingress request counter
    pub requests: Arc<AtomicU64>,
    /// Process start, for uptime
    pub started_at: Instant,
}

impl AppState {
    /// Build state from config; the store and detector are passed in by `main`
    pub fn new(
        config: AppConfig,
        frame_processor: FrameProcessor,
        detector: Option<DetectorClient>,
        store: ReadingStore,
    ) -> Self {
        let idle = config.stream_idle_timeout;
        Self {
            config,
            mailbox: Arc::new(SensorMailbox::new()),
            sensor_hub: Arc::new(BroadcastHub::new("ultrasonic", idle)),
            detection_hub: Arc::new(BroadcastHub::new("camera", idle)),
            frame_processor: Arc::new(frame_processor),
            detector: detector.map(Arc::new),
            store,
            requests: Arc::new(AtomicU64::new(0)),
            started_at: Instant::now(),
        }
    }

    /// Count an ingress request
    pub fn count_request(&self) -> u64 {
        self.requests.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.port, 8000);
        assert_eq!(config.stream_idle_timeout, Duration::from_secs(30));
        assert_eq!(config.zone_breakpoints, ZoneBreakpoints::default());
        assert!(config.database_url.is_none());
    }

    #[test]
    fn test_fusion_config_uses_breakpoints() {
        let config = AppConfig {
            zone_breakpoints: ZoneBreakpoints::new(50.0, 90.0).unwrap(),
            ..Default::default()
        };
        let fusion = config.fusion_config().unwrap();
        assert_eq!(fusion.breakpoints.left_end, 50.0);
        assert!(!fusion.filter.classes.is_empty());
    }

    #[test]
    fn test_request_counter() {
        let state = AppState::new(
            AppConfig::default(),
            FrameProcessor::default(),
            None,
            ReadingStore::disabled(),
        );
        assert_eq!(state.count_request(), 1);
        assert_eq!(state.count_request(), 2);
        assert_eq!(state.request_count(), 2);
    }
}
