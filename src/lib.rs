//! ParkSense Server Library
//!
//! Sensor fusion and live broadcast for a parking-assist rig
//! (three ultrasonic sensors + a bumper camera).
//!
//! ## Architecture
//!
//! 1. DetectionFilter - Allow-listed, wide-enough detector boxes
//! 2. ZoneAssigner - Widest detection per Left / Center / Right zone
//! 3. SensorMailbox - Single-slot latest / instant ultrasonic reading
//! 4. BroadcastHub - Fan-out to live subscribers with keep-alives
//! 5. FrameProcessor - Filter + zone assignment for one frame
//! 6. DetectorClient - Object detector adapter
//! 7. ReadingStore - MySQL persistence (fire-and-forget)
//! 8. WebAPI - REST, SSE and WebSocket endpoints

pub mod broadcast_hub;
pub mod detection_filter;
pub mod detector_client;
pub mod error;
pub mod frame_processor;
pub mod models;
pub mod reading_store;
pub mod sensor_mailbox;
pub mod state;
pub mod web_api;
pub mod zone_assigner;

pub use error::{Error, Result};
pub use state::AppState;
