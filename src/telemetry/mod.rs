//! # Telemetry Module
//!
//! MQTT relay between the controller process and the autonomous-driving
//! process.
//!
//! This module handles:
//! - Publishing driving state as JSON, rate-gated and delta-filtered
//! - Publishing camera frames as raw fixed-shape byte blobs
//! - Receiving pilot commands and retaining the latest

pub mod frame;
pub mod pilot;
pub mod publisher;

pub use frame::CameraFrame;
pub use pilot::{PilotCommand, PilotSubscriber};
pub use publisher::{TelemetryPublisher, TelemetrySample};
