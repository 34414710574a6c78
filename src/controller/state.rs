//! # Driving State
//!
//! The externally observable result of the controller state machine, plus
//! the raw named input state it is derived from.

use std::collections::HashMap;
use std::fmt;

/// Driving authority mode.
///
/// Cycles `user → local_angle → local → user` on the mode-toggle button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DriveMode {
    /// Human-controlled steering and throttle.
    #[default]
    User,
    /// Autonomous steering, human throttle.
    LocalAngle,
    /// Fully autonomous.
    Local,
}

impl DriveMode {
    /// Advance to the next mode in the cycle.
    #[must_use]
    pub fn cycle(self) -> Self {
        match self {
            DriveMode::User => DriveMode::LocalAngle,
            DriveMode::LocalAngle => DriveMode::Local,
            DriveMode::Local => DriveMode::User,
        }
    }
}

impl fmt::Display for DriveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DriveMode::User => "user",
            DriveMode::LocalAngle => "local_angle",
            DriveMode::Local => "local",
        };
        write!(f, "{}", name)
    }
}

/// The driving state derived from joystick input.
///
/// Mutated only by the controller poll loop; read by external callers
/// through an atomically published snapshot, never in a half-updated state.
#[derive(Debug, Clone, PartialEq)]
pub struct DriveState {
    /// Steering angle in [-1, 1].
    pub angle: f32,
    /// Throttle in [-1, 1].
    pub throttle: f32,
    /// Driving authority mode.
    pub mode: DriveMode,
    /// Whether telemetry records are being captured.
    pub recording: bool,
    /// Throttle ceiling in [0, 1].
    pub max_throttle: f32,
    /// Steering multiplier in [0, 1].
    pub steering_scale: f32,
    /// Throttle multiplier in [-1, 0] (sticks report pull-down as positive).
    pub throttle_scale: f32,
    /// Camera pan derived from the left/right pan axes.
    pub pan: f32,
    /// Camera tilt in [-1, 1], stepped by the tilt buttons.
    pub tilt: f32,
    /// Throttle pinned to `max_throttle` while enabled.
    pub constant_throttle: bool,
    /// Latched by the emergency-stop button.
    pub emergency_stop: bool,
    /// Latched request to erase the last captured records.
    pub erase_requested: bool,
}

impl Default for DriveState {
    fn default() -> Self {
        Self {
            angle: 0.0,
            throttle: 0.0,
            mode: DriveMode::User,
            recording: false,
            max_throttle: 1.0,
            steering_scale: 1.0,
            throttle_scale: -1.0,
            pan: 0.0,
            tilt: 0.0,
            constant_throttle: false,
            emergency_stop: false,
            erase_requested: false,
        }
    }
}

/// Authoritative current physical state of the device: one named mapping
/// per channel class, updated in place as events arrive.
///
/// Values persist until overwritten; a released button reports 0, not
/// absence. Every name present was previously seen in an event.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    pub axes: HashMap<String, f32>,
    pub buttons: HashMap<String, i32>,
}
