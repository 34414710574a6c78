//! # Controller Module
//!
//! Turns the decoded joystick event stream into vehicle driving state.
//!
//! This module handles:
//! - The driving state model (angle, throttle, mode, recording, tunables)
//! - Per-profile button/axis dispatch tables
//! - The state machine and the poll thread that owns the device

pub mod bindings;
pub mod machine;
pub mod state;

pub use machine::{Controller, ControllerSettings, StateMachine};
pub use state::{DriveMode, DriveState};
