//! # Joystick Module
//!
//! Linux joydev input handling.
//!
//! This module handles:
//! - Opening the joystick character device and querying its capabilities
//! - Decoding the raw 8-byte event records into named axis/button events
//! - Per-controller-model profiles (code/name tables and type-byte
//!   interpretation)

pub mod device;
pub mod event;
pub mod profile;
