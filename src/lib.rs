//! # RC Bridge Library
//!
//! Drive an RC car with a gamepad over the Linux joydev interface.
//!
//! This library provides the core functionality for reading joystick input,
//! folding it into vehicle driving state, and relaying that state — plus
//! camera frames — between the human-operated controller process and an
//! autonomous-driving process over MQTT.

pub mod config;
pub mod error;
pub mod joystick;
pub mod controller;
pub mod telemetry;
