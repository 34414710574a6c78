//! # Error Types
//!
//! Custom error types for RC Bridge using `thiserror`.

use thiserror::Error;

/// Main error type for RC Bridge
#[derive(Debug, Error)]
pub enum RcBridgeError {
    /// Joystick device path does not exist at open time.
    ///
    /// Recoverable: the controller ownership layer retries with backoff.
    #[error("joystick device not found: {0}")]
    DeviceNotFound(String),

    /// Fewer than a full 8-byte event record was available.
    ///
    /// The device disappeared mid-session (unplugged); recoverable by
    /// tearing down the handle and re-entering the acquisition loop.
    #[error("short read from joystick device: got {0} of 8 bytes")]
    ShortRead(usize),

    /// The joystick event stream ended (device closed or unplugged).
    #[error("joystick event stream closed")]
    StreamClosed,

    /// Controller-level errors (capability query, dispatch)
    #[error("controller error: {0}")]
    Controller(String),

    /// Telemetry channel errors (MQTT publish/subscribe)
    #[error("telemetry error: {0}")]
    Telemetry(String),

    /// API misuse, e.g. reading driving state before the poll loop started.
    ///
    /// Fatal programming error, fails fast with a descriptive message.
    #[error("misuse: {0}")]
    Misuse(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for RC Bridge
pub type Result<T> = std::result::Result<T, RcBridgeError>;
