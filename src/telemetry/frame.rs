//! # Camera Frame Codec
//!
//! Fixed-shape camera frames moved over the image topic as raw bytes.
//! The shape is part of the wire contract: both ends assume 120×160 RGB
//! with one byte per channel, so a frame is always exactly 57 600 bytes.

use crate::error::{RcBridgeError, Result};

/// Frame height in pixels.
pub const FRAME_HEIGHT: usize = 120;

/// Frame width in pixels.
pub const FRAME_WIDTH: usize = 160;

/// Channels per pixel (RGB).
pub const FRAME_CHANNELS: usize = 3;

/// Total byte length of one encoded frame.
pub const FRAME_LEN: usize = FRAME_HEIGHT * FRAME_WIDTH * FRAME_CHANNELS;

/// One camera frame in row-major RGB order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraFrame {
    data: Vec<u8>,
}

impl CameraFrame {
    /// Black frame.
    #[must_use]
    pub fn blank() -> Self {
        Self {
            data: vec![0; FRAME_LEN],
        }
    }

    /// Wrap raw pixel data.
    ///
    /// # Errors
    ///
    /// `Telemetry` if the byte count does not match the fixed shape.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        if data.len() != FRAME_LEN {
            return Err(RcBridgeError::Telemetry(format!(
                "camera frame must be {} bytes ({}x{}x{}), got {}",
                FRAME_LEN,
                FRAME_HEIGHT,
                FRAME_WIDTH,
                FRAME_CHANNELS,
                data.len()
            )));
        }
        Ok(Self { data })
    }

    /// The raw wire bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consume the frame, yielding the wire bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// One pixel as `(r, g, b)`.
    ///
    /// # Panics
    ///
    /// If `row`/`col` are outside the fixed shape (test/debug helper).
    #[must_use]
    pub fn pixel(&self, row: usize, col: usize) -> (u8, u8, u8) {
        let i = (row * FRAME_WIDTH + col) * FRAME_CHANNELS;
        (self.data[i], self.data[i + 1], self.data[i + 2])
    }
}
