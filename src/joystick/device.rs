//! # Joystick Device Handle
//!
//! Owns the open joydev character device descriptor and performs the
//! one-time capability query that produces the index→name maps used by the
//! decoder and the controller state machine.
//!
//! ## Capability Query
//!
//! The query layer is a bit-exact contract with the kernel joystick
//! subsystem; the op-codes are reproduced precisely:
//!
//! | Query | Op-code | Buffer |
//! |-------|---------|--------|
//! | device name | `0x8000_6a13 + 0x10000 * len` | `len` bytes |
//! | axis count | `0x8001_6a11` | 1 byte |
//! | button count | `0x8001_6a12` | 1 byte |
//! | axis map | `0x8040_6a32` | 0x40 bytes |
//! | button map | `0x8040_6a34` | 200 × u16 |
//!
//! The device is opened non-blocking so the poll loop can observe shutdown
//! between events instead of hanging on a read forever.

use std::fs::OpenOptions;
use std::io::Read;
use std::os::fd::AsRawFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

use tracing::{debug, info};

use crate::error::{RcBridgeError, Result};
use crate::joystick::event::{RawEvent, EVENT_SIZE};
use crate::joystick::profile::{Profile, TableKey};

/// `JSIOCGAXES` — get the number of axes.
const JSIOCGAXES: libc::c_ulong = 0x8001_6a11;

/// `JSIOCGBUTTONS` — get the number of buttons.
const JSIOCGBUTTONS: libc::c_ulong = 0x8001_6a12;

/// `JSIOCGAXMAP` — get the axis index → hardware code table.
const JSIOCGAXMAP: libc::c_ulong = 0x8040_6a32;

/// `JSIOCGBTNMAP` — get the button index → hardware code table.
const JSIOCGBTNMAP: libc::c_ulong = 0x8040_6a34;

/// Fixed size of the axis map query buffer.
const AXIS_MAP_LEN: usize = 0x40;

/// Fixed entry count of the button map query buffer.
const BUTTON_MAP_LEN: usize = 200;

/// Device name query buffer size.
const NAME_LEN: usize = 64;

/// `JSIOCGNAME(len)` — get the device name into a `len`-byte buffer.
const fn jsiocgname(len: usize) -> libc::c_ulong {
    0x8000_6a13 + (0x10000 * len) as libc::c_ulong
}

/// Source of raw joystick event records.
///
/// Seam between the controller state machine and the physical device so
/// tests can substitute a simulated device.
pub trait EventSource: Send {
    /// Read the next raw event record.
    ///
    /// Returns `Ok(None)` when no event is available yet (the caller should
    /// sleep briefly and retry), `Err(StreamClosed)`/`Err(ShortRead)` when
    /// the device disappeared.
    fn next_event(&mut self) -> Result<Option<RawEvent>>;

    /// Axis index → name map, in device-reported order.
    fn axis_map(&self) -> &[String];

    /// Button index → name map, in device-reported order.
    fn button_map(&self) -> &[String];
}

/// Handle to an open joydev character device.
///
/// Created and initialized once at controller start; the descriptor is
/// closed on drop. If the device file is absent, construction fails with
/// [`RcBridgeError::DeviceNotFound`] and the owner retries after a backoff.
pub struct JsDevice {
    file: std::fs::File,
    path: String,
    device_name: String,
    num_axes: u8,
    num_buttons: u8,
    axis_map: Vec<String>,
    button_map: Vec<String>,
}

impl std::fmt::Debug for JsDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsDevice")
            .field("path", &self.path)
            .field("device_name", &self.device_name)
            .field("num_axes", &self.num_axes)
            .field("num_buttons", &self.num_buttons)
            .finish_non_exhaustive()
    }
}

impl JsDevice {
    /// Open the character device and run the capability query.
    ///
    /// # Errors
    ///
    /// - `DeviceNotFound`: the path does not exist (retry with backoff)
    /// - `Io`: permission or ioctl failures
    pub fn open(path: &str, profile: &Profile) -> Result<Self> {
        if !Path::new(path).exists() {
            return Err(RcBridgeError::DeviceNotFound(path.to_string()));
        }

        let file = OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(path)?;
        let fd = file.as_raw_fd();

        let device_name = query_name(fd)?;
        let num_axes = query_u8(fd, JSIOCGAXES)?;
        let num_buttons = query_u8(fd, JSIOCGBUTTONS)?;

        let (axis_map, button_map) = match profile.table_key {
            TableKey::HardwareCode => {
                let axis_codes = query_axis_codes(fd)?;
                let button_codes = query_button_codes(fd)?;
                resolve_code_maps(profile, &axis_codes, &button_codes, num_axes, num_buttons)
            }
            TableKey::Index => resolve_index_maps(profile, num_axes, num_buttons),
        };

        info!(
            "Opened joystick '{}' at {}: {} axes, {} buttons",
            device_name, path, num_axes, num_buttons
        );
        debug!("Axis map: {}", axis_map.join(", "));
        debug!("Button map: {}", button_map.join(", "));

        Ok(Self {
            file,
            path: path.to_string(),
            device_name,
            num_axes,
            num_buttons,
            axis_map,
            button_map,
        })
    }

    /// Device path this handle was opened from.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Human-readable device name reported by the kernel.
    #[must_use]
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Number of axes reported by the capability query.
    #[must_use]
    pub fn num_axes(&self) -> u8 {
        self.num_axes
    }

    /// Number of buttons reported by the capability query.
    #[must_use]
    pub fn num_buttons(&self) -> u8 {
        self.num_buttons
    }
}

impl EventSource for JsDevice {
    fn next_event(&mut self) -> Result<Option<RawEvent>> {
        let mut buf = [0u8; EVENT_SIZE];
        match self.file.read(&mut buf) {
            Ok(EVENT_SIZE) => Ok(Some(RawEvent::parse(&buf))),
            Ok(0) => Err(RcBridgeError::StreamClosed),
            Ok(n) => Err(RcBridgeError::ShortRead(n)),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(None),
            // ENODEV after unplug surfaces as a closed stream so the owner
            // re-enters the acquisition retry loop.
            Err(e) if e.raw_os_error() == Some(libc::ENODEV) => Err(RcBridgeError::StreamClosed),
            Err(e) => Err(e.into()),
        }
    }

    fn axis_map(&self) -> &[String] {
        &self.axis_map
    }

    fn button_map(&self) -> &[String] {
        &self.button_map
    }
}

/// Fetch the device name string.
fn query_name(fd: libc::c_int) -> Result<String> {
    let mut buf = [0u8; NAME_LEN];
    let rc = unsafe { libc::ioctl(fd, jsiocgname(buf.len()), buf.as_mut_ptr()) };
    if rc < 0 {
        return Err(std::io::Error::last_os_error().into());
    }
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    Ok(String::from_utf8_lossy(&buf[..end]).into_owned())
}

/// Fetch a single-byte count (axis or button count).
fn query_u8(fd: libc::c_int, request: libc::c_ulong) -> Result<u8> {
    let mut count: u8 = 0;
    let rc = unsafe { libc::ioctl(fd, request, &mut count as *mut u8) };
    if rc < 0 {
        return Err(std::io::Error::last_os_error().into());
    }
    Ok(count)
}

/// Fetch the axis index → hardware code table.
fn query_axis_codes(fd: libc::c_int) -> Result<[u8; AXIS_MAP_LEN]> {
    let mut buf = [0u8; AXIS_MAP_LEN];
    let rc = unsafe { libc::ioctl(fd, JSIOCGAXMAP, buf.as_mut_ptr()) };
    if rc < 0 {
        return Err(std::io::Error::last_os_error().into());
    }
    Ok(buf)
}

/// Fetch the button index → hardware code table.
fn query_button_codes(fd: libc::c_int) -> Result<[u16; BUTTON_MAP_LEN]> {
    let mut buf = [0u16; BUTTON_MAP_LEN];
    let rc = unsafe { libc::ioctl(fd, JSIOCGBTNMAP, buf.as_mut_ptr()) };
    if rc < 0 {
        return Err(std::io::Error::last_os_error().into());
    }
    Ok(buf)
}

/// Resolve hardware-code tables into index-ordered name maps.
///
/// Unrecognized codes keep their synthesized `unknown(..)` names; dispatch
/// keys depend on those exact strings.
fn resolve_code_maps(
    profile: &Profile,
    axis_codes: &[u8],
    button_codes: &[u16],
    num_axes: u8,
    num_buttons: u8,
) -> (Vec<String>, Vec<String>) {
    let axes = axis_codes
        .iter()
        .take(num_axes as usize)
        .map(|&code| profile.axis_name(code as u16))
        .collect();
    let buttons = button_codes
        .iter()
        .take(num_buttons as usize)
        .map(|&code| profile.button_name(code))
        .collect();
    (axes, buttons)
}

/// Build name maps for index-keyed profiles directly from channel indices.
fn resolve_index_maps(profile: &Profile, num_axes: u8, num_buttons: u8) -> (Vec<String>, Vec<String>) {
    let axes = (0..num_axes as u16).map(|i| profile.axis_name(i)).collect();
    let buttons = (0..num_buttons as u16)
        .map(|i| profile.button_name(i))
        .collect();
    (axes, buttons)
}
