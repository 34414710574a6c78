//! # Device Profiles
//!
//! Per-controller-model code/name tables that parameterize the device handle
//! and the controller state machine.
//!
//! Three profiles are supported:
//!
//! | Profile | Tables keyed by | Type byte match | Hardware |
//! |---------|-----------------|-----------------|----------|
//! | `generic` | hardware code (`linux/input.h`) | bitmask | Logicool F710 via the kernel code map, PS3-likes |
//! | `elecom-jc-u3912t` | device-reported index | exact | ELECOM JC-U3912T |
//! | `logicool-f710` | device-reported index | exact | Logicool F710 |
//!
//! The two type-byte interpretations reflect different underlying driver
//! behaviors and are kept as an explicit configuration choice, never unified.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// How the event type byte is matched against the button/axis classes.
///
/// The generic profile tests bits (`typev & 0x01`, `typev & 0x02`); the
/// vendor profiles require exact equality (`typev == 1`, `typev == 2`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeMatch {
    /// `typev & 0x01` selects buttons, `typev & 0x02` selects axes.
    Bitmask,
    /// `typev == 1` selects buttons, `typev == 2` selects axes.
    Exact,
}

impl TypeMatch {
    /// Whether the (init-bit-stripped) type byte classifies as a button event.
    #[must_use]
    pub fn is_button(self, typev: u8) -> bool {
        match self {
            TypeMatch::Bitmask => typev & 0x01 != 0,
            TypeMatch::Exact => typev == 0x01,
        }
    }

    /// Whether the (init-bit-stripped) type byte classifies as an axis event.
    #[must_use]
    pub fn is_axis(self, typev: u8) -> bool {
        match self {
            TypeMatch::Bitmask => typev & 0x02 != 0,
            TypeMatch::Exact => typev == 0x02,
        }
    }
}

/// How the profile's name tables are keyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKey {
    /// Tables are keyed by the hardware code reported by the capability
    /// query (`JSIOCGAXMAP`/`JSIOCGBTNMAP`).
    HardwareCode,
    /// Tables are keyed directly by the device-reported channel index.
    Index,
}

/// Profile selector, parsed from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileKind {
    Generic,
    ElecomJcU3912t,
    LogicoolF710,
}

impl FromStr for ProfileKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "generic" => Ok(ProfileKind::Generic),
            "elecom-jc-u3912t" => Ok(ProfileKind::ElecomJcU3912t),
            "logicool-f710" => Ok(ProfileKind::LogicoolF710),
            other => Err(format!("unknown joystick profile: {}", other)),
        }
    }
}

impl fmt::Display for ProfileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProfileKind::Generic => "generic",
            ProfileKind::ElecomJcU3912t => "elecom-jc-u3912t",
            ProfileKind::LogicoolF710 => "logicool-f710",
        };
        write!(f, "{}", name)
    }
}

/// Immutable code/name tables for one physical controller model.
///
/// Loaded once at controller start; codes are vendor/kernel-assigned
/// constants. Names used as dispatch keys are unique within one profile.
#[derive(Debug, Clone)]
pub struct Profile {
    pub kind: ProfileKind,
    pub axis_names: HashMap<u16, &'static str>,
    pub button_names: HashMap<u16, &'static str>,
    pub table_key: TableKey,
    pub type_match: TypeMatch,
    /// Axis driving the steering angle.
    pub steering_axis: &'static str,
    /// Axis driving the throttle.
    pub throttle_axis: &'static str,
    /// Left/right camera-pan axes, where the hardware has them.
    pub pan_left_axis: Option<&'static str>,
    pub pan_right_axis: Option<&'static str>,
}

impl Profile {
    /// Build the profile tables for the given kind.
    #[must_use]
    pub fn new(kind: ProfileKind) -> Self {
        match kind {
            ProfileKind::Generic => Self::generic(),
            ProfileKind::ElecomJcU3912t => Self::elecom_jc_u3912t(),
            ProfileKind::LogicoolF710 => Self::logicool_f710(),
        }
    }

    /// Resolve an axis code (or index) to its name.
    ///
    /// Unrecognized codes synthesize `unknown(0xHH)`. Downstream dispatch
    /// keys depend on this exact string format.
    #[must_use]
    pub fn axis_name(&self, code: u16) -> String {
        self.axis_names
            .get(&code)
            .map(|s| (*s).to_string())
            .unwrap_or_else(|| format!("unknown(0x{:02x})", code))
    }

    /// Resolve a button code (or index) to its name.
    ///
    /// Unrecognized codes synthesize `unknown(0xHHH)` (button codes are
    /// three hex digits wide in the kernel tables).
    #[must_use]
    pub fn button_name(&self, code: u16) -> String {
        self.button_names
            .get(&code)
            .map(|s| (*s).to_string())
            .unwrap_or_else(|| format!("unknown(0x{:03x})", code))
    }

    /// Generic library-pad profile.
    ///
    /// Tables borrowed from `linux/input.h`; resolved through the capability
    /// query's hardware codes. Bit-mask type interpretation.
    fn generic() -> Self {
        let axis_names: HashMap<u16, &'static str> = [
            (0x00, "x"),
            (0x01, "y"),
            (0x02, "z"),
            (0x03, "rx"),
            (0x04, "ry"),
            (0x05, "rz"),
            (0x06, "trottle"),
            (0x07, "rudder"),
            (0x08, "wheel"),
            (0x09, "gas"),
            (0x0a, "brake"),
            (0x10, "hat0x"),
            (0x11, "hat0y"),
            (0x12, "hat1x"),
            (0x13, "hat1y"),
            (0x14, "hat2x"),
            (0x15, "hat2y"),
            (0x16, "hat3x"),
            (0x17, "hat3y"),
            (0x18, "pressure"),
            (0x19, "distance"),
            (0x1a, "tilt_x"),
            (0x1b, "tilt_y"),
            (0x1c, "tool_width"),
            (0x20, "volume"),
            (0x28, "misc"),
        ]
        .into_iter()
        .collect();

        let button_names: HashMap<u16, &'static str> = [
            (0x120, "trigger"),
            (0x121, "thumb"),
            (0x122, "thumb2"),
            (0x123, "top"),
            (0x124, "top2"),
            (0x125, "pinkie"),
            (0x126, "base"),
            (0x127, "base2"),
            (0x128, "base3"),
            (0x129, "base4"),
            (0x12a, "base5"),
            (0x12b, "base6"),
            // PS3 DualShock
            (0x12c, "triangle"),
            (0x12d, "circle"),
            (0x12e, "cross"),
            (0x12f, "square"),
            (0x130, "a"),
            (0x131, "b"),
            (0x132, "c"),
            (0x133, "x"),
            (0x134, "y"),
            (0x135, "z"),
            (0x136, "tl"),
            (0x137, "tr"),
            (0x138, "tl2"),
            (0x139, "tr2"),
            (0x13a, "select"),
            (0x13b, "start"),
            (0x13c, "mode"),
            (0x13d, "thumbl"),
            (0x13e, "thumbr"),
            (0x220, "dpad_up"),
            (0x221, "dpad_down"),
            (0x222, "dpad_left"),
            (0x223, "dpad_right"),
            // XBox-360-compatible pads report the dpad on these codes
            (0x2c0, "dpad_left"),
            (0x2c1, "dpad_right"),
            (0x2c2, "dpad_up"),
            (0x2c3, "dpad_down"),
        ]
        .into_iter()
        .collect();

        Self {
            kind: ProfileKind::Generic,
            axis_names,
            button_names,
            table_key: TableKey::HardwareCode,
            type_match: TypeMatch::Bitmask,
            steering_axis: "x",
            throttle_axis: "ry",
            pan_left_axis: Some("z"),
            pan_right_axis: Some("rz"),
        }
    }

    /// ELECOM JC-U3912T: 6 axes, buttons labeled by the digits printed on
    /// the pad. Index-keyed tables, exact type-byte equality.
    fn elecom_jc_u3912t() -> Self {
        let axis_names: HashMap<u16, &'static str> = [
            (0, "left_stick_horz"),
            (1, "left_stick_vert"),
            (2, "right_stick_vert"),
            (3, "right_stick_horz"),
            (4, "dpad_horz"),
            (5, "dpad_vert"),
        ]
        .into_iter()
        .collect();

        let button_names: HashMap<u16, &'static str> = [
            (0, "1"),   // square
            (1, "2"),   // triangle
            (2, "3"),   // cross
            (3, "4"),   // circle
            (4, "5"),   // L1
            (5, "6"),   // R1
            (6, "7"),   // L2
            (7, "8"),   // R2
            (10, "11"), // select
            (11, "12"), // start
        ]
        .into_iter()
        .collect();

        Self {
            kind: ProfileKind::ElecomJcU3912t,
            axis_names,
            button_names,
            table_key: TableKey::Index,
            type_match: TypeMatch::Exact,
            steering_axis: "left_stick_horz",
            throttle_axis: "right_stick_vert",
            pan_left_axis: None,
            pan_right_axis: None,
        }
    }

    /// Logicool F710: 8 axes including analog trigger pressure, XBox-style
    /// button labels. Index-keyed tables, exact type-byte equality.
    fn logicool_f710() -> Self {
        let axis_names: HashMap<u16, &'static str> = [
            (0, "left_stick_horz"),
            (1, "left_stick_vert"),
            (2, "LT_pressure"),
            (3, "right_stick_horz"),
            (4, "right_stick_vert"),
            (5, "RT_pressure"),
            (6, "dpad_horz"),
            (7, "dpad_vert"),
        ]
        .into_iter()
        .collect();

        let button_names: HashMap<u16, &'static str> = [
            (0, "A"),     // cross
            (1, "B"),     // circle
            (2, "X"),     // square
            (3, "Y"),     // triangle
            (4, "LB"),    // L1
            (5, "RB"),    // R1
            (6, "BACK"),  // select
            (7, "START"), // start
        ]
        .into_iter()
        .collect();

        Self {
            kind: ProfileKind::LogicoolF710,
            axis_names,
            button_names,
            table_key: TableKey::Index,
            type_match: TypeMatch::Exact,
            steering_axis: "left_stick_horz",
            throttle_axis: "right_stick_vert",
            pan_left_axis: None,
            pan_right_axis: None,
        }
    }
}
