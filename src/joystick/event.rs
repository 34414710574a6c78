//! # Joystick Event Decoder
//!
//! Decodes the fixed-size binary records emitted by the Linux joydev
//! character device into classified, named events.
//!
//! ## Record Layout
//!
//! Each record is 8 bytes, native byte order:
//!
//! | Field | Size | Meaning |
//! |-------|------|---------|
//! | time  | 4 bytes | event timestamp, ignored by consumers |
//! | value | 2 bytes | signed 16-bit axis position or button state |
//! | type  | 1 byte  | event class, bit `0x80` marks a synthetic init event |
//! | number| 1 byte  | device-reported channel index |
//!
//! The decoder is stateless: it translates one record into one event using
//! the index→name maps built by the device handle.

use super::profile::TypeMatch;

/// Size of one joystick event record in bytes.
pub const EVENT_SIZE: usize = 8;

/// Type-byte bit marking a synthetic "initial state" event.
///
/// The driver emits one of these per channel at subscription time; they must
/// be discarded or they would generate spurious button-change notifications
/// on startup.
pub const JS_EVENT_INIT: u8 = 0x80;

/// Divisor converting a raw signed 16-bit axis value to a float.
///
/// `32767 → 1.0`; `-32768 → ≈ -1.00003` (the division is applied as-is,
/// with no extra clamping).
pub const AXIS_NORM: f32 = 32767.0;

/// One raw record as read from the device, fields split out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawEvent {
    /// Event timestamp tag; carried but ignored by all consumers.
    pub time: u32,
    /// Raw signed 16-bit value.
    pub value: i16,
    /// Event type byte.
    pub typev: u8,
    /// Channel index.
    pub number: u8,
}

impl RawEvent {
    /// Split one 8-byte record into its fields (native byte order).
    #[must_use]
    pub fn parse(buf: &[u8; EVENT_SIZE]) -> Self {
        Self {
            time: u32::from_ne_bytes([buf[0], buf[1], buf[2], buf[3]]),
            value: i16::from_ne_bytes([buf[4], buf[5]]),
            typev: buf[6],
            number: buf[7],
        }
    }

    /// Pack the fields back into an 8-byte record (native byte order).
    ///
    /// Used by simulated devices in tests.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; EVENT_SIZE] {
        let mut buf = [0u8; EVENT_SIZE];
        buf[0..4].copy_from_slice(&self.time.to_ne_bytes());
        buf[4..6].copy_from_slice(&self.value.to_ne_bytes());
        buf[6] = self.typev;
        buf[7] = self.number;
        buf
    }
}

/// A classified joystick event.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedEvent {
    /// Init marker or unmapped channel; the caller must do nothing.
    Ignored,
    /// A named button changed state. The raw value (conventionally 0 or 1)
    /// is passed through unmodified.
    Button { name: String, value: i32 },
    /// A named axis moved; value normalized to roughly [-1, 1].
    Axis { name: String, value: f32 },
}

/// Classify one raw record against the device's index→name maps.
///
/// Records with the init bit set decode to [`DecodedEvent::Ignored`]
/// regardless of value or index. Button classification is tried before axis
/// classification, so a combined type byte under bitmask matching resolves
/// as a button.
///
/// # Examples
///
/// ```
/// use rc_bridge::joystick::event::{decode, DecodedEvent, RawEvent};
/// use rc_bridge::joystick::profile::TypeMatch;
///
/// let axes = vec!["x".to_string()];
/// let buttons = vec!["trigger".to_string()];
/// let raw = RawEvent { time: 0, value: 32767, typev: 2, number: 0 };
/// let event = decode(&raw, TypeMatch::Bitmask, &axes, &buttons);
/// assert_eq!(event, DecodedEvent::Axis { name: "x".to_string(), value: 1.0 });
/// ```
#[must_use]
pub fn decode(
    raw: &RawEvent,
    type_match: TypeMatch,
    axis_map: &[String],
    button_map: &[String],
) -> DecodedEvent {
    if raw.typev & JS_EVENT_INIT != 0 {
        return DecodedEvent::Ignored;
    }

    if type_match.is_button(raw.typev) {
        return match button_map.get(raw.number as usize) {
            Some(name) => DecodedEvent::Button {
                name: name.clone(),
                value: raw.value as i32,
            },
            None => DecodedEvent::Ignored,
        };
    }

    if type_match.is_axis(raw.typev) {
        return match axis_map.get(raw.number as usize) {
            Some(name) => DecodedEvent::Axis {
                name: name.clone(),
                value: raw.value as f32 / AXIS_NORM,
            },
            None => DecodedEvent::Ignored,
        };
    }

    DecodedEvent::Ignored
}

#[cfg(test)]
mod tests {
    use super::*;

    fn maps() -> (Vec<String>, Vec<String>) {
        let axes = vec!["x".to_string(), "y".to_string(), "ry".to_string()];
        let buttons = vec!["select".to_string(), "start".to_string()];
        (axes, buttons)
    }

    // ==================== Record Parsing Tests ====================

    #[test]
    fn test_parse_round_trip() {
        let raw = RawEvent {
            time: 0xDEADBEEF,
            value: -12345,
            typev: 0x02,
            number: 7,
        };
        assert_eq!(RawEvent::parse(&raw.to_bytes()), raw);
    }

    #[test]
    fn test_parse_native_byte_order() {
        let raw = RawEvent {
            time: 1,
            value: 2,
            typev: 1,
            number: 0,
        };
        let buf = raw.to_bytes();
        assert_eq!(u32::from_ne_bytes([buf[0], buf[1], buf[2], buf[3]]), 1);
        assert_eq!(i16::from_ne_bytes([buf[4], buf[5]]), 2);
        assert_eq!(buf[6], 1);
        assert_eq!(buf[7], 0);
    }

    // ==================== Init Suppression Tests ====================

    #[test]
    fn test_init_events_ignored_regardless_of_payload() {
        let (axes, buttons) = maps();
        // Every combination of base type, value and index with the init bit
        // set must decode to a no-op.
        for base in [0x01u8, 0x02, 0x03, 0x00] {
            for value in [0i16, 1, -32768, 32767] {
                for number in [0u8, 1, 200] {
                    let raw = RawEvent {
                        time: 42,
                        value,
                        typev: base | JS_EVENT_INIT,
                        number,
                    };
                    for tm in [TypeMatch::Bitmask, TypeMatch::Exact] {
                        assert_eq!(decode(&raw, tm, &axes, &buttons), DecodedEvent::Ignored);
                    }
                }
            }
        }
    }

    // ==================== Axis Tests ====================

    #[test]
    fn test_axis_normalization() {
        let (axes, buttons) = maps();
        let raw = RawEvent {
            time: 0,
            value: 16383,
            typev: 0x02,
            number: 2,
        };
        let event = decode(&raw, TypeMatch::Bitmask, &axes, &buttons);
        match event {
            DecodedEvent::Axis { name, value } => {
                assert_eq!(name, "ry");
                assert!((value - 16383.0 / 32767.0).abs() < f32::EPSILON);
            }
            other => panic!("expected axis event, got {:?}", other),
        }
    }

    #[test]
    fn test_axis_boundary_values() {
        let (axes, buttons) = maps();

        let max = RawEvent {
            time: 0,
            value: 32767,
            typev: 0x02,
            number: 0,
        };
        match decode(&max, TypeMatch::Bitmask, &axes, &buttons) {
            DecodedEvent::Axis { value, .. } => assert_eq!(value, 1.0),
            other => panic!("expected axis event, got {:?}", other),
        }

        // -32768 / 32767.0 overshoots -1.0 slightly; no clamping is applied.
        let min = RawEvent {
            time: 0,
            value: -32768,
            typev: 0x02,
            number: 0,
        };
        match decode(&min, TypeMatch::Bitmask, &axes, &buttons) {
            DecodedEvent::Axis { value, .. } => {
                assert!(value < -1.0);
                assert!((value - (-32768.0 / 32767.0)).abs() < f32::EPSILON);
            }
            other => panic!("expected axis event, got {:?}", other),
        }
    }

    #[test]
    fn test_axis_zero() {
        let (axes, buttons) = maps();
        let raw = RawEvent {
            time: 0,
            value: 0,
            typev: 0x02,
            number: 1,
        };
        assert_eq!(
            decode(&raw, TypeMatch::Exact, &axes, &buttons),
            DecodedEvent::Axis {
                name: "y".to_string(),
                value: 0.0
            }
        );
    }

    // ==================== Button Tests ====================

    #[test]
    fn test_button_value_passthrough() {
        let (axes, buttons) = maps();
        // Raw values are passed through unmodified, even unconventional ones.
        for value in [0i16, 1, 2, -1] {
            let raw = RawEvent {
                time: 0,
                value,
                typev: 0x01,
                number: 1,
            };
            assert_eq!(
                decode(&raw, TypeMatch::Exact, &axes, &buttons),
                DecodedEvent::Button {
                    name: "start".to_string(),
                    value: value as i32
                }
            );
        }
    }

    // ==================== Unmapped Index Tests ====================

    #[test]
    fn test_unmapped_indices_are_noops() {
        let (axes, buttons) = maps();

        let axis = RawEvent {
            time: 0,
            value: 100,
            typev: 0x02,
            number: 9,
        };
        assert_eq!(
            decode(&axis, TypeMatch::Bitmask, &axes, &buttons),
            DecodedEvent::Ignored
        );

        let button = RawEvent {
            time: 0,
            value: 1,
            typev: 0x01,
            number: 200,
        };
        assert_eq!(
            decode(&button, TypeMatch::Bitmask, &axes, &buttons),
            DecodedEvent::Ignored
        );
    }

    // ==================== Type Interpretation Tests ====================

    #[test]
    fn test_exact_match_ignores_combined_type() {
        let (axes, buttons) = maps();
        let raw = RawEvent {
            time: 0,
            value: 1,
            typev: 0x03,
            number: 0,
        };
        // Under exact equality a combined type byte matches neither class;
        // under bitmask the button branch wins (checked first).
        assert_eq!(
            decode(&raw, TypeMatch::Exact, &axes, &buttons),
            DecodedEvent::Ignored
        );
        assert_eq!(
            decode(&raw, TypeMatch::Bitmask, &axes, &buttons),
            DecodedEvent::Button {
                name: "select".to_string(),
                value: 1
            }
        );
    }

    #[test]
    fn test_unclassified_type_ignored() {
        let (axes, buttons) = maps();
        let raw = RawEvent {
            time: 0,
            value: 1,
            typev: 0x04,
            number: 0,
        };
        for tm in [TypeMatch::Bitmask, TypeMatch::Exact] {
            assert_eq!(decode(&raw, tm, &axes, &buttons), DecodedEvent::Ignored);
        }
    }
}
