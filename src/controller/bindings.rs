//! # Input Bindings
//!
//! Per-profile dispatch tables mapping named joystick channels to state
//! machine actions.
//!
//! Buttons dispatch on edges: press actions fire on a 0→1 transition,
//! release actions on 1→0. Axis actions fire on every event for their axis.

use std::collections::HashMap;

use crate::joystick::profile::{Profile, ProfileKind};

/// Action taken when a bound button is pressed (or, for release bindings,
/// let go).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonAction {
    /// Cycle the driving authority mode.
    ToggleMode,
    /// Toggle manual record capture.
    ToggleRecording,
    /// Toggle throttle-driven auto recording.
    ToggleAutoRecord,
    /// Request deletion of the last captured records.
    EraseLastRecords,
    /// Immediately stop the vehicle.
    EmergencyStop,
    /// Raise the throttle ceiling by 0.01.
    IncreaseMaxThrottle,
    /// Lower the throttle ceiling by 0.01.
    DecreaseMaxThrottle,
    /// Toggle pinning the throttle to the ceiling.
    ToggleConstantThrottle,
    /// Step camera tilt up by 0.1.
    TiltUp,
    /// Step camera tilt down by 0.1.
    TiltDown,
    /// Hold a fixed left steering override.
    ChaosLeft,
    /// Hold a fixed right steering override.
    ChaosRight,
    /// Release the steering override.
    ChaosOff,
}

/// Action taken on every event for a bound axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisAction {
    Steering,
    Throttle,
    PanLeft,
    PanRight,
    /// D-pad vertical: ±1 steps the throttle multiplier by 0.05.
    ThrottleScale,
    /// D-pad horizontal: ±1 steps the steering multiplier by 0.05.
    SteeringScale,
    /// Analog trigger pressure bound to raising the throttle ceiling.
    IncreaseMaxThrottle,
    /// Analog trigger pressure bound to lowering the throttle ceiling.
    DecreaseMaxThrottle,
}

/// Dispatch tables for one controller model.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    pub button_down: HashMap<String, ButtonAction>,
    pub button_up: HashMap<String, ButtonAction>,
    pub axis: HashMap<String, AxisAction>,
}

impl Bindings {
    /// Build the dispatch tables for a profile.
    ///
    /// `steering_axis`/`throttle_axis` override the profile's defaults when
    /// the pad reports the sticks on unexpected channels.
    #[must_use]
    pub fn for_profile(
        profile: &Profile,
        steering_axis: Option<&str>,
        throttle_axis: Option<&str>,
    ) -> Self {
        let mut b = match profile.kind {
            ProfileKind::Generic => Self::generic(),
            ProfileKind::ElecomJcU3912t => Self::elecom_jc_u3912t(),
            ProfileKind::LogicoolF710 => Self::logicool_f710(),
        };

        let steering = steering_axis.unwrap_or(profile.steering_axis);
        let throttle = throttle_axis.unwrap_or(profile.throttle_axis);
        b.axis.retain(|_, a| {
            !matches!(*a, AxisAction::Steering | AxisAction::Throttle)
        });
        b.axis.insert(steering.to_string(), AxisAction::Steering);
        b.axis.insert(throttle.to_string(), AxisAction::Throttle);

        if let Some(pan_l) = profile.pan_left_axis {
            b.axis.insert(pan_l.to_string(), AxisAction::PanLeft);
        }
        if let Some(pan_r) = profile.pan_right_axis {
            b.axis.insert(pan_r.to_string(), AxisAction::PanRight);
        }
        b
    }

    fn generic() -> Self {
        let button_down = [
            ("select", ButtonAction::ToggleMode),
            ("b", ButtonAction::ToggleAutoRecord),
            ("y", ButtonAction::IncreaseMaxThrottle),
            ("a", ButtonAction::DecreaseMaxThrottle),
            ("start", ButtonAction::ToggleConstantThrottle),
            ("tl", ButtonAction::TiltUp),
            ("tr", ButtonAction::TiltDown),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        let axis = [
            ("hat0y", AxisAction::ThrottleScale),
            ("hat0x", AxisAction::SteeringScale),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        Self {
            button_down,
            button_up: HashMap::new(),
            axis,
        }
    }

    fn elecom_jc_u3912t() -> Self {
        let button_down = [
            ("11", ButtonAction::ToggleMode),
            ("4", ButtonAction::ToggleRecording),
            ("2", ButtonAction::EraseLastRecords),
            ("3", ButtonAction::EmergencyStop),
            ("7", ButtonAction::IncreaseMaxThrottle),
            ("8", ButtonAction::DecreaseMaxThrottle),
            ("12", ButtonAction::ToggleConstantThrottle),
            ("6", ButtonAction::ChaosRight),
            ("5", ButtonAction::ChaosLeft),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        let button_up = [
            ("6", ButtonAction::ChaosOff),
            ("5", ButtonAction::ChaosOff),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        Self {
            button_down,
            button_up,
            axis: HashMap::new(),
        }
    }

    fn logicool_f710() -> Self {
        let button_down = [
            ("BACK", ButtonAction::ToggleMode),
            ("B", ButtonAction::ToggleRecording),
            ("Y", ButtonAction::EraseLastRecords),
            ("A", ButtonAction::EmergencyStop),
            ("START", ButtonAction::ToggleConstantThrottle),
            ("RB", ButtonAction::ChaosRight),
            ("LB", ButtonAction::ChaosLeft),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        let button_up = [
            ("RB", ButtonAction::ChaosOff),
            ("LB", ButtonAction::ChaosOff),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        let axis = [
            ("LT_pressure", AxisAction::IncreaseMaxThrottle),
            ("RT_pressure", AxisAction::DecreaseMaxThrottle),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        Self {
            button_down,
            button_up,
            axis,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::joystick::profile::Profile;

    #[test]
    fn test_generic_bindings() {
        let profile = Profile::new(ProfileKind::Generic);
        let b = Bindings::for_profile(&profile, None, None);
        assert_eq!(b.button_down["select"], ButtonAction::ToggleMode);
        assert_eq!(b.button_down["b"], ButtonAction::ToggleAutoRecord);
        assert_eq!(b.axis["x"], AxisAction::Steering);
        assert_eq!(b.axis["ry"], AxisAction::Throttle);
        assert_eq!(b.axis["z"], AxisAction::PanLeft);
        assert_eq!(b.axis["rz"], AxisAction::PanRight);
        assert_eq!(b.axis["hat0y"], AxisAction::ThrottleScale);
        assert!(b.button_up.is_empty());
    }

    #[test]
    fn test_elecom_bindings() {
        let profile = Profile::new(ProfileKind::ElecomJcU3912t);
        let b = Bindings::for_profile(&profile, None, None);
        assert_eq!(b.button_down["3"], ButtonAction::EmergencyStop);
        assert_eq!(b.button_down["11"], ButtonAction::ToggleMode);
        assert_eq!(b.button_up["5"], ButtonAction::ChaosOff);
        assert_eq!(b.axis["left_stick_horz"], AxisAction::Steering);
        assert_eq!(b.axis["right_stick_vert"], AxisAction::Throttle);
        assert!(!b.axis.contains_key("dpad_vert"));
    }

    #[test]
    fn test_f710_trigger_axes() {
        let profile = Profile::new(ProfileKind::LogicoolF710);
        let b = Bindings::for_profile(&profile, None, None);
        assert_eq!(b.axis["LT_pressure"], AxisAction::IncreaseMaxThrottle);
        assert_eq!(b.axis["RT_pressure"], AxisAction::DecreaseMaxThrottle);
        assert_eq!(b.button_down["BACK"], ButtonAction::ToggleMode);
        assert_eq!(b.button_up["RB"], ButtonAction::ChaosOff);
    }

    #[test]
    fn test_axis_overrides_replace_defaults() {
        let profile = Profile::new(ProfileKind::Generic);
        let b = Bindings::for_profile(&profile, Some("rx"), Some("y"));
        assert_eq!(b.axis["rx"], AxisAction::Steering);
        assert_eq!(b.axis["y"], AxisAction::Throttle);
        assert!(!b.axis.contains_key("x"));
        assert!(!b.axis.contains_key("ry"));
    }
}
