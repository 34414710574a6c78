//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::controller::ControllerSettings;
use crate::error::Result;
use crate::joystick::profile::ProfileKind;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub joystick: JoystickConfig,
    pub broker: BrokerConfig,
    pub topics: TopicsConfig,
    pub vehicle: VehicleConfig,
}

/// Joystick device and controller tuning
#[derive(Debug, Deserialize, Clone)]
pub struct JoystickConfig {
    #[serde(default = "default_device")]
    pub device: String,

    #[serde(default = "default_profile")]
    pub profile: String,

    #[serde(default)]
    pub poll_delay_ms: u64,

    #[serde(default = "default_reconnect_interval_s")]
    pub reconnect_interval_s: u64,

    #[serde(default = "default_max_throttle")]
    pub max_throttle: f32,

    #[serde(default = "default_steering_scale")]
    pub steering_scale: f32,

    #[serde(default = "default_throttle_scale")]
    pub throttle_scale: f32,

    #[serde(default = "default_auto_record_on_throttle")]
    pub auto_record_on_throttle: bool,

    /// Override the profile's steering axis name.
    #[serde(default)]
    pub steering_axis: Option<String>,

    /// Override the profile's throttle axis name.
    #[serde(default)]
    pub throttle_axis: Option<String>,
}

/// MQTT broker connection
#[derive(Debug, Deserialize, Clone)]
pub struct BrokerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_client_id")]
    pub client_id: String,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    #[serde(default = "default_keep_alive_s")]
    pub keep_alive_s: u64,
}

/// Topic names
#[derive(Debug, Deserialize, Clone)]
pub struct TopicsConfig {
    #[serde(default = "default_telemetry_topic")]
    pub telemetry: String,

    #[serde(default = "default_pilot_topic")]
    pub pilot: String,

    #[serde(default = "default_image_topic")]
    pub image: String,
}

/// Vehicle loop tuning
#[derive(Debug, Deserialize, Clone)]
pub struct VehicleConfig {
    #[serde(default = "default_loop_hz")]
    pub loop_hz: u32,

    /// Publish every Nth loop iteration.
    #[serde(default = "default_publish_interval")]
    pub publish_interval: u32,
}

// Default value functions
fn default_device() -> String { "/dev/input/js0".to_string() }
fn default_profile() -> String { "generic".to_string() }
fn default_reconnect_interval_s() -> u64 { 5 }
fn default_max_throttle() -> f32 { 1.0 }
fn default_steering_scale() -> f32 { 1.0 }
fn default_throttle_scale() -> f32 { -1.0 }
fn default_auto_record_on_throttle() -> bool { true }

fn default_host() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16 { 1883 }
fn default_client_id() -> String { "rc-bridge".to_string() }
fn default_keep_alive_s() -> u64 { 5 }

fn default_telemetry_topic() -> String { "rc/telemetry".to_string() }
fn default_pilot_topic() -> String { "rc/pilot".to_string() }
fn default_image_topic() -> String { "rc/image".to_string() }

fn default_loop_hz() -> u32 { 20 }
fn default_publish_interval() -> u32 { 1 }

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use rc_bridge::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    fn validate(&self) -> Result<()> {
        if self.joystick.device.is_empty() {
            return Err(crate::error::RcBridgeError::Config(
                toml::de::Error::custom("joystick device cannot be empty"),
            ));
        }

        if self.joystick.profile.parse::<ProfileKind>().is_err() {
            return Err(crate::error::RcBridgeError::Config(toml::de::Error::custom(
                format!(
                    "unknown joystick profile '{}' (expected generic, elecom-jc-u3912t or logicool-f710)",
                    self.joystick.profile
                ),
            )));
        }

        if self.joystick.reconnect_interval_s == 0 || self.joystick.reconnect_interval_s > 300 {
            return Err(crate::error::RcBridgeError::Config(
                toml::de::Error::custom("reconnect_interval_s must be between 1 and 300"),
            ));
        }

        if self.joystick.max_throttle < 0.0 || self.joystick.max_throttle > 1.0 {
            return Err(crate::error::RcBridgeError::Config(
                toml::de::Error::custom("max_throttle must be between 0.0 and 1.0"),
            ));
        }

        if self.joystick.steering_scale < 0.0 || self.joystick.steering_scale > 1.0 {
            return Err(crate::error::RcBridgeError::Config(
                toml::de::Error::custom("steering_scale must be between 0.0 and 1.0"),
            ));
        }

        if self.joystick.throttle_scale < -1.0 || self.joystick.throttle_scale > 0.0 {
            return Err(crate::error::RcBridgeError::Config(
                toml::de::Error::custom("throttle_scale must be between -1.0 and 0.0"),
            ));
        }

        if self.broker.host.is_empty() {
            return Err(crate::error::RcBridgeError::Config(
                toml::de::Error::custom("broker host cannot be empty"),
            ));
        }

        if self.broker.client_id.is_empty() {
            return Err(crate::error::RcBridgeError::Config(
                toml::de::Error::custom("broker client_id cannot be empty"),
            ));
        }

        if self.broker.keep_alive_s == 0 || self.broker.keep_alive_s > 300 {
            return Err(crate::error::RcBridgeError::Config(
                toml::de::Error::custom("keep_alive_s must be between 1 and 300"),
            ));
        }

        for (name, topic) in [
            ("telemetry", &self.topics.telemetry),
            ("pilot", &self.topics.pilot),
            ("image", &self.topics.image),
        ] {
            if topic.is_empty() || topic.contains(['#', '+']) {
                return Err(crate::error::RcBridgeError::Config(toml::de::Error::custom(
                    format!("{} topic must be a non-empty literal topic name", name),
                )));
            }
        }

        if self.vehicle.loop_hz == 0 || self.vehicle.loop_hz > 1000 {
            return Err(crate::error::RcBridgeError::Config(
                toml::de::Error::custom("loop_hz must be between 1 and 1000"),
            ));
        }

        if self.vehicle.publish_interval == 0 {
            return Err(crate::error::RcBridgeError::Config(
                toml::de::Error::custom("publish_interval must be greater than 0"),
            ));
        }

        Ok(())
    }
}

impl JoystickConfig {
    /// The parsed profile selector.
    ///
    /// Validation already rejected unknown names, so this cannot fail after
    /// [`Config::load`].
    #[must_use]
    pub fn profile_kind(&self) -> ProfileKind {
        self.profile.parse().unwrap_or(ProfileKind::Generic)
    }

    /// Controller poll-loop settings derived from this section.
    #[must_use]
    pub fn controller_settings(&self) -> ControllerSettings {
        ControllerSettings {
            poll_delay: Duration::from_millis(self.poll_delay_ms),
            reconnect_interval: Duration::from_secs(self.reconnect_interval_s),
            max_throttle: self.max_throttle,
            steering_scale: self.steering_scale,
            throttle_scale: self.throttle_scale,
            auto_record_on_throttle: self.auto_record_on_throttle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_valid_config() -> Config {
        Config {
            joystick: JoystickConfig {
                device: default_device(),
                profile: default_profile(),
                poll_delay_ms: 0,
                reconnect_interval_s: default_reconnect_interval_s(),
                max_throttle: default_max_throttle(),
                steering_scale: default_steering_scale(),
                throttle_scale: default_throttle_scale(),
                auto_record_on_throttle: default_auto_record_on_throttle(),
                steering_axis: None,
                throttle_axis: None,
            },
            broker: BrokerConfig {
                host: default_host(),
                port: default_port(),
                client_id: default_client_id(),
                username: None,
                password: None,
                keep_alive_s: default_keep_alive_s(),
            },
            topics: TopicsConfig {
                telemetry: default_telemetry_topic(),
                pilot: default_pilot_topic(),
                image: default_image_topic(),
            },
            vehicle: VehicleConfig {
                loop_hz: default_loop_hz(),
                publish_interval: default_publish_interval(),
            },
        }
    }

    #[test]
    fn test_default_config() {
        assert!(create_valid_config().validate().is_ok());
    }

    #[test]
    fn test_load_config_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let toml_content = r#"
[joystick]
device = "/dev/input/js1"
profile = "elecom-jc-u3912t"

[broker]
host = "10.0.0.2"

[topics]

[vehicle]
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.joystick.device, "/dev/input/js1");
        assert_eq!(
            config.joystick.profile_kind(),
            crate::joystick::profile::ProfileKind::ElecomJcU3912t
        );
        assert_eq!(config.broker.host, "10.0.0.2");
        assert_eq!(config.broker.port, 1883);
        assert_eq!(config.topics.telemetry, "rc/telemetry");
        assert_eq!(config.vehicle.loop_hz, 20);
    }

    #[test]
    fn test_unknown_profile_rejected() {
        let mut config = create_valid_config();
        config.joystick.profile = "ps5".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_device_rejected() {
        let mut config = create_valid_config();
        config.joystick.device = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_max_throttle_out_of_range() {
        let mut config = create_valid_config();
        config.joystick.max_throttle = 1.5;
        assert!(config.validate().is_err());
        config.joystick.max_throttle = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_throttle_scale_out_of_range() {
        let mut config = create_valid_config();
        config.joystick.throttle_scale = 0.5;
        assert!(config.validate().is_err());
        config.joystick.throttle_scale = -1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_steering_scale_out_of_range() {
        let mut config = create_valid_config();
        config.joystick.steering_scale = 1.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_reconnect_interval_bounds() {
        let mut config = create_valid_config();
        config.joystick.reconnect_interval_s = 0;
        assert!(config.validate().is_err());
        config.joystick.reconnect_interval_s = 301;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_wildcard_topic_rejected() {
        let mut config = create_valid_config();
        config.topics.pilot = "rc/#".to_string();
        assert!(config.validate().is_err());
        config.topics.pilot = "rc/+/pilot".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_topic_rejected() {
        let mut config = create_valid_config();
        config.topics.image = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_loop_hz_bounds() {
        let mut config = create_valid_config();
        config.vehicle.loop_hz = 0;
        assert!(config.validate().is_err());
        config.vehicle.loop_hz = 1001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_publish_interval_zero() {
        let mut config = create_valid_config();
        config.vehicle.publish_interval = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_controller_settings_conversion() {
        let mut config = create_valid_config();
        config.joystick.poll_delay_ms = 10;
        config.joystick.max_throttle = 0.5;
        let settings = config.joystick.controller_settings();
        assert_eq!(settings.poll_delay, Duration::from_millis(10));
        assert_eq!(settings.reconnect_interval, Duration::from_secs(5));
        assert_eq!(settings.max_throttle, 0.5);
        assert!(settings.auto_record_on_throttle);
    }

    #[test]
    fn test_default_functions() {
        assert_eq!(default_device(), "/dev/input/js0");
        assert_eq!(default_profile(), "generic");
        assert_eq!(default_reconnect_interval_s(), 5);
        assert_eq!(default_max_throttle(), 1.0);
        assert_eq!(default_steering_scale(), 1.0);
        assert_eq!(default_throttle_scale(), -1.0);
        assert!(default_auto_record_on_throttle());
        assert_eq!(default_host(), "127.0.0.1");
        assert_eq!(default_port(), 1883);
        assert_eq!(default_client_id(), "rc-bridge");
        assert_eq!(default_keep_alive_s(), 5);
        assert_eq!(default_loop_hz(), 20);
        assert_eq!(default_publish_interval(), 1);
    }
}
