//! # Telemetry Publisher
//!
//! Publishes the driving state and camera frames over MQTT.
//!
//! Driving state goes out as a small JSON document; camera frames as raw
//! bytes on the image topic. Publishing is rate-gated: only every Nth call
//! is considered, and of those only states that moved more than the delta
//! threshold since the last transmission are sent. The pilot process on the
//! other end holds the last received values, so dropped repeats are free.

use std::time::Duration;

use chrono::Utc;
use rumqttc::{AsyncClient, EventLoop, MqttOptions, QoS};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{BrokerConfig, TopicsConfig};
use crate::controller::DriveState;
use crate::error::{RcBridgeError, Result};
use crate::telemetry::frame::CameraFrame;

/// Minimum throttle/angle movement that justifies a publish.
const DELTA_THRESHOLD: f32 = 0.005;

/// Wire form of one driving-state sample.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TelemetrySample {
    pub throttle: f32,
    pub angle: f32,
    pub user_mode: String,
    /// ISO-8601 timestamp, assigned at publish time.
    pub timestamp: String,
}

impl TelemetrySample {
    #[must_use]
    pub fn from_state(state: &DriveState) -> Self {
        Self {
            throttle: state.throttle,
            angle: state.angle,
            user_mode: state.mode.to_string(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// Decides which samples are worth transmitting.
///
/// Separated from the client so the gating rules are testable without a
/// broker.
#[derive(Debug)]
pub struct PublishGate {
    interval: u32,
    ticks: u32,
    last_throttle: Option<f32>,
    last_angle: Option<f32>,
}

impl PublishGate {
    /// Gate that considers every `interval`-th sample.
    #[must_use]
    pub fn new(interval: u32) -> Self {
        Self {
            interval: interval.max(1),
            ticks: 0,
            last_throttle: None,
            last_angle: None,
        }
    }

    /// Whether this sample should be published. Updates the gate's memory
    /// when it answers yes.
    pub fn admit(&mut self, throttle: f32, angle: f32) -> bool {
        self.ticks += 1;
        if self.ticks < self.interval {
            return false;
        }
        self.ticks = 0;

        let moved = match (self.last_throttle, self.last_angle) {
            (Some(t), Some(a)) => {
                (throttle - t).abs() >= DELTA_THRESHOLD || (angle - a).abs() >= DELTA_THRESHOLD
            }
            // Nothing sent yet: the first admitted sample always goes out.
            _ => true,
        };
        if moved {
            self.last_throttle = Some(throttle);
            self.last_angle = Some(angle);
        }
        moved
    }
}

/// Build client options from the broker section.
fn mqtt_options(broker: &BrokerConfig, client_id: &str) -> MqttOptions {
    let mut options = MqttOptions::new(client_id, &broker.host, broker.port);
    options.set_keep_alive(Duration::from_secs(broker.keep_alive_s));
    if let (Some(user), Some(pass)) = (&broker.username, &broker.password) {
        options.set_credentials(user.clone(), pass.clone());
    }
    options
}

/// Drive the connection; rumqttc reconnects on the next poll after an error.
fn spawn_event_loop(mut event_loop: EventLoop, label: &'static str) {
    tokio::spawn(async move {
        loop {
            match event_loop.poll().await {
                Ok(event) => debug!("{} mqtt event: {:?}", label, event),
                Err(e) => {
                    warn!("{} mqtt connection error: {}; retrying", label, e);
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    });
}

/// MQTT publisher for driving state and camera frames.
pub struct TelemetryPublisher {
    client: AsyncClient,
    topics: TopicsConfig,
    gate: PublishGate,
}

impl TelemetryPublisher {
    /// Connect to the broker and spawn the connection task.
    #[must_use]
    pub fn connect(broker: &BrokerConfig, topics: TopicsConfig, publish_interval: u32) -> Self {
        let options = mqtt_options(broker, &broker.client_id);
        let (client, event_loop) = AsyncClient::new(options, 32);
        spawn_event_loop(event_loop, "telemetry");
        Self {
            client,
            topics,
            gate: PublishGate::new(publish_interval),
        }
    }

    /// Offer one driving-state snapshot for publication.
    ///
    /// Returns the sample if it passed the gate and was handed to the
    /// client, `None` if it was filtered.
    ///
    /// # Errors
    ///
    /// `Telemetry` when the client rejects the publish (channel full or
    /// connection torn down).
    pub async fn publish_state(&mut self, state: &DriveState) -> Result<Option<TelemetrySample>> {
        if !self.gate.admit(state.throttle, state.angle) {
            return Ok(None);
        }

        let sample = TelemetrySample::from_state(state);
        let payload = serde_json::to_vec(&sample)
            .map_err(|e| RcBridgeError::Telemetry(format!("encode state: {}", e)))?;
        self.client
            .publish(&self.topics.telemetry, QoS::AtLeastOnce, false, payload)
            .await
            .map_err(|e| RcBridgeError::Telemetry(format!("publish state: {}", e)))?;
        debug!(
            "published throttle={:.3} angle={:.3} mode={}",
            sample.throttle, sample.angle, sample.user_mode
        );
        Ok(Some(sample))
    }

    /// Publish one camera frame as raw bytes on the image topic.
    ///
    /// Frames are not gated; the camera already paces them.
    ///
    /// # Errors
    ///
    /// `Telemetry` when the client rejects the publish.
    pub async fn publish_frame(&self, frame: &CameraFrame) -> Result<()> {
        self.client
            .publish(
                &self.topics.image,
                QoS::AtMostOnce,
                false,
                frame.as_bytes().to_vec(),
            )
            .await
            .map_err(|e| RcBridgeError::Telemetry(format!("publish frame: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::DriveMode;

    // ==================== Gate Tests ====================

    #[test]
    fn test_gate_first_sample_always_admitted() {
        let mut gate = PublishGate::new(1);
        assert!(gate.admit(0.0, 0.0));
    }

    #[test]
    fn test_gate_filters_small_deltas() {
        let mut gate = PublishGate::new(1);
        assert!(gate.admit(0.5, 0.0));
        // Moves under 0.005 on both channels are dropped.
        assert!(!gate.admit(0.503, 0.002));
        assert!(!gate.admit(0.5, 0.0));
        // A move at the threshold goes through.
        assert!(gate.admit(0.505, 0.0));
    }

    #[test]
    fn test_gate_either_channel_triggers() {
        let mut gate = PublishGate::new(1);
        assert!(gate.admit(0.0, 0.0));
        assert!(gate.admit(0.0, 0.5)); // angle alone
        assert!(gate.admit(0.5, 0.5)); // throttle alone
    }

    #[test]
    fn test_gate_delta_measured_from_last_sent() {
        let mut gate = PublishGate::new(1);
        assert!(gate.admit(0.0, 0.0));
        // Creep in sub-threshold steps: each is dropped, but the distance
        // from the last transmission accumulates until it passes.
        assert!(!gate.admit(0.002, 0.0));
        assert!(!gate.admit(0.004, 0.0));
        assert!(gate.admit(0.006, 0.0));
    }

    #[test]
    fn test_gate_interval_counter() {
        let mut gate = PublishGate::new(3);
        assert!(!gate.admit(0.1, 0.0));
        assert!(!gate.admit(0.2, 0.0));
        assert!(gate.admit(0.3, 0.0)); // third call considered
        assert!(!gate.admit(0.9, 0.0));
        assert!(!gate.admit(0.9, 0.0));
        assert!(gate.admit(0.9, 0.0));
    }

    #[test]
    fn test_gate_zero_interval_treated_as_one() {
        let mut gate = PublishGate::new(0);
        assert!(gate.admit(0.1, 0.0));
    }

    // ==================== Sample Tests ====================

    #[test]
    fn test_sample_from_state() {
        let state = DriveState {
            throttle: -0.5,
            angle: 0.25,
            mode: DriveMode::LocalAngle,
            ..DriveState::default()
        };
        let sample = TelemetrySample::from_state(&state);
        assert_eq!(sample.throttle, -0.5);
        assert_eq!(sample.angle, 0.25);
        assert_eq!(sample.user_mode, "local_angle");
        assert!(!sample.timestamp.is_empty());
    }

    #[test]
    fn test_sample_wire_format() {
        let sample = TelemetrySample {
            throttle: -0.5,
            angle: 0.25,
            user_mode: "user".to_string(),
            timestamp: "2024-01-01T00:00:00+00:00".to_string(),
        };
        let json: serde_json::Value =
            serde_json::from_slice(&serde_json::to_vec(&sample).unwrap()).unwrap();
        assert_eq!(json["throttle"], -0.5);
        assert_eq!(json["angle"], 0.25);
        assert_eq!(json["user_mode"], "user");
        assert_eq!(json["timestamp"], "2024-01-01T00:00:00+00:00");
    }

    // Integration test - needs a broker listening on localhost:1883
    #[tokio::test]
    #[ignore]
    async fn test_publish_against_live_broker() {
        let broker = BrokerConfig {
            host: "127.0.0.1".to_string(),
            port: 1883,
            client_id: "rc-bridge-test".to_string(),
            username: None,
            password: None,
            keep_alive_s: 5,
        };
        let topics = TopicsConfig {
            telemetry: "rc/test/telemetry".to_string(),
            pilot: "rc/test/pilot".to_string(),
            image: "rc/test/image".to_string(),
        };
        let mut publisher = TelemetryPublisher::connect(&broker, topics, 1);
        let state = DriveState {
            throttle: -0.3,
            ..DriveState::default()
        };
        let sent = publisher.publish_state(&state).await.unwrap();
        assert!(sent.is_some());
    }
}
