//! # Pilot Subscriber
//!
//! Receives steering/throttle commands from the autonomous-driving process
//! and retains the most recent one for the vehicle loop.

use rumqttc::{AsyncClient, Event, Incoming, QoS};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::config::BrokerConfig;
use crate::error::{RcBridgeError, Result};

/// One command from the pilot process.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PilotCommand {
    pub throttle: f32,
    pub angle: f32,
    pub timestamp: String,
}

/// Parse one pilot payload.
///
/// # Errors
///
/// `Telemetry` on malformed JSON; the subscriber logs and skips these.
pub fn parse_command(payload: &[u8]) -> Result<PilotCommand> {
    serde_json::from_slice(payload)
        .map_err(|e| RcBridgeError::Telemetry(format!("decode pilot command: {}", e)))
}

/// Subscribes to the pilot topic and retains the latest command.
///
/// The connection task parses incoming publishes and publishes them through
/// a watch channel; [`latest`](PilotSubscriber::latest) never blocks.
pub struct PilotSubscriber {
    rx: watch::Receiver<Option<PilotCommand>>,
}

impl PilotSubscriber {
    /// Connect to the broker, subscribe, and spawn the connection task.
    ///
    /// # Errors
    ///
    /// `Telemetry` when the subscription request is rejected.
    pub async fn connect(broker: &BrokerConfig, pilot_topic: &str) -> Result<Self> {
        let client_id = format!("{}-pilot", broker.client_id);
        let mut options =
            rumqttc::MqttOptions::new(client_id, &broker.host, broker.port);
        options.set_keep_alive(std::time::Duration::from_secs(broker.keep_alive_s));
        if let (Some(user), Some(pass)) = (&broker.username, &broker.password) {
            options.set_credentials(user.clone(), pass.clone());
        }

        let (client, mut event_loop) = AsyncClient::new(options, 32);
        client
            .subscribe(pilot_topic, QoS::AtLeastOnce)
            .await
            .map_err(|e| RcBridgeError::Telemetry(format!("subscribe pilot: {}", e)))?;

        let (tx, rx) = watch::channel(None);
        let topic = pilot_topic.to_string();
        tokio::spawn(async move {
            loop {
                match event_loop.poll().await {
                    Ok(Event::Incoming(Incoming::Publish(publish))) => {
                        if publish.topic != topic {
                            continue;
                        }
                        match parse_command(&publish.payload) {
                            Ok(command) => {
                                debug!(
                                    "pilot command: throttle={:.3} angle={:.3}",
                                    command.throttle, command.angle
                                );
                                if tx.send(Some(command)).is_err() {
                                    return; // subscriber dropped
                                }
                            }
                            Err(e) => warn!("{}", e),
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!("pilot mqtt connection error: {}; retrying", e);
                        tokio::time::sleep(std::time::Duration::from_secs(1)).await;
                    }
                }
            }
        });

        Ok(Self { rx })
    }

    /// The most recent command, or `None` before the first arrives.
    #[must_use]
    pub fn latest(&self) -> Option<PilotCommand> {
        self.rx.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command() {
        let payload =
            br#"{"throttle": -0.4, "angle": 0.1, "timestamp": "2024-01-01T00:00:00+00:00"}"#;
        let command = parse_command(payload).unwrap();
        assert_eq!(command.throttle, -0.4);
        assert_eq!(command.angle, 0.1);
        assert_eq!(command.timestamp, "2024-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_parse_rejects_malformed_payload() {
        assert!(matches!(
            parse_command(b"not json"),
            Err(RcBridgeError::Telemetry(_))
        ));
        assert!(parse_command(br#"{"throttle": 0.1}"#).is_err());
        assert!(parse_command(b"").is_err());
    }

    #[test]
    fn test_command_round_trip() {
        let command = PilotCommand {
            throttle: 0.2,
            angle: -0.7,
            timestamp: "2024-01-01T00:00:00+00:00".to_string(),
        };
        let bytes = serde_json::to_vec(&command).unwrap();
        assert_eq!(parse_command(&bytes).unwrap(), command);
    }
}
