//! # RC Bridge
//!
//! Drive an RC car with a gamepad over the Linux joydev interface.
//!
//! This application reads joystick input, maintains vehicle driving state,
//! and relays it over MQTT to the autonomous-driving process.

use anyhow::Result;
use tokio::time::{interval, Duration};
use tracing::{debug, info, warn};

use rc_bridge::config::Config;
use rc_bridge::controller::bindings::Bindings;
use rc_bridge::controller::{Controller, DriveMode};
use rc_bridge::joystick::profile::Profile;
use rc_bridge::telemetry::{PilotSubscriber, TelemetryPublisher};

/// Config file used when none is given on the command line.
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Number of loop ticks between status log messages.
const LOG_INTERVAL_TICKS: u64 = 200;

/// Main entry point for RC Bridge
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Set up logging with tracing subscriber
///    - Load configuration (path from argv, default `config/default.toml`)
///    - Start the joystick poll thread
///    - Connect the telemetry publisher and pilot subscriber
///
/// 2. **Vehicle Loop**
///    - Read a driving-state snapshot each tick at the configured rate
///    - Offer it to the publisher (rate gate and delta filter decide)
///    - Log status periodically
///
/// 3. **Graceful Shutdown**
///    - Ctrl+C stops the loop, then the poll thread is joined
///
/// # Errors
///
/// Returns error if the configuration is invalid or the pilot subscription
/// is rejected. A missing joystick is not fatal: the poll thread keeps
/// retrying acquisition in the background.
#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("RC Bridge v{} starting...", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load(&config_path)?;
    info!("Loaded configuration from {}", config_path);

    let profile = Profile::new(config.joystick.profile_kind());
    let bindings = Bindings::for_profile(
        &profile,
        config.joystick.steering_axis.as_deref(),
        config.joystick.throttle_axis.as_deref(),
    );
    let mut controller = Controller::open(
        &config.joystick.device,
        profile,
        bindings,
        config.joystick.controller_settings(),
    );
    controller.start()?;
    info!(
        "Joystick controller started ({} profile, device {})",
        config.joystick.profile, config.joystick.device
    );

    let mut publisher = TelemetryPublisher::connect(
        &config.broker,
        config.topics.clone(),
        config.vehicle.publish_interval,
    );
    let pilot = PilotSubscriber::connect(&config.broker, &config.topics.pilot).await?;
    info!(
        "Telemetry connected to {}:{} (publish {}, subscribe {})",
        config.broker.host, config.broker.port, config.topics.telemetry, config.topics.pilot
    );

    let period_ms = (1000 / config.vehicle.loop_hz).max(1);
    let mut tick = interval(Duration::from_millis(u64::from(period_ms)));
    info!("Vehicle loop at {}Hz", config.vehicle.loop_hz);
    info!("Press Ctrl+C to exit");

    let mut ticks: u64 = 0;
    let mut published: u64 = 0;

    // Main vehicle loop
    loop {
        tokio::select! {
            _ = tick.tick() => {
                let state = controller.snapshot()?;

                match publisher.publish_state(&state).await {
                    Ok(Some(_)) => published += 1,
                    Ok(None) => {}
                    Err(e) => debug!("Telemetry publish failed: {}", e),
                }

                if state.mode != DriveMode::User {
                    match pilot.latest() {
                        Some(command) => debug!(
                            "Pilot command active: throttle={:.3} angle={:.3}",
                            command.throttle, command.angle
                        ),
                        None => debug!("Autonomous mode without a pilot command yet"),
                    }
                }

                if state.emergency_stop {
                    warn!("Emergency stop is latched");
                }

                ticks += 1;
                if ticks % LOG_INTERVAL_TICKS == 0 {
                    info!(
                        "mode={} throttle={:.2} angle={:.2} recording={} ({} samples published)",
                        state.mode, state.throttle, state.angle, state.recording, published
                    );
                }
            }

            // Handle Ctrl+C for graceful shutdown
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    controller.shutdown();
    info!("Total samples published: {}", published);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_path() {
        assert_eq!(DEFAULT_CONFIG_PATH, "config/default.toml");
    }

    #[test]
    fn test_loop_period_calculation() {
        // 20Hz default gives a 50ms tick.
        assert_eq!((1000u32 / 20).max(1), 50);
        // Degenerate high rates still get a 1ms floor.
        assert_eq!((1000u32 / 1000).max(1), 1);
    }
}
