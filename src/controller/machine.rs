//! # Controller State Machine
//!
//! Folds the decoded joystick event stream into a [`DriveState`], and owns
//! the dedicated poll thread that reads the device.
//!
//! ## Threading Model
//!
//! The poll thread is the only writer. After every applied event it publishes
//! an immutable snapshot through a watch channel; readers clone the latest
//! snapshot and can never observe a half-updated state. Shutdown is
//! cooperative via an atomic flag the poll thread checks between reads (the
//! device is opened non-blocking, so the thread never hangs on a read).
//!
//! ## Device Acquisition
//!
//! The poll thread retries device acquisition with a backoff when the device
//! is absent at start or disappears mid-session. Driving state survives
//! re-acquisition: unplugging the pad does not reset the throttle ceiling or
//! the mode.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::controller::bindings::{AxisAction, Bindings, ButtonAction};
use crate::controller::state::{DriveMode, DriveState, InputState};
use crate::error::{RcBridgeError, Result};
use crate::joystick::device::EventSource;
use crate::joystick::event::{decode, DecodedEvent};
use crate::joystick::profile::{Profile, TypeMatch};

/// Steering override magnitude applied while a chaos button is held.
const CHAOS_STEERING: f32 = 0.2;

/// Poll-thread sleep when the device has no event pending.
const IDLE_SLEEP: Duration = Duration::from_millis(5);

/// Tunables for the poll loop and the initial driving state.
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    /// Extra delay after each processed event (0 = poll as fast as events
    /// arrive).
    pub poll_delay: Duration,
    /// Backoff between device acquisition attempts.
    pub reconnect_interval: Duration,
    /// Initial throttle ceiling.
    pub max_throttle: f32,
    /// Initial steering multiplier.
    pub steering_scale: f32,
    /// Initial throttle multiplier.
    pub throttle_scale: f32,
    /// Derive `recording` from throttle activity instead of a button.
    pub auto_record_on_throttle: bool,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            poll_delay: Duration::ZERO,
            reconnect_interval: Duration::from_secs(5),
            max_throttle: 1.0,
            steering_scale: 1.0,
            throttle_scale: -1.0,
            auto_record_on_throttle: true,
        }
    }
}

/// Round to two decimal places; all stepped adjustments go through this so
/// repeated increments do not accumulate float drift.
fn round2(v: f32) -> f32 {
    (v * 100.0).round() / 100.0
}

/// The event-folding core: pure state, no I/O.
///
/// Owned by the poll thread; tests drive it directly with decoded events.
#[derive(Debug)]
pub struct StateMachine {
    state: DriveState,
    input: InputState,
    bindings: Bindings,
    auto_record_on_throttle: bool,
    /// Left/right pan inputs, combined into `state.pan`. Idle sticks rest
    /// at -1 on these channels.
    pan_left: f32,
    pan_right: f32,
    /// Steering override while a chaos button is held.
    chaos_steering: Option<f32>,
}

impl StateMachine {
    #[must_use]
    pub fn new(bindings: Bindings, settings: &ControllerSettings) -> Self {
        let state = DriveState {
            max_throttle: settings.max_throttle,
            steering_scale: settings.steering_scale,
            throttle_scale: settings.throttle_scale,
            ..DriveState::default()
        };
        Self {
            state,
            input: InputState::default(),
            bindings,
            auto_record_on_throttle: settings.auto_record_on_throttle,
            pan_left: -1.0,
            pan_right: -1.0,
            chaos_steering: None,
        }
    }

    /// The state a reader should observe right now.
    ///
    /// The chaos override substitutes the steering angle while held; the
    /// underlying stick-derived angle is preserved and resurfaces on
    /// release.
    #[must_use]
    pub fn snapshot(&self) -> DriveState {
        let mut snap = self.state.clone();
        if let Some(chaos) = self.chaos_steering {
            snap.angle = chaos;
        }
        snap
    }

    /// Fold one decoded event into the state.
    pub fn apply(&mut self, event: &DecodedEvent) {
        match event {
            DecodedEvent::Ignored => {}
            DecodedEvent::Button { name, value } => self.apply_button(name, *value),
            DecodedEvent::Axis { name, value } => self.apply_axis(name, *value),
        }
    }

    fn apply_button(&mut self, name: &str, value: i32) {
        let previous = self.input.buttons.insert(name.to_string(), value).unwrap_or(0);

        // Edge-triggered: repeats of the same value dispatch nothing.
        if value == 1 && previous != 1 {
            if let Some(action) = self.bindings.button_down.get(name).copied() {
                self.press(action);
            }
        } else if value == 0 && previous != 0 {
            if let Some(action) = self.bindings.button_up.get(name).copied() {
                self.release(action);
            }
        }
    }

    fn apply_axis(&mut self, name: &str, value: f32) {
        self.input.axes.insert(name.to_string(), value);
        if let Some(action) = self.bindings.axis.get(name).copied() {
            self.axis_action(action, value);
        }
    }

    fn axis_action(&mut self, action: AxisAction, value: f32) {
        match action {
            AxisAction::Steering => {
                self.state.angle = self.state.steering_scale * value;
            }
            AxisAction::Throttle => {
                self.state.throttle =
                    self.state.throttle_scale * value * self.state.max_throttle;
                self.on_throttle_changes();
            }
            AxisAction::PanLeft => {
                self.pan_left = value;
                self.update_pan();
            }
            AxisAction::PanRight => {
                self.pan_right = value;
                self.update_pan();
            }
            AxisAction::ThrottleScale => {
                if value == 1.0 {
                    self.state.throttle_scale =
                        round2((self.state.throttle_scale + 0.05).min(0.0));
                    info!("throttle scale: {}", self.state.throttle_scale);
                } else if value == -1.0 {
                    self.state.throttle_scale =
                        round2((self.state.throttle_scale - 0.05).max(-1.0));
                    info!("throttle scale: {}", self.state.throttle_scale);
                }
            }
            AxisAction::SteeringScale => {
                if value == 1.0 {
                    self.state.steering_scale =
                        round2((self.state.steering_scale + 0.05).min(1.0));
                    info!("steering scale: {}", self.state.steering_scale);
                } else if value == -1.0 {
                    self.state.steering_scale =
                        round2((self.state.steering_scale - 0.05).max(0.0));
                    info!("steering scale: {}", self.state.steering_scale);
                }
            }
            // Analog triggers step the ceiling on every reported movement.
            AxisAction::IncreaseMaxThrottle => self.increase_max_throttle(),
            AxisAction::DecreaseMaxThrottle => self.decrease_max_throttle(),
        }
    }

    fn press(&mut self, action: ButtonAction) {
        match action {
            ButtonAction::ToggleMode => {
                self.state.mode = self.state.mode.cycle();
                // Leaving user mode with throttle applied must stop a
                // throttle-driven recording.
                self.on_throttle_changes();
                info!("new mode: {}", self.state.mode);
            }
            ButtonAction::ToggleRecording => {
                if self.auto_record_on_throttle {
                    warn!("auto record on throttle is enabled; ignoring recording toggle");
                } else {
                    self.state.recording = !self.state.recording;
                    info!("recording: {}", self.state.recording);
                }
            }
            ButtonAction::ToggleAutoRecord => {
                // Known quirk: recording is forced off on both edges of
                // this toggle, not restored when re-enabling.
                self.auto_record_on_throttle = !self.auto_record_on_throttle;
                self.state.recording = false;
                info!(
                    "auto record on throttle: {}",
                    self.auto_record_on_throttle
                );
            }
            ButtonAction::EraseLastRecords => {
                self.state.erase_requested = true;
                info!("erase of last records requested");
            }
            ButtonAction::EmergencyStop => {
                warn!("E-Stop!");
                self.state.emergency_stop = true;
                self.state.constant_throttle = false;
                self.state.throttle = 0.0;
                self.state.recording = false;
            }
            ButtonAction::IncreaseMaxThrottle => self.increase_max_throttle(),
            ButtonAction::DecreaseMaxThrottle => self.decrease_max_throttle(),
            ButtonAction::ToggleConstantThrottle => {
                if self.state.constant_throttle {
                    self.state.constant_throttle = false;
                    self.state.throttle = 0.0;
                } else {
                    self.state.constant_throttle = true;
                    self.state.throttle = self.state.max_throttle;
                }
                self.on_throttle_changes();
                info!("constant throttle: {}", self.state.constant_throttle);
            }
            ButtonAction::TiltUp => {
                self.state.tilt = round2((self.state.tilt + 0.1).min(1.0));
            }
            ButtonAction::TiltDown => {
                self.state.tilt = round2((self.state.tilt - 0.1).max(-1.0));
            }
            ButtonAction::ChaosLeft => self.chaos_steering = Some(-CHAOS_STEERING),
            ButtonAction::ChaosRight => self.chaos_steering = Some(CHAOS_STEERING),
            ButtonAction::ChaosOff => self.chaos_steering = None,
        }
    }

    fn release(&mut self, action: ButtonAction) {
        // Only the chaos override has release semantics today; anything else
        // bound to a release edge goes through the same dispatch.
        if action == ButtonAction::ChaosOff {
            self.chaos_steering = None;
        } else {
            self.press(action);
        }
    }

    fn increase_max_throttle(&mut self) {
        self.state.max_throttle = round2((self.state.max_throttle + 0.01).min(1.0));
        if self.state.constant_throttle {
            self.state.throttle = self.state.max_throttle;
            self.on_throttle_changes();
        }
        info!("max throttle: {}", self.state.max_throttle);
    }

    fn decrease_max_throttle(&mut self) {
        self.state.max_throttle = round2((self.state.max_throttle - 0.01).max(0.0));
        if self.state.constant_throttle {
            self.state.throttle = self.state.max_throttle;
            self.on_throttle_changes();
        }
        info!("max throttle: {}", self.state.max_throttle);
    }

    fn update_pan(&mut self) {
        self.state.pan = ((self.pan_left + 1.0) - (self.pan_right + 1.0)) / 2.0;
    }

    /// Recompute the auto-record decision after any throttle change.
    fn on_throttle_changes(&mut self) {
        if self.auto_record_on_throttle {
            self.state.recording =
                self.state.throttle != 0.0 && self.state.mode == DriveMode::User;
        }
    }

    #[cfg(test)]
    fn state(&self) -> &DriveState {
        &self.state
    }
}

/// Factory producing event sources, called on every (re-)acquisition.
pub type SourceFactory = Box<dyn FnMut() -> Result<Box<dyn EventSource>> + Send>;

/// Owns the poll thread and the published driving state.
///
/// Construct, then [`start`](Controller::start); reading a snapshot before
/// the poll loop has been started is an API misuse and fails fast.
pub struct Controller {
    factory: Option<SourceFactory>,
    type_match: TypeMatch,
    bindings: Bindings,
    settings: ControllerSettings,
    running: Arc<AtomicBool>,
    state_rx: Option<watch::Receiver<DriveState>>,
    thread: Option<thread::JoinHandle<()>>,
}

impl Controller {
    /// Controller backed by the physical device at `device_path`.
    #[must_use]
    pub fn open(
        device_path: &str,
        profile: Profile,
        bindings: Bindings,
        settings: ControllerSettings,
    ) -> Self {
        let path = device_path.to_string();
        let type_match = profile.type_match;
        let factory: SourceFactory = Box::new(move || {
            let device = crate::joystick::device::JsDevice::open(&path, &profile)?;
            Ok(Box::new(device) as Box<dyn EventSource>)
        });
        Self::with_source(factory, type_match, bindings, settings)
    }

    /// Controller backed by an arbitrary event source factory.
    ///
    /// The seam used by tests to substitute simulated devices.
    #[must_use]
    pub fn with_source(
        factory: SourceFactory,
        type_match: TypeMatch,
        bindings: Bindings,
        settings: ControllerSettings,
    ) -> Self {
        Self {
            factory: Some(factory),
            type_match,
            bindings,
            settings,
            running: Arc::new(AtomicBool::new(false)),
            state_rx: None,
            thread: None,
        }
    }

    /// Spawn the poll thread.
    ///
    /// # Errors
    ///
    /// `Misuse` if called twice.
    pub fn start(&mut self) -> Result<()> {
        let factory = self.factory.take().ok_or_else(|| {
            RcBridgeError::Misuse("controller already started".to_string())
        })?;

        let machine = StateMachine::new(self.bindings.clone(), &self.settings);
        let (tx, rx) = watch::channel(machine.snapshot());
        self.state_rx = Some(rx);
        self.running.store(true, Ordering::SeqCst);

        let running = Arc::clone(&self.running);
        let type_match = self.type_match;
        let settings = self.settings.clone();
        let handle = thread::Builder::new()
            .name("joystick-poll".to_string())
            .spawn(move || poll_loop(factory, type_match, machine, settings, running, tx))?;
        self.thread = Some(handle);
        Ok(())
    }

    /// Clone the latest published driving state.
    ///
    /// # Errors
    ///
    /// `Misuse` if the poll loop was never started.
    pub fn snapshot(&self) -> Result<DriveState> {
        let rx = self.state_rx.as_ref().ok_or_else(|| {
            RcBridgeError::Misuse(
                "driving state read before the poll loop was started".to_string(),
            )
        })?;
        Ok(rx.borrow().clone())
    }

    /// Subscribe to driving-state updates.
    ///
    /// # Errors
    ///
    /// `Misuse` if the poll loop was never started.
    pub fn subscribe(&self) -> Result<watch::Receiver<DriveState>> {
        self.state_rx.as_ref().cloned().ok_or_else(|| {
            RcBridgeError::Misuse(
                "driving state subscribed before the poll loop was started".to_string(),
            )
        })
    }

    /// Whether the poll thread is (supposed to be) running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stop the poll thread and wait for it to exit. Idempotent.
    pub fn shutdown(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                warn!("joystick poll thread panicked");
            }
        }
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Sleep up to `total`, waking early when the running flag drops.
fn sleep_while_running(running: &AtomicBool, total: Duration) {
    let deadline = Instant::now() + total;
    while running.load(Ordering::SeqCst) {
        let left = deadline.saturating_duration_since(Instant::now());
        if left.is_zero() {
            return;
        }
        thread::sleep(left.min(Duration::from_millis(50)));
    }
}

/// Body of the poll thread: acquire device, fold events, publish snapshots,
/// re-acquire on loss.
fn poll_loop(
    mut factory: SourceFactory,
    type_match: TypeMatch,
    mut machine: StateMachine,
    settings: ControllerSettings,
    running: Arc<AtomicBool>,
    tx: watch::Sender<DriveState>,
) {
    while running.load(Ordering::SeqCst) {
        let mut source = match factory() {
            Ok(source) => source,
            Err(e) => {
                warn!(
                    "joystick unavailable ({}); retrying in {:?}",
                    e, settings.reconnect_interval
                );
                sleep_while_running(&running, settings.reconnect_interval);
                continue;
            }
        };

        debug!("joystick acquired; entering event loop");
        while running.load(Ordering::SeqCst) {
            match source.next_event() {
                Ok(Some(raw)) => {
                    let event =
                        decode(&raw, type_match, source.axis_map(), source.button_map());
                    machine.apply(&event);
                    // Watch send only fails when every receiver is gone,
                    // which means shutdown is already underway.
                    let _ = tx.send(machine.snapshot());
                    if !settings.poll_delay.is_zero() {
                        thread::sleep(settings.poll_delay);
                    }
                }
                Ok(None) => thread::sleep(IDLE_SLEEP),
                Err(e) => {
                    warn!("joystick read failed ({}); re-acquiring device", e);
                    break;
                }
            }
        }
    }
    info!("joystick poll loop stopped");
}
