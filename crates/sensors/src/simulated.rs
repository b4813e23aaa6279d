//! Simulated sensor implementation
//!
//! Implements `Sensor`, walking northward from a start coordinate and emitting
//! one reading per tick from a background thread while any service runs.
//! Used for the CLI and for development without a positioning device.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use contracts::{
    AuthorizationCallback, AuthorizationMode, AuthorizationState, Coordinate, Reading, Sensor,
    SensorConfiguration, SensorEvent, SensorEventCallback, SimulatorConfig,
};
use tracing::{debug, info, trace};

/// Delay before the simulated user answers a prompt
const PROMPT_DELAY: Duration = Duration::from_millis(50);

struct SimState {
    authorization: AuthorizationState,
    config: SensorConfiguration,
    position: Coordinate,
    events: Option<SensorEventCallback>,
    authorization_changes: Option<AuthorizationCallback>,
}

/// Simulated sensor
///
/// Emits at `frequency_hz` only while the applied configuration requires
/// activity; an idle configuration stops the worker thread.
pub struct SimulatedSensor {
    config: SimulatorConfig,
    state: Arc<Mutex<SimState>>,
    running: Arc<AtomicBool>,
    /// Bumped on every start; an emitter thread exits once it is stale
    generation: Arc<AtomicU64>,
}

impl SimulatedSensor {
    /// Create new simulated sensor
    pub fn new(config: SimulatorConfig) -> Self {
        let state = SimState {
            authorization: config.initial_authorization,
            config: SensorConfiguration::idle(),
            position: config.start,
            events: None,
            authorization_changes: None,
        };
        Self {
            config,
            state: Arc::new(Mutex::new(state)),
            running: Arc::new(AtomicBool::new(false)),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Create simulated sensor with default configuration
    pub fn with_defaults() -> Self {
        Self::new(SimulatorConfig::default())
    }

    /// Whether the emitter thread is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Configuration currently applied
    pub fn current_settings(&self) -> SensorConfiguration {
        Self::lock(&self.state).config.clone()
    }

    /// Change authorization as if toggled in system settings
    pub fn set_authorization(&self, authorization: AuthorizationState) {
        let callback = {
            let mut guard = Self::lock(&self.state);
            guard.authorization = authorization;
            guard.authorization_changes.clone()
        };
        if let Some(callback) = callback {
            callback(authorization);
        }
    }

    fn lock(state: &Mutex<SimState>) -> MutexGuard<'_, SimState> {
        state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn start_emitter(&self) {
        // Idempotent: if already running, don't start again
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }

        let state = self.state.clone();
        let running = self.running.clone();
        let generation = self.generation.clone();
        let own = generation.fetch_add(1, Ordering::SeqCst) + 1;
        let step = self.config.step_meters;
        let horizontal_accuracy = self.config.horizontal_accuracy;
        let interval = Duration::from_secs_f64(1.0 / self.config.frequency_hz);

        thread::spawn(move || {
            debug!(interval_ms = interval.as_millis() as u64, "simulated sensor started");

            let live = || {
                running.load(Ordering::Relaxed) && generation.load(Ordering::SeqCst) == own
            };
            while live() {
                thread::sleep(interval);
                if !live() {
                    break;
                }

                let (reading, callback) = {
                    let mut guard = Self::lock(&state);
                    guard.position = guard.position.offset_north(step);
                    (
                        Reading::now(guard.position, horizontal_accuracy),
                        guard.events.clone(),
                    )
                };

                if let Some(callback) = callback {
                    trace!(
                        latitude = reading.coordinate.latitude,
                        longitude = reading.coordinate.longitude,
                        "simulated reading emitted"
                    );
                    callback(SensorEvent::Success(vec![reading]));
                }
            }

            debug!("simulated sensor stopped");
        });
    }

    fn stop_emitter(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

impl Drop for SimulatedSensor {
    fn drop(&mut self) {
        self.stop_emitter();
    }
}

impl Sensor for SimulatedSensor {
    fn name(&self) -> &str {
        "simulated"
    }

    fn authorization_status(&self) -> AuthorizationState {
        Self::lock(&self.state).authorization
    }

    fn request_authorization(&self, mode: AuthorizationMode, callback: AuthorizationCallback) {
        let response = self.config.authorization_response;
        let state = self.state.clone();

        info!(mode = ?mode, response = ?response, "simulated authorization prompt");

        thread::spawn(move || {
            thread::sleep(PROMPT_DELAY);
            Self::lock(&state).authorization = response;
            callback(response);
        });
    }

    fn update_settings(&self, config: &SensorConfiguration) {
        Self::lock(&self.state).config = config.clone();

        if config.requires_activity() {
            self.start_emitter();
        } else {
            self.stop_emitter();
        }
    }

    fn listen(&self, events: SensorEventCallback, authorization: AuthorizationCallback) {
        let mut guard = Self::lock(&self.state);
        guard.events = Some(events);
        guard.authorization_changes = Some(authorization);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::ServiceKind;
    use std::sync::atomic::AtomicU64;

    fn active_config() -> SensorConfiguration {
        let mut config = SensorConfiguration::idle();
        config.services.insert(ServiceKind::Continuous);
        config
    }

    fn fast_config() -> SimulatorConfig {
        SimulatorConfig {
            frequency_hz: 100.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_emits_only_while_active() {
        let sensor = SimulatedSensor::new(fast_config());
        let count = Arc::new(AtomicU64::new(0));
        let count_clone = count.clone();

        sensor.listen(
            Arc::new(move |event| {
                if let SensorEvent::Success(readings) = event {
                    assert_eq!(readings.len(), 1);
                    count_clone.fetch_add(1, Ordering::Relaxed);
                }
            }),
            Arc::new(|_| {}),
        );

        thread::sleep(Duration::from_millis(50));
        assert_eq!(count.load(Ordering::Relaxed), 0);

        sensor.update_settings(&active_config());
        assert!(sensor.is_running());
        thread::sleep(Duration::from_millis(100));
        sensor.update_settings(&SensorConfiguration::idle());
        assert!(!sensor.is_running());

        assert!(count.load(Ordering::Relaxed) > 0);
    }

    #[test]
    fn test_readings_move_north() {
        let sensor = SimulatedSensor::new(fast_config());
        let latitudes = Arc::new(Mutex::new(Vec::new()));
        let latitudes_clone = latitudes.clone();

        sensor.listen(
            Arc::new(move |event| {
                if let SensorEvent::Success(readings) = event {
                    latitudes_clone
                        .lock()
                        .unwrap()
                        .push(readings[0].coordinate.latitude);
                }
            }),
            Arc::new(|_| {}),
        );
        sensor.update_settings(&active_config());
        thread::sleep(Duration::from_millis(100));
        sensor.update_settings(&SensorConfiguration::idle());

        let latitudes = latitudes.lock().unwrap();
        assert!(latitudes.len() >= 2);
        assert!(latitudes.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn test_prompt_answered_with_configured_response() {
        let sensor = SimulatedSensor::new(SimulatorConfig {
            authorization_response: AuthorizationState::RestrictedForeground,
            ..Default::default()
        });
        let answered = Arc::new(Mutex::new(None));
        let answered_clone = answered.clone();

        sensor.request_authorization(
            AuthorizationMode::WhenInUse,
            Arc::new(move |state| *answered_clone.lock().unwrap() = Some(state)),
        );
        thread::sleep(PROMPT_DELAY * 4);

        assert_eq!(
            *answered.lock().unwrap(),
            Some(AuthorizationState::RestrictedForeground)
        );
        assert_eq!(
            sensor.authorization_status(),
            AuthorizationState::RestrictedForeground
        );
    }
}
