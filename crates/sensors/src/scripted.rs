//! Scripted sensor
//!
//! Implements `Sensor` without any background activity: every call is recorded,
//! and tests decide when readings, failures and authorization answers arrive.

use std::sync::{Mutex, MutexGuard, PoisonError};

use contracts::{
    AuthorizationCallback, AuthorizationMode, AuthorizationState, Reading, Sensor, SensorError,
    SensorEvent, SensorEventCallback, SensorConfiguration,
};
use tracing::{debug, trace};

#[derive(Default)]
struct ScriptedState {
    authorization: AuthorizationState,
    /// Answer prompts immediately with this state
    auto_response: Option<AuthorizationState>,
    prompts: Vec<AuthorizationMode>,
    pending_prompts: Vec<AuthorizationCallback>,
    applied: Vec<SensorConfiguration>,
    events: Option<SensorEventCallback>,
    authorization_changes: Option<AuthorizationCallback>,
}

/// Deterministic test double
///
/// ```ignore
/// let sensor = Arc::new(ScriptedSensor::new());
/// let locator = Locator::new(sensor.clone(), LocatorConfig::default());
/// let handle = locator.submit(RequestOptions::new(Accuracy::Room))?;
/// // ... wait for the prompt ...
/// sensor.respond_to_prompt(AuthorizationState::FullAccess);
/// sensor.emit_readings(vec![reading]);
/// ```
pub struct ScriptedSensor {
    name: String,
    state: Mutex<ScriptedState>,
}

impl ScriptedSensor {
    /// Sensor starting in `NotDetermined` that leaves prompts pending.
    pub fn new() -> Self {
        Self::with_authorization(AuthorizationState::NotDetermined)
    }

    /// Sensor starting in the given authorization state.
    pub fn with_authorization(authorization: AuthorizationState) -> Self {
        Self {
            name: "scripted".to_string(),
            state: Mutex::new(ScriptedState {
                authorization,
                ..Default::default()
            }),
        }
    }

    /// Answer every prompt immediately with `response`.
    pub fn answering_prompts_with(self, response: AuthorizationState) -> Self {
        self.lock().auto_response = Some(response);
        self
    }

    fn lock(&self) -> MutexGuard<'_, ScriptedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Modes the locator prompted for, in order.
    pub fn authorization_requests(&self) -> Vec<AuthorizationMode> {
        self.lock().prompts.clone()
    }

    /// Every configuration applied, in order.
    pub fn applied_settings(&self) -> Vec<SensorConfiguration> {
        self.lock().applied.clone()
    }

    /// Most recently applied configuration.
    pub fn last_settings(&self) -> Option<SensorConfiguration> {
        self.lock().applied.last().cloned()
    }

    /// Number of `update_settings` calls.
    pub fn update_count(&self) -> usize {
        self.lock().applied.len()
    }

    /// Whether `listen` has been called.
    pub fn is_listening(&self) -> bool {
        self.lock().events.is_some()
    }

    /// Resolve every pending prompt with `state`.
    ///
    /// Returns the number of prompts answered.
    pub fn respond_to_prompt(&self, state: AuthorizationState) -> usize {
        let callbacks = {
            let mut guard = self.lock();
            guard.authorization = state;
            std::mem::take(&mut guard.pending_prompts)
        };
        debug!(state = ?state, prompts = callbacks.len(), "scripted prompt answered");
        for callback in &callbacks {
            callback(state);
        }
        callbacks.len()
    }

    /// Unsolicited authorization change (e.g. toggled in system settings).
    pub fn set_authorization(&self, state: AuthorizationState) {
        let callback = {
            let mut guard = self.lock();
            guard.authorization = state;
            guard.authorization_changes.clone()
        };
        if let Some(callback) = callback {
            callback(state);
        }
    }

    /// Deliver a batch of readings through the event callback.
    pub fn emit_readings(&self, readings: Vec<Reading>) -> bool {
        self.emit(SensorEvent::Success(readings))
    }

    /// Deliver a driver failure through the event callback.
    pub fn emit_error(&self, error: SensorError) -> bool {
        self.emit(SensorEvent::Failure(error))
    }

    fn emit(&self, event: SensorEvent) -> bool {
        let callback = self.lock().events.clone();
        match callback {
            Some(callback) => {
                trace!(event = ?event, "scripted event emitted");
                callback(event);
                true
            }
            None => false,
        }
    }
}

impl Default for ScriptedSensor {
    fn default() -> Self {
        Self::new()
    }
}

impl Sensor for ScriptedSensor {
    fn name(&self) -> &str {
        &self.name
    }

    fn authorization_status(&self) -> AuthorizationState {
        self.lock().authorization
    }

    fn request_authorization(&self, mode: AuthorizationMode, callback: AuthorizationCallback) {
        let auto = {
            let mut guard = self.lock();
            guard.prompts.push(mode);
            match guard.auto_response {
                Some(response) => {
                    guard.authorization = response;
                    Some(response)
                }
                None => {
                    guard.pending_prompts.push(callback.clone());
                    None
                }
            }
        };
        if let Some(response) = auto {
            callback(response);
        }
    }

    fn update_settings(&self, config: &SensorConfiguration) {
        self.lock().applied.push(config.clone());
    }

    fn listen(&self, events: SensorEventCallback, authorization: AuthorizationCallback) {
        let mut guard = self.lock();
        guard.events = Some(events);
        guard.authorization_changes = Some(authorization);
    }
}
