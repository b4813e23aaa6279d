//! Sensor trait - the shared positioning device capability
//!
//! The locator consumes this trait only, so a hardware driver, a simulator and
//! a scripted test double are interchangeable.

use std::sync::Arc;

use crate::{AuthorizationMode, AuthorizationState, Reading, SensorConfiguration, SensorError};

/// Inbound event from the sensor
#[derive(Debug, Clone)]
pub enum SensorEvent {
    /// One batch of readings, in arbitrary order
    Success(Vec<Reading>),
    /// Driver-level failure
    Failure(SensorError),
}

/// Event callback type
///
/// Uses `Arc` so the sensor can hand clones to its worker threads.
pub type SensorEventCallback = Arc<dyn Fn(SensorEvent) + Send + Sync>;

/// Authorization callback type
pub type AuthorizationCallback = Arc<dyn Fn(AuthorizationState) + Send + Sync>;

/// Positioning sensor capability
///
/// # Design Principles
///
/// 1. **Callback Pattern**: events and authorization changes come back through
///    callbacks registered with [`Sensor::listen`], consistent with native
///    platform delegates
/// 2. **Synchronous apply**: [`Sensor::update_settings`] is called only from
///    the locator's serialized context and must not block
/// 3. **No memory assumed**: a freshly attached sensor knows nothing about
///    previously applied configurations
///
/// # Example
///
/// ```ignore
/// let sensor: Arc<dyn Sensor> = Arc::new(ScriptedSensor::new());
/// sensor.listen(
///     Arc::new(|event| println!("{event:?}")),
///     Arc::new(|state| println!("authorization: {state:?}")),
/// );
/// sensor.update_settings(&SensorConfiguration::idle());
/// ```
pub trait Sensor: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Current authorization (synchronous read)
    fn authorization_status(&self) -> AuthorizationState;

    /// Ask the platform to elevate authorization
    ///
    /// The result arrives asynchronously through `callback`. Unsolicited
    /// changes later on go to the callback registered with [`Sensor::listen`].
    fn request_authorization(&self, mode: AuthorizationMode, callback: AuthorizationCallback);

    /// Apply a configuration; an idle configuration stops all services
    fn update_settings(&self, config: &SensorConfiguration);

    /// Register delegate callbacks
    ///
    /// Registering again replaces the previous callbacks.
    fn listen(&self, events: SensorEventCallback, authorization: AuthorizationCallback);
}
