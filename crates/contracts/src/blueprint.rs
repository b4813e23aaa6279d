//! LocatorBlueprint - Config Loader output
//!
//! Describes a complete locator setup: authorization policy, request defaults,
//! the simulated sensor, and the requests a scenario run submits.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{AuthorizationMode, AuthorizationState, Coordinate, RequestOptions};

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete blueprint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocatorBlueprint {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Locator policy
    #[serde(default)]
    pub locator: LocatorConfig,

    /// Simulated sensor settings
    #[serde(default)]
    pub simulator: SimulatorConfig,

    /// Requests submitted by a scenario run
    #[serde(default)]
    pub requests: Vec<RequestOptions>,
}

/// Locator policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocatorConfig {
    /// Authorization modes the host application declares (manifest keys)
    #[serde(default)]
    pub declared_modes: Vec<AuthorizationMode>,

    /// Timeout applied to requests that declare none
    #[serde(
        default,
        rename = "default_timeout_ms",
        with = "crate::serde_ms::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub default_timeout: Option<Duration>,

    /// Timeout for IP lookups that declare none
    #[serde(
        default = "default_ip_lookup_timeout",
        rename = "ip_lookup_timeout_ms",
        with = "crate::serde_ms"
    )]
    pub ip_lookup_timeout: Duration,
}

fn default_ip_lookup_timeout() -> Duration {
    Duration::from_secs(10)
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            declared_modes: Vec::new(),
            default_timeout: None,
            ip_lookup_timeout: default_ip_lookup_timeout(),
        }
    }
}

/// Simulated sensor settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatorConfig {
    /// Emission frequency while any service runs (Hz)
    #[serde(default = "default_frequency_hz")]
    pub frequency_hz: f64,

    /// First emitted position
    #[serde(default = "default_start")]
    pub start: Coordinate,

    /// Northward movement between two readings (meters)
    #[serde(default = "default_step_meters")]
    pub step_meters: f64,

    /// Reported horizontal error (meters)
    #[serde(default = "default_horizontal_accuracy")]
    pub horizontal_accuracy: f64,

    /// Authorization before any prompt
    #[serde(default)]
    pub initial_authorization: AuthorizationState,

    /// What the simulated user answers to a prompt
    #[serde(default = "default_authorization_response")]
    pub authorization_response: AuthorizationState,
}

fn default_frequency_hz() -> f64 {
    1.0
}

fn default_start() -> Coordinate {
    Coordinate::new(45.4642, 9.19)
}

fn default_step_meters() -> f64 {
    10.0
}

fn default_horizontal_accuracy() -> f64 {
    5.0
}

fn default_authorization_response() -> AuthorizationState {
    AuthorizationState::FullAccess
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            frequency_hz: default_frequency_hz(),
            start: default_start(),
            step_meters: default_step_meters(),
            horizontal_accuracy: default_horizontal_accuracy(),
            initial_authorization: AuthorizationState::NotDetermined,
            authorization_response: default_authorization_response(),
        }
    }
}
