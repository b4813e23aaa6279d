//! RequestOptions - what a single consumer asks of the shared sensor

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{AuthorizationMode, LocatorError};

/// Accuracy tier
///
/// Declared from strictest to coarsest, so `Ord::min` picks the strictest tier.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Accuracy {
    /// ~5 m
    Room,
    /// ~60 m
    House,
    /// ~100 m
    Block,
    /// ~1 km
    Neighborhood,
    /// ~5 km
    City,
    /// No requirement
    #[default]
    Any,
}

impl Accuracy {
    /// Largest acceptable horizontal error in meters, `None` for [`Accuracy::Any`].
    pub fn tolerance_meters(self) -> Option<f64> {
        match self {
            Self::Room => Some(5.0),
            Self::House => Some(60.0),
            Self::Block => Some(100.0),
            Self::Neighborhood => Some(1_000.0),
            Self::City => Some(5_000.0),
            Self::Any => None,
        }
    }

    /// Whether a reading with the given horizontal error is good enough.
    pub fn accepts(self, horizontal_accuracy: f64) -> bool {
        match self.tolerance_meters() {
            Some(limit) => horizontal_accuracy >= 0.0 && horizontal_accuracy <= limit,
            None => true,
        }
    }
}

/// Activity context hint, declared in ascending priority.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    #[default]
    Other,
    Fitness,
    OtherNavigation,
    AutomotiveNavigation,
    Airborne,
}

/// Sensor service a request runs on
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    /// Standard location updates
    #[default]
    Continuous,
    /// Low-power updates on significant movement
    SignificantChanges,
    /// Visit (arrival/departure) monitoring
    Visits,
}

impl ServiceKind {
    /// Authorization the service cannot run without.
    pub fn required_authorization(self) -> AuthorizationMode {
        match self {
            Self::Continuous => AuthorizationMode::WhenInUse,
            Self::SignificantChanges | Self::Visits => AuthorizationMode::Always,
        }
    }
}

/// One-shot or subscription
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionMode {
    /// Terminates after the first accepted reading
    #[default]
    Single,
    /// Keeps delivering until cancelled
    Continuous,
}

/// Desired quality for a live-sensor request
///
/// Immutable once the request is submitted.
///
/// # Examples
/// ```
/// use contracts::{Accuracy, RequestOptions};
/// use std::time::Duration;
///
/// let options = RequestOptions::new(Accuracy::House)
///     .with_min_distance(25.0)
///     .with_timeout(Duration::from_secs(5));
/// assert!(options.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestOptions {
    #[serde(default)]
    pub accuracy: Accuracy,

    /// Minimum movement (meters) between two accepted readings
    #[serde(default)]
    pub min_distance: Option<f64>,

    #[serde(default)]
    pub activity: ActivityType,

    #[serde(default)]
    pub service: ServiceKind,

    /// Fail with `AuthorizationNeeded` instead of prompting
    #[serde(default)]
    pub avoid_authorization_prompt: bool,

    #[serde(
        default,
        rename = "timeout_ms",
        with = "crate::serde_ms::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub timeout: Option<Duration>,

    /// Readings older than this are discarded as stale
    #[serde(
        default,
        rename = "max_age_ms",
        with = "crate::serde_ms::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_age: Option<Duration>,

    #[serde(default)]
    pub mode: SubscriptionMode,
}

impl RequestOptions {
    /// Options with the given accuracy and defaults everywhere else.
    pub fn new(accuracy: Accuracy) -> Self {
        Self {
            accuracy,
            ..Default::default()
        }
    }

    pub fn with_min_distance(mut self, meters: f64) -> Self {
        self.min_distance = Some(meters);
        self
    }

    pub fn with_activity(mut self, activity: ActivityType) -> Self {
        self.activity = activity;
        self
    }

    pub fn with_service(mut self, service: ServiceKind) -> Self {
        self.service = service;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    pub fn avoiding_prompt(mut self) -> Self {
        self.avoid_authorization_prompt = true;
        self
    }

    pub fn continuous(mut self) -> Self {
        self.mode = SubscriptionMode::Continuous;
        self
    }

    pub fn is_continuous(&self) -> bool {
        self.mode == SubscriptionMode::Continuous
    }

    /// Authorization this request's service needs.
    pub fn required_authorization(&self) -> AuthorizationMode {
        self.service.required_authorization()
    }

    /// Reject values the reconciler cannot fold.
    pub fn validate(&self) -> Result<(), LocatorError> {
        if let Some(distance) = self.min_distance {
            if !distance.is_finite() || distance < 0.0 {
                return Err(LocatorError::invalid_options(
                    "min_distance",
                    format!("must be a finite, non-negative number of meters, got {distance}"),
                ));
            }
        }
        if self.timeout.is_some_and(|t| t.is_zero()) {
            return Err(LocatorError::invalid_options("timeout", "must be > 0"));
        }
        if self.max_age.is_some_and(|t| t.is_zero()) {
            return Err(LocatorError::invalid_options("max_age", "must be > 0"));
        }
        Ok(())
    }
}

/// Options for the IP-based lookup path
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IpLookupOptions {
    #[serde(
        default,
        rename = "timeout_ms",
        with = "crate::serde_ms::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub timeout: Option<Duration>,
}
