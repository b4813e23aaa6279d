//! Layered error definitions
//!
//! - `ContractError`: configuration and IO, raised while loading blueprints
//! - `LocatorError`: terminal outcome of a single request
//! - `SensorError`: opaque driver failure carried inside `LocatorError`
//! - `DiscardReason`: not an error; why a request ignored a reading

use std::time::Duration;
use thiserror::Error;

/// Configuration / IO error
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Category of a driver failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorErrorKind {
    /// Position temporarily unknown; the sensor keeps trying
    LocationUnknown,
    /// The driver refused because of authorization
    Denied,
    /// Network assistance unavailable
    Network,
    /// Anything else
    Other,
}

/// Driver failure, wrapped opaquely
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{kind:?}: {message}")]
pub struct SensorError {
    pub kind: SensorErrorKind,
    pub message: String,
}

impl SensorError {
    pub fn new(kind: SensorErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Authorization-specific failures only reach under-authorized requests.
    pub fn is_authorization(&self) -> bool {
        self.kind == SensorErrorKind::Denied
    }

    /// Continuous requests survive recoverable failures.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.kind,
            SensorErrorKind::LocationUnknown | SensorErrorKind::Network
        )
    }
}

/// Terminal outcome of a request
///
/// `Clone` because a single sensor failure fans out to many subscribers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LocatorError {
    /// Authorization insufficient and the request opted out of prompting
    #[error("authorization needed")]
    AuthorizationNeeded,

    /// The user or the system denied access
    #[error("authorization denied")]
    AuthorizationDenied,

    /// No satisfying reading within the declared window
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Underlying driver error
    #[error("sensor failure: {0}")]
    SensorFailure(#[source] SensorError),

    /// Explicit cancellation (or locator shutdown)
    #[error("cancelled")]
    Cancelled,

    /// Options rejected at submission
    #[error("invalid option '{field}': {message}")]
    InvalidOptions { field: String, message: String },

    /// IP lookup provider failed
    #[error("ip lookup via '{provider}' failed: {message}")]
    LookupFailed { provider: String, message: String },
}

impl LocatorError {
    /// Create invalid options error
    pub fn invalid_options(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidOptions {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create lookup error
    pub fn lookup_failed(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::LookupFailed {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Short label used as a metrics dimension
    pub fn label(&self) -> &'static str {
        match self {
            Self::AuthorizationNeeded => "authorization_needed",
            Self::AuthorizationDenied => "authorization_denied",
            Self::Timeout(_) => "timeout",
            Self::SensorFailure(_) => "sensor_failure",
            Self::Cancelled => "cancelled",
            Self::InvalidOptions { .. } => "invalid_options",
            Self::LookupFailed { .. } => "lookup_failed",
        }
    }
}

/// Why a request ignored a reading
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DiscardReason {
    /// Horizontal error above the request's tier
    TooCoarse { horizontal_accuracy: f64, required: f64 },
    /// Not far enough from the last accepted reading
    BelowMinDistance { moved: f64, required: f64 },
    /// Older than the request's `max_age`
    Stale { age: Duration, max_age: Duration },
}

impl DiscardReason {
    /// Short label used as a metrics dimension
    pub fn label(&self) -> &'static str {
        match self {
            Self::TooCoarse { .. } => "too_coarse",
            Self::BelowMinDistance { .. } => "below_min_distance",
            Self::Stale { .. } => "stale",
        }
    }
}
