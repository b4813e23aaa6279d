//! SensorConfiguration - the single shared configuration applied to the sensor

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::{Accuracy, ActivityType, AuthorizationMode, ServiceKind};

/// Configuration the sensor runs with
///
/// `services` is a `BTreeSet` so two configurations built from the same
/// requests compare (and print) identically regardless of insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorConfiguration {
    /// Strictest tier across requests
    pub accuracy: Accuracy,
    /// Smallest declared distance filter; `None` reports every update
    pub min_distance: Option<f64>,
    /// Highest-priority activity hint
    pub activity: ActivityType,
    /// Services that must be running
    pub services: BTreeSet<ServiceKind>,
}

impl SensorConfiguration {
    /// Configuration demanding no sensor activity at all.
    pub fn idle() -> Self {
        Self {
            accuracy: Accuracy::Any,
            min_distance: None,
            activity: ActivityType::Other,
            services: BTreeSet::new(),
        }
    }

    /// Whether any service has to run.
    pub fn requires_activity(&self) -> bool {
        !self.services.is_empty()
    }

    /// Most permissive authorization any running service needs.
    pub fn required_authorization(&self) -> Option<AuthorizationMode> {
        self.services
            .iter()
            .map(|s| s.required_authorization())
            .max()
    }
}

impl Default for SensorConfiguration {
    fn default() -> Self {
        Self::idle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_requires_nothing() {
        let idle = SensorConfiguration::idle();
        assert!(!idle.requires_activity());
        assert_eq!(idle.required_authorization(), None);
    }

    #[test]
    fn test_required_authorization_is_max() {
        let mut config = SensorConfiguration::idle();
        config.services.insert(ServiceKind::Continuous);
        assert_eq!(
            config.required_authorization(),
            Some(AuthorizationMode::WhenInUse)
        );
        config.services.insert(ServiceKind::Visits);
        assert_eq!(
            config.required_authorization(),
            Some(AuthorizationMode::Always)
        );
    }
}
