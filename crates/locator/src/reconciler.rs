//! Settings reconciliation
//!
//! `reconcile` folds the live request set into the single strictest
//! configuration; `SettingsReconciler` remembers what the sensor last
//! received and suppresses identical updates.

use tracing::{debug, info};

use contracts::{Accuracy, ActivityType, RequestOptions, Sensor, SensorConfiguration};

/// Minimal configuration satisfying every request
///
/// Pure and order independent. An empty set yields
/// [`SensorConfiguration::idle`].
pub fn reconcile<'a, I>(requests: I) -> SensorConfiguration
where
    I: IntoIterator<Item = &'a RequestOptions>,
{
    let mut accuracy = Accuracy::Any;
    let mut min_distance = f64::INFINITY;
    let mut activity = ActivityType::Other;
    let mut config = SensorConfiguration::idle();

    for options in requests {
        accuracy = accuracy.min(options.accuracy);
        if let Some(distance) = options.min_distance {
            min_distance = min_distance.min(distance);
        }
        activity = activity.max(options.activity);
        config.services.insert(options.service);
    }

    config.accuracy = accuracy;
    config.min_distance = min_distance.is_finite().then_some(min_distance);
    config.activity = activity;
    config
}

/// Tracks the configuration last applied to the sensor
#[derive(Debug, Default)]
pub struct SettingsReconciler {
    last_applied: SensorConfiguration,
}

impl SettingsReconciler {
    /// Starts from the idle configuration, matching a freshly created sensor
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_applied(&self) -> &SensorConfiguration {
        &self.last_applied
    }

    /// Apply `config` unless it equals the last applied one
    ///
    /// Returns whether `update_settings` was called.
    pub fn apply_if_changed(&mut self, sensor: &dyn Sensor, config: SensorConfiguration) -> bool {
        if config == self.last_applied {
            debug!(sensor = sensor.name(), "settings unchanged, update ignored");
            return false;
        }

        info!(
            sensor = sensor.name(),
            accuracy = ?config.accuracy,
            min_distance = ?config.min_distance,
            activity = ?config.activity,
            services = ?config.services,
            "applying sensor settings"
        );
        sensor.update_settings(&config);
        self.last_applied = config;
        true
    }

    /// Forget the last applied configuration (sensor swapped)
    pub fn reset(&mut self) {
        self.last_applied = SensorConfiguration::idle();
    }
}
