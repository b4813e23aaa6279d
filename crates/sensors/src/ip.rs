//! IP lookup providers
//!
//! Network clients are out of scope; these providers answer from fixed data
//! so the lookup path can be exercised end to end.

use std::time::Duration;

use contracts::{Coordinate, IpLocationProvider, LocatorError, Reading, ReadingSource};
use tracing::debug;

/// City-level error reported for IP-derived positions
const IP_HORIZONTAL_ACCURACY: f64 = 5_000.0;

/// Provider answering with a fixed coordinate, optionally after a delay
#[derive(Debug, Clone)]
pub struct StaticIpProvider {
    name: String,
    coordinate: Coordinate,
    delay: Duration,
}

impl StaticIpProvider {
    pub fn new(name: impl Into<String>, coordinate: Coordinate) -> Self {
        Self {
            name: name.into(),
            coordinate,
            delay: Duration::ZERO,
        }
    }

    /// Simulate network latency
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl IpLocationProvider for StaticIpProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn locate(&self) -> Result<Reading, LocatorError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        debug!(provider = %self.name, "static ip lookup resolved");
        Ok(Reading::now(self.coordinate, IP_HORIZONTAL_ACCURACY).with_source(ReadingSource::Ip))
    }
}

/// Provider that always fails
#[derive(Debug, Clone)]
pub struct FailingIpProvider {
    name: String,
    message: String,
}

impl FailingIpProvider {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }
}

impl IpLocationProvider for FailingIpProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn locate(&self) -> Result<Reading, LocatorError> {
        Err(LocatorError::lookup_failed(&self.name, &self.message))
    }
}
