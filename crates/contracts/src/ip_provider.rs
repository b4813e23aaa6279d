//! IpLocationProvider trait - one-shot coarse lookup that bypasses the sensor

use crate::{LocatorError, Reading};

/// IP geolocation provider
///
/// The network client itself lives outside this workspace; implementations
/// only need to resolve to a `Reading` (with `ReadingSource::Ip`) or an error.
#[trait_variant::make(IpLocationProvider: Send)]
pub trait LocalIpLocationProvider {
    /// Provider name (used for logging)
    fn name(&self) -> &str;

    /// Resolve the current public address to a position
    ///
    /// # Errors
    /// Returns `LocatorError::LookupFailed` with provider context
    async fn locate(&self) -> Result<Reading, LocatorError>;
}
