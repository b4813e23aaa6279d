//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the workspace.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Readings carry wall-clock UTC timestamps (`chrono::DateTime<Utc>`)
//! - Durations in configuration files are expressed in milliseconds

mod authorization;
mod blueprint;
mod error;
mod ip_provider;
mod options;
mod reading;
mod request_id;
mod sensor;
mod sensor_config;
pub mod serde_ms;

pub use authorization::*;
pub use blueprint::*;
pub use error::*;
pub use ip_provider::{IpLocationProvider, LocalIpLocationProvider};
pub use options::*;
pub use reading::*;
pub use request_id::{RequestId, SubscriptionId};
pub use sensor::{AuthorizationCallback, Sensor, SensorEvent, SensorEventCallback};
pub use sensor_config::SensorConfiguration;
