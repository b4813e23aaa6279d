//! # Sensors
//!
//! `Sensor` and `IpLocationProvider` implementations.
//!
//! Responsibilities:
//! - Deterministic scripted sensor for tests (records every call, emits on demand)
//! - Simulated sensor emitting readings from a background thread
//! - Static / failing IP providers for the network lookup path

pub mod ip;
pub mod scripted;
pub mod simulated;

pub use contracts::{IpLocationProvider, Sensor};
pub use ip::{FailingIpProvider, StaticIpProvider};
pub use scripted::ScriptedSensor;
pub use simulated::SimulatedSensor;
