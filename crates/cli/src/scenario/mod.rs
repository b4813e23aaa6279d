//! Scenario orchestration and statistics.

pub(crate) mod runner;
mod stats;

pub use runner::{Scenario, ScenarioConfig};
pub use stats::ScenarioStats;
