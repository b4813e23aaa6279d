//! Scenario runner - drives one locator against the simulated sensor.
//!
//! Every configured request gets a watcher task that forwards its results to
//! the runner loop; the loop stops once every request resolved, the reading
//! budget is spent, or the duration limit expires.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use contracts::{IpLookupOptions, LocatorBlueprint, RequestId};
use locator::{Locator, RequestHandle};
use sensors::{SimulatedSensor, StaticIpProvider};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::ScenarioStats;

/// Scenario configuration
#[derive(Debug, Clone)]
pub struct ScenarioConfig {
    /// The locator blueprint
    pub blueprint: LocatorBlueprint,

    /// Stop after this many delivered readings (None = unlimited)
    pub max_readings: Option<u64>,

    /// Scenario duration limit (None = until every request resolves)
    pub duration: Option<Duration>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,

    /// Run one IP lookup next to the sensor requests
    pub ip_lookup: bool,
}

/// What a watcher task reports back
#[derive(Debug)]
pub(crate) enum ScenarioEvent {
    Reading {
        request: RequestId,
        elapsed: Option<Duration>,
    },
    Finished {
        request: RequestId,
        outcome: &'static str,
    },
}

/// Scenario orchestrator
pub struct Scenario {
    config: ScenarioConfig,
}

impl Scenario {
    pub fn new(config: ScenarioConfig) -> Self {
        Self { config }
    }

    /// Run the scenario to completion
    pub async fn run(self) -> Result<ScenarioStats> {
        let started = Instant::now();
        let blueprint = &self.config.blueprint;

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        let sensor = Arc::new(SimulatedSensor::new(blueprint.simulator.clone()));
        let locator = Locator::new(sensor, blueprint.locator.clone());
        let mut stats = ScenarioStats::default();
        let (events_tx, mut events_rx) = mpsc::unbounded_channel();

        for options in &blueprint.requests {
            match locator.submit(options.clone()) {
                Ok(handle) => {
                    debug!(request_id = %handle.id(), accuracy = ?options.accuracy, "request submitted");
                    stats.requests_submitted += 1;
                    watch(handle, events_tx.clone());
                }
                Err(e) => {
                    warn!(error = %e, "request rejected");
                    stats.aggregator.record_outcome(e.label());
                }
            }
        }

        if self.config.ip_lookup {
            let provider = Arc::new(StaticIpProvider::new("simulated", blueprint.simulator.start));
            match locator.lookup_ip(provider, IpLookupOptions::default()) {
                Ok(handle) => {
                    stats.lookups_submitted += 1;
                    watch(handle, events_tx.clone());
                }
                Err(e) => {
                    warn!(error = %e, "ip lookup rejected");
                    stats.aggregator.record_outcome(e.label());
                }
            }
        }
        drop(events_tx);

        info!(
            requests = stats.requests_submitted,
            lookups = stats.lookups_submitted,
            "Scenario started"
        );

        let deadline = self.config.duration.map(|d| tokio::time::Instant::now() + d);
        loop {
            let event = match deadline {
                Some(deadline) => tokio::select! {
                    event = events_rx.recv() => event,
                    _ = tokio::time::sleep_until(deadline) => {
                        info!("Duration limit reached");
                        break;
                    }
                },
                None => events_rx.recv().await,
            };
            let Some(event) = event else {
                info!("Every request resolved");
                break;
            };
            stats.record(&event);
            if self
                .config
                .max_readings
                .is_some_and(|max| stats.aggregator.readings >= max)
            {
                info!(readings = stats.aggregator.readings, "Reading budget spent");
                break;
            }
        }

        if let Some(snapshot) = locator.snapshot().await {
            stats.metrics = snapshot.metrics;
            stats.still_pending = snapshot.requests.len() + snapshot.lookups.len();
        }
        locator.shutdown().await;

        // Requests cut short by the shutdown report their cancellation here.
        while let Some(event) = events_rx.recv().await {
            stats.record(&event);
        }

        stats.duration = started.elapsed();
        Ok(stats)
    }
}

/// Forward the results of one request to the runner loop
fn watch(mut handle: RequestHandle, events: mpsc::UnboundedSender<ScenarioEvent>) {
    let request = handle.id();
    tokio::spawn(async move {
        let started = Instant::now();
        let mut first = true;
        let mut outcome = "cancelled";
        while let Some(result) = handle.recv().await {
            match result {
                Ok(_) => {
                    let elapsed = first.then(|| started.elapsed());
                    first = false;
                    outcome = "completed";
                    if events.send(ScenarioEvent::Reading { request, elapsed }).is_err() {
                        return;
                    }
                }
                Err(e) => outcome = e.label(),
            }
        }
        let _ = events.send(ScenarioEvent::Finished { request, outcome });
    });
}
