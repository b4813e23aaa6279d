//! Scenario statistics.

use std::time::Duration;

use locator::MetricsSnapshot;
use observability::RequestStatsAggregator;
use tracing::{debug, trace};

use super::runner::ScenarioEvent;

/// Statistics from a scenario run
#[derive(Debug, Clone, Default)]
pub struct ScenarioStats {
    /// Sensor requests accepted by the locator
    pub requests_submitted: u64,

    /// IP lookups accepted by the locator
    pub lookups_submitted: u64,

    /// Requests still queued or active when the run stopped
    pub still_pending: usize,

    /// Total duration of the run
    pub duration: Duration,

    /// Locator counters taken right before shutdown
    pub metrics: MetricsSnapshot,

    /// Outcomes and time to first result
    pub aggregator: RequestStatsAggregator,
}

impl ScenarioStats {
    pub(crate) fn record(&mut self, event: &ScenarioEvent) {
        match event {
            ScenarioEvent::Reading { request, elapsed } => {
                trace!(request_id = %request, "reading delivered");
                self.aggregator.record_reading(*elapsed);
            }
            ScenarioEvent::Finished { request, outcome } => {
                debug!(request_id = %request, outcome = *outcome, "request finished");
                self.aggregator.record_outcome(outcome);
            }
        }
    }

    /// Readings delivered per second
    pub fn readings_per_second(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.aggregator.readings as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Share of finished requests that completed, as percentage
    pub fn completion_rate(&self) -> f64 {
        let finished: u64 = self.aggregator.outcomes.values().sum();
        let completed = self
            .aggregator
            .outcomes
            .get("completed")
            .copied()
            .unwrap_or(0);
        if finished > 0 {
            (completed as f64 / finished as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Scenario Statistics                       ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Requests submitted: {}", self.requests_submitted);
        println!("   ├─ IP lookups submitted: {}", self.lookups_submitted);
        println!("   ├─ Readings delivered: {}", self.aggregator.readings);
        println!("   ├─ Readings/s: {:.2}", self.readings_per_second());
        println!("   └─ Pending at stop: {}", self.still_pending);

        let summary = self.aggregator.summary();
        if !summary.outcomes.is_empty() {
            println!("\n🎯 Outcomes ({:.1}% completed)", self.completion_rate());
            let last = summary.outcomes.len() - 1;
            for (i, (outcome, count)) in summary.outcomes.iter().enumerate() {
                let prefix = if i == last { "└─" } else { "├─" };
                println!("   {} {}: {}", prefix, outcome, count);
            }
        }

        println!("\n⏱️  Time to first reading (ms)");
        println!("   └─ {}", summary.latency_ms);

        let m = &self.metrics;
        println!("\n📈 Locator Counters");
        println!("   ├─ Readings discarded: {}", m.readings_discarded);
        println!("   ├─ Timed out: {}", m.timed_out);
        println!(
            "   ├─ Settings applied / ignored: {} / {}",
            m.settings_applied, m.settings_ignored
        );
        println!("   └─ Authorization prompts: {}", m.authorization_prompts);

        println!();
    }
}
