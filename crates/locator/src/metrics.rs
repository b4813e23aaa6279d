//! Locator metrics for observability

use std::sync::atomic::{AtomicU64, Ordering};

/// In-process counters shared between the actor and its handles
#[derive(Debug, Default)]
pub struct LocatorMetrics {
    /// Requests accepted by `submit` / `lookup_ip`
    submitted: AtomicU64,
    /// Requests that delivered their final reading
    completed: AtomicU64,
    /// Requests that ended with an error other than timeout
    failed: AtomicU64,
    /// Requests cancelled explicitly or by shutdown
    cancelled: AtomicU64,
    /// Requests failed by their timer
    timed_out: AtomicU64,
    /// Readings accepted by a request
    readings_delivered: AtomicU64,
    /// Readings a request ignored
    readings_discarded: AtomicU64,
    /// `update_settings` calls
    settings_applied: AtomicU64,
    /// Reconciliations that produced the configuration already applied
    settings_ignored: AtomicU64,
    /// Authorization prompts issued
    authorization_prompts: AtomicU64,
}

impl LocatorMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_cancelled(&self) {
        self.cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_timed_out(&self) {
        self.timed_out.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_readings_delivered(&self) {
        self.readings_delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_readings_discarded(&self) {
        self.readings_discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_settings_applied(&self) {
        self.settings_applied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_settings_ignored(&self) {
        self.settings_ignored.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_authorization_prompts(&self) {
        self.authorization_prompts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            timed_out: self.timed_out.load(Ordering::Relaxed),
            readings_delivered: self.readings_delivered.load(Ordering::Relaxed),
            readings_discarded: self.readings_discarded.load(Ordering::Relaxed),
            settings_applied: self.settings_applied.load(Ordering::Relaxed),
            settings_ignored: self.settings_ignored.load(Ordering::Relaxed),
            authorization_prompts: self.authorization_prompts.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of locator metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub submitted: u64,
    pub completed: u64,
    pub failed: u64,
    pub cancelled: u64,
    pub timed_out: u64,
    pub readings_delivered: u64,
    pub readings_discarded: u64,
    pub settings_applied: u64,
    pub settings_ignored: u64,
    pub authorization_prompts: u64,
}

impl MetricsSnapshot {
    /// Requests that reached a terminal state
    pub fn finished(&self) -> u64 {
        self.completed + self.failed + self.cancelled + self.timed_out
    }
}
