//! Dispatcher - fan-out of sensor events to active requests

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, instrument, warn};

use contracts::{AuthorizationState, DiscardReason, LocatorError, Reading, RequestId, SensorError};

use crate::queue::RequestQueue;
use crate::request::{Delivery, LocationRequest, RequestState};

/// A request that left the queue during dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    pub id: RequestId,
    pub state: RequestState,
    /// Time since submission
    pub elapsed: Duration,
}

/// Outcome of one dispatch pass
#[derive(Debug, Default)]
pub struct DispatchReport {
    /// Requests that accepted the reading or received the failure
    pub delivered: Vec<RequestId>,
    /// Requests that ignored the reading, with the reason
    pub discarded: Vec<(RequestId, DiscardReason)>,
    /// Requests that reached a terminal state and left the queue
    pub resolved: Vec<Resolved>,
}

impl DispatchReport {
    pub fn is_empty(&self) -> bool {
        self.delivered.is_empty() && self.discarded.is_empty() && self.resolved.is_empty()
    }
}

/// Most recent reading of a batch; the first one wins ties
pub fn most_recent(readings: &[Reading]) -> Option<&Reading> {
    readings.iter().fold(None, |best: Option<&Reading>, r| match best {
        Some(b) if b.timestamp >= r.timestamp => Some(b),
        _ => Some(r),
    })
}

/// Deliver the most recent reading of a batch to every active request
#[instrument(
    level = "trace",
    name = "dispatch_readings",
    skip(queue, readings),
    fields(batch = readings.len(), queued = queue.len())
)]
pub fn dispatch_readings(
    queue: &mut RequestQueue<LocationRequest>,
    readings: &[Reading],
    now: DateTime<Utc>,
) -> DispatchReport {
    let mut report = DispatchReport::default();
    let Some(reading) = most_recent(readings) else {
        debug!("empty reading batch");
        return report;
    };

    for id in active_ids(queue) {
        let Some(request) = queue.get_mut(id) else {
            continue;
        };
        match request.receive_reading(reading, now) {
            Delivery::Discarded(reason) => {
                debug!(request_id = %id, reason = reason.label(), "reading discarded");
                report.discarded.push((id, reason));
            }
            Delivery::Delivered => report.delivered.push(id),
            delivery => {
                if delivery == Delivery::Completed {
                    report.delivered.push(id);
                }
                report.resolved.push(Resolved {
                    id,
                    state: request.state(),
                    elapsed: request.submitted_at().elapsed(),
                });
            }
        }
    }

    remove_resolved(queue, &report);
    report
}

/// Deliver a driver failure
///
/// Authorization failures only reach requests whose own requirement is not
/// covered by `status`, as `AuthorizationDenied`.
#[instrument(
    level = "trace",
    name = "dispatch_failure",
    skip(queue, error),
    fields(kind = ?error.kind, queued = queue.len())
)]
pub fn dispatch_failure(
    queue: &mut RequestQueue<LocationRequest>,
    error: &SensorError,
    status: AuthorizationState,
) -> DispatchReport {
    let mut report = DispatchReport::default();
    let authorization = error.is_authorization();
    let failure = if authorization {
        LocatorError::AuthorizationDenied
    } else {
        LocatorError::SensorFailure(error.clone())
    };
    warn!(error = %error, "sensor failure");

    for id in active_ids(queue) {
        let Some(request) = queue.get_mut(id) else {
            continue;
        };
        if authorization && status.satisfies(request.options().required_authorization()) {
            continue;
        }
        match request.receive_error(&failure) {
            Delivery::Delivered => report.delivered.push(id),
            Delivery::Discarded(_) => {}
            _ => {
                report.delivered.push(id);
                report.resolved.push(Resolved {
                    id,
                    state: request.state(),
                    elapsed: request.submitted_at().elapsed(),
                });
            }
        }
    }

    remove_resolved(queue, &report);
    report
}

fn active_ids(queue: &RequestQueue<LocationRequest>) -> Vec<RequestId> {
    queue
        .iter()
        .filter(|r| r.is_active())
        .map(|r| r.id())
        .collect()
}

fn remove_resolved(queue: &mut RequestQueue<LocationRequest>, report: &DispatchReport) {
    if report.resolved.is_empty() {
        return;
    }
    let ids: Vec<RequestId> = report.resolved.iter().map(|r| r.id).collect();
    queue.remove_many(&ids);
}
