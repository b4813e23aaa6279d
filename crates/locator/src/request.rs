//! Request - a single consumer's declared intent and its subscribers

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::trace;

use contracts::{
    Coordinate, DiscardReason, LocatorError, Reading, RequestId, RequestOptions, SubscriptionId,
};

use crate::queue::QueueMember;

/// What a subscriber receives
pub type LocationResult = Result<Reading, LocatorError>;

/// Request lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestState {
    /// Created, not yet enqueued
    Idle,
    /// Enqueued, waiting for authorization / configuration
    Queued,
    /// Configuration applied, eligible for dispatch
    Active,
    Completed,
    Failed,
    Cancelled,
}

impl RequestState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Label used in logs and metrics
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Queued => "queued",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Result of handing one event to one request
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    /// Reading ignored, request keeps waiting
    Discarded(DiscardReason),
    /// Delivered to a continuous request that stays active
    Delivered,
    /// Delivered, request completed
    Completed,
    /// Error delivered, request failed
    Failed,
    /// Every subscriber is gone, request cancelled
    Abandoned,
}

impl Delivery {
    /// Whether the request must leave its queue
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Abandoned)
    }
}

struct Subscriber {
    id: SubscriptionId,
    tx: mpsc::UnboundedSender<LocationResult>,
}

/// Ordered subscriber tokens of one request
#[derive(Default)]
pub struct Subscribers {
    list: Vec<Subscriber>,
}

impl Subscribers {
    pub fn add(&mut self, id: SubscriptionId, tx: mpsc::UnboundedSender<LocationResult>) {
        self.list.push(Subscriber { id, tx });
    }

    /// Release one token; dropping its sender closes the subscription
    pub fn remove(&mut self, id: SubscriptionId) -> bool {
        let before = self.list.len();
        self.list.retain(|s| s.id != id);
        self.list.len() != before
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Send to every subscriber, releasing those whose receiver is gone
    ///
    /// Returns how many subscribers remain.
    pub fn send(&mut self, result: &LocationResult) -> usize {
        self.list.retain(|s| s.tx.send(result.clone()).is_ok());
        self.list.len()
    }

    /// Drop every sender so receivers observe the end of the stream
    pub fn close(&mut self) {
        self.list.clear();
    }
}

/// Live-sensor request
pub struct LocationRequest {
    id: RequestId,
    options: RequestOptions,
    state: RequestState,
    subscribers: Subscribers,
    /// Distance reference for the minimum-distance filter
    last_accepted: Option<Coordinate>,
    submitted_at: Instant,
}

impl LocationRequest {
    pub fn new(id: RequestId, options: RequestOptions) -> Self {
        Self {
            id,
            options,
            state: RequestState::Idle,
            subscribers: Subscribers::default(),
            last_accepted: None,
            submitted_at: Instant::now(),
        }
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn options(&self) -> &RequestOptions {
        &self.options
    }

    pub fn state(&self) -> RequestState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == RequestState::Active
    }

    /// Waiting for authorization or configuration
    pub fn is_pending(&self) -> bool {
        matches!(self.state, RequestState::Idle | RequestState::Queued)
    }

    pub fn submitted_at(&self) -> Instant {
        self.submitted_at
    }

    pub fn subscribers(&self) -> &Subscribers {
        &self.subscribers
    }

    pub fn subscribers_mut(&mut self) -> &mut Subscribers {
        &mut self.subscribers
    }

    /// `Queued -> Active`; returns false for any other state
    pub fn activate(&mut self) -> bool {
        if self.state == RequestState::Queued {
            self.state = RequestState::Active;
            true
        } else {
            false
        }
    }

    /// Check a reading against this request's filters
    pub fn evaluate(&self, reading: &Reading, now: DateTime<Utc>) -> Option<DiscardReason> {
        if let Some(max_age) = self.options.max_age {
            let age = reading.age(now);
            if age > max_age {
                return Some(DiscardReason::Stale { age, max_age });
            }
        }

        if !self.options.accuracy.accepts(reading.horizontal_accuracy) {
            return Some(DiscardReason::TooCoarse {
                horizontal_accuracy: reading.horizontal_accuracy,
                required: self.options.accuracy.tolerance_meters().unwrap_or(f64::INFINITY),
            });
        }

        if let (Some(required), Some(last)) = (self.options.min_distance, self.last_accepted) {
            let moved = last.distance_to(&reading.coordinate);
            if moved < required {
                return Some(DiscardReason::BelowMinDistance { moved, required });
            }
        }

        None
    }

    /// Offer a reading
    pub fn receive_reading(&mut self, reading: &Reading, now: DateTime<Utc>) -> Delivery {
        if let Some(reason) = self.evaluate(reading, now) {
            trace!(request_id = %self.id, reason = ?reason, "reading discarded");
            return Delivery::Discarded(reason);
        }

        self.last_accepted = Some(reading.coordinate);
        if self.subscribers.send(&Ok(reading.clone())) == 0 {
            return self.abandon();
        }

        if self.options.is_continuous() {
            self.state = RequestState::Active;
            Delivery::Delivered
        } else {
            self.state = RequestState::Completed;
            self.subscribers.close();
            Delivery::Completed
        }
    }

    /// Offer a failure
    ///
    /// Continuous requests survive recoverable sensor failures; everything
    /// else is terminal.
    pub fn receive_error(&mut self, error: &LocatorError) -> Delivery {
        let recoverable = matches!(error, LocatorError::SensorFailure(e) if e.is_recoverable());
        if recoverable && self.options.is_continuous() {
            if self.subscribers.send(&Err(error.clone())) == 0 {
                return self.abandon();
            }
            return Delivery::Delivered;
        }
        self.fail(error.clone())
    }

    /// Terminal failure
    pub fn fail(&mut self, error: LocatorError) -> Delivery {
        if self.state.is_terminal() {
            return Delivery::Failed;
        }
        self.state = match error {
            LocatorError::Cancelled => RequestState::Cancelled,
            _ => RequestState::Failed,
        };
        self.subscribers.send(&Err(error));
        self.subscribers.close();
        Delivery::Failed
    }

    fn abandon(&mut self) -> Delivery {
        self.state = RequestState::Cancelled;
        self.subscribers.close();
        Delivery::Abandoned
    }
}

impl QueueMember for LocationRequest {
    fn id(&self) -> RequestId {
        self.id
    }

    fn on_joined(&mut self) {
        if self.state == RequestState::Idle {
            self.state = RequestState::Queued;
        }
    }

    fn on_left(&mut self) {
        if !self.state.is_terminal() {
            self.fail(LocatorError::Cancelled);
        }
    }
}
