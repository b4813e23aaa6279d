//! IP lookup path - one-shot coarse positions that bypass the sensor
//!
//! Lookups live in their own queue and never take part in reconciliation.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use contracts::{IpLocationProvider, LocatorError, ReadingSource, RequestId};

use crate::queue::QueueMember;
use crate::request::{Delivery, LocationResult, RequestState, Subscribers};

/// A running IP lookup
pub struct IpRequest {
    id: RequestId,
    provider: String,
    timeout: Duration,
    state: RequestState,
    subscribers: Subscribers,
    task: Option<JoinHandle<()>>,
    submitted_at: Instant,
}

impl IpRequest {
    pub fn new(id: RequestId, provider: impl Into<String>, timeout: Duration) -> Self {
        Self {
            id,
            provider: provider.into(),
            timeout,
            state: RequestState::Idle,
            subscribers: Subscribers::default(),
            task: None,
            submitted_at: Instant::now(),
        }
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn state(&self) -> RequestState {
        self.state
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

    /// Attach the lookup task; aborted if the request leaves early
    pub fn attach(&mut self, task: JoinHandle<()>) {
        self.state = RequestState::Active;
        self.task = Some(task);
    }

    /// Deliver the lookup outcome; always terminal
    pub fn finish(&mut self, result: LocationResult) -> Delivery {
        if self.state.is_terminal() {
            return Delivery::Failed;
        }
        self.task = None;
        let ok = result.is_ok();
        self.state = if ok {
            RequestState::Completed
        } else {
            RequestState::Failed
        };
        let remaining = self.subscribers.send(&result);
        self.subscribers.close();
        match (ok, remaining) {
            (_, 0) => Delivery::Abandoned,
            (true, _) => Delivery::Completed,
            (false, _) => Delivery::Failed,
        }
    }
}

impl QueueMember for IpRequest {
    fn id(&self) -> RequestId {
        self.id
    }

    fn on_joined(&mut self) {
        if self.state == RequestState::Idle {
            self.state = RequestState::Queued;
        }
    }

    fn on_left(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        if !self.state.is_terminal() {
            self.state = RequestState::Cancelled;
            self.subscribers.send(&Err(LocatorError::Cancelled));
            self.subscribers.close();
        }
    }
}

/// Run `provider` under `timeout` and hand the outcome to `on_finished`
pub fn spawn_lookup<P, F>(
    provider: Arc<P>,
    id: RequestId,
    timeout: Duration,
    on_finished: F,
) -> JoinHandle<()>
where
    P: IpLocationProvider + Sync + 'static,
    F: FnOnce(RequestId, LocationResult) + Send + 'static,
{
    tokio::spawn(async move {
        let result = match tokio::time::timeout(timeout, provider.locate()).await {
            Ok(Ok(reading)) => {
                debug!(request_id = %id, provider = provider.name(), "ip lookup resolved");
                Ok(reading.with_source(ReadingSource::Ip))
            }
            Ok(Err(e)) => {
                warn!(request_id = %id, provider = provider.name(), error = %e, "ip lookup failed");
                Err(e)
            }
            Err(_) => {
                warn!(request_id = %id, provider = provider.name(), "ip lookup timed out");
                Err(LocatorError::Timeout(timeout))
            }
        };
        on_finished(id, result);
    })
}
