//! TimeoutManager - one independent timer per active request
//!
//! Timers run as detached tokio tasks that only post an [`Expiry`] back to the
//! owner; the owner decides whether the request is still live. A generation
//! counter lets the owner ignore expiries from timers it already replaced.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::trace;

use contracts::RequestId;

/// Timer fired for `id`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expiry {
    pub id: RequestId,
    pub generation: u64,
}

/// Where expiries are posted
pub type ExpiryCallback = Arc<dyn Fn(Expiry) + Send + Sync>;

struct Armed {
    generation: u64,
    duration: Duration,
    task: JoinHandle<()>,
}

pub struct TimeoutManager {
    on_expiry: ExpiryCallback,
    armed: HashMap<RequestId, Armed>,
    generation: u64,
}

impl TimeoutManager {
    pub fn new(on_expiry: ExpiryCallback) -> Self {
        Self {
            on_expiry,
            armed: HashMap::new(),
            generation: 0,
        }
    }

    /// Start (or restart) the timer for `id`
    pub fn arm(&mut self, id: RequestId, duration: Duration) {
        self.cancel(id);
        self.generation += 1;
        let expiry = Expiry {
            id,
            generation: self.generation,
        };
        let on_expiry = self.on_expiry.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            on_expiry(expiry);
        });
        trace!(request_id = %id, timeout_ms = duration.as_millis() as u64, "timeout armed");
        self.armed.insert(
            id,
            Armed {
                generation: self.generation,
                duration,
                task,
            },
        );
    }

    /// Cancel the timer for `id`; returns whether one was armed
    pub fn cancel(&mut self, id: RequestId) -> bool {
        match self.armed.remove(&id) {
            Some(armed) => {
                armed.task.abort();
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&mut self) {
        for (_, armed) in self.armed.drain() {
            armed.task.abort();
        }
    }

    pub fn is_armed(&self, id: RequestId) -> bool {
        self.armed.contains_key(&id)
    }

    pub fn armed_count(&self) -> usize {
        self.armed.len()
    }

    /// Claim a fired timer
    ///
    /// Returns the armed duration if `expiry` belongs to the current timer of
    /// its request, `None` for cancelled or replaced timers.
    pub fn take_expired(&mut self, expiry: Expiry) -> Option<Duration> {
        match self.armed.get(&expiry.id) {
            Some(armed) if armed.generation == expiry.generation => {
                self.armed.remove(&expiry.id).map(|armed| armed.duration)
            }
            _ => None,
        }
    }
}

impl Drop for TimeoutManager {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
