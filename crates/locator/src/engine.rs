//! Engine - state owned by the actor task
//!
//! Every method runs on the actor; nothing here is shared.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use contracts::{
    Accuracy, AuthorizationMode, AuthorizationState, LocatorConfig, LocatorError, RequestId,
    Sensor, SensorConfiguration, SensorEvent, SubscriptionId, SubscriptionMode,
};

use crate::actor::{Command, Inbox, Launcher};
use crate::authorization::{AuthorizationGate, GateDecision};
use crate::dispatcher::{dispatch_failure, dispatch_readings, DispatchReport};
use crate::ip_lookup::IpRequest;
use crate::metrics::{LocatorMetrics, MetricsSnapshot};
use crate::queue::RequestQueue;
use crate::reconciler::{reconcile, SettingsReconciler};
use crate::request::{Delivery, LocationRequest, LocationResult, RequestState};
use crate::timeout::{Expiry, TimeoutManager};

const LOCATION: &str = "location";
const IP: &str = "ip";

/// One live-sensor request as seen by [`LocatorSnapshot`]
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSummary {
    pub id: RequestId,
    pub state: RequestState,
    pub accuracy: Accuracy,
    pub mode: SubscriptionMode,
    pub subscribers: usize,
    pub timeout_armed: bool,
}

/// One IP lookup as seen by [`LocatorSnapshot`]
#[derive(Debug, Clone, PartialEq)]
pub struct LookupSummary {
    pub id: RequestId,
    pub provider: String,
    pub state: RequestState,
}

/// Point-in-time view of the actor state
#[derive(Debug, Clone)]
pub struct LocatorSnapshot {
    /// Live-sensor requests in queue order
    pub requests: Vec<RequestSummary>,
    pub lookups: Vec<LookupSummary>,
    /// Configuration last applied to the sensor
    pub applied: SensorConfiguration,
    pub authorization: AuthorizationState,
    /// An authorization prompt is unanswered
    pub prompting: bool,
    pub armed_timeouts: usize,
    /// Incremented on every sensor swap
    pub epoch: u64,
    pub metrics: MetricsSnapshot,
}

impl LocatorSnapshot {
    /// Number of queued plus active live-sensor requests
    pub fn pending(&self) -> usize {
        self.requests.len()
    }

    pub fn active(&self) -> usize {
        self.requests
            .iter()
            .filter(|r| r.state == RequestState::Active)
            .count()
    }
}

pub(crate) struct LocatorCore {
    sensor: Arc<dyn Sensor>,
    epoch: u64,
    locations: RequestQueue<LocationRequest>,
    lookups: RequestQueue<IpRequest>,
    /// Queue revision the last reconciliation saw
    reconciled: u64,
    settings: SettingsReconciler,
    gate: AuthorizationGate,
    timeouts: TimeoutManager,
    metrics: Arc<LocatorMetrics>,
    inbox: Inbox,
    stopped: bool,
}

impl LocatorCore {
    pub(crate) fn new(
        sensor: Arc<dyn Sensor>,
        config: &LocatorConfig,
        metrics: Arc<LocatorMetrics>,
        inbox: Inbox,
    ) -> Self {
        let expiry_inbox = inbox.clone();
        let timeouts = TimeoutManager::new(Arc::new(move |expiry| {
            let _ = expiry_inbox.send(Command::Expired(expiry));
        }));

        let core = Self {
            sensor,
            epoch: 0,
            locations: RequestQueue::new(LOCATION)
                .with_observer(Box::new(observability::record_queue_depth)),
            lookups: RequestQueue::new(IP)
                .with_observer(Box::new(observability::record_queue_depth)),
            reconciled: 0,
            settings: SettingsReconciler::new(),
            gate: AuthorizationGate::new(config.declared_modes.clone()),
            timeouts,
            metrics,
            inbox,
            stopped: false,
        };
        core.attach_sensor();
        core
    }

    pub(crate) fn handle(&mut self, command: Command) -> ControlFlow<()> {
        match command {
            Command::Submit(request) => self.submit(request),
            Command::SubmitIp { request, launch } => self.submit_ip(request, launch),
            Command::Subscribe {
                request,
                subscription,
                tx,
            } => self.subscribe(request, subscription, tx),
            Command::Cancel(id) => self.cancel(id),
            Command::CancelSubscription {
                request,
                subscription,
            } => self.cancel_subscription(request, subscription),
            Command::Sensor { epoch, event } => self.on_sensor_event(epoch, event),
            Command::Authorization {
                epoch,
                state,
                prompted,
            } => self.on_authorization(epoch, state, prompted),
            Command::Expired(expiry) => self.on_expired(expiry),
            Command::IpFinished { id, result } => self.on_ip_finished(id, result),
            Command::SwapSensor(sensor) => self.swap_sensor(sensor),
            Command::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
            Command::Shutdown(ack) => {
                self.shutdown();
                if let Some(ack) = ack {
                    let _ = ack.send(());
                }
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    // ===== Facade commands =====

    fn submit(&mut self, request: LocationRequest) {
        info!(
            request_id = %request.id(),
            accuracy = ?request.options().accuracy,
            service = ?request.options().service,
            mode = ?request.options().mode,
            "request submitted"
        );
        self.metrics.inc_submitted();
        observability::record_request_submitted(LOCATION);
        self.locations.add(request);
        self.sync();
    }

    fn submit_ip(&mut self, request: IpRequest, launch: Launcher) {
        let id = request.id();
        info!(request_id = %id, provider = request.provider(), "ip lookup submitted");
        self.metrics.inc_submitted();
        observability::record_request_submitted(IP);
        self.lookups.add(request);
        if let Some(request) = self.lookups.get_mut(id) {
            request.attach(launch());
        }
    }

    fn subscribe(
        &mut self,
        id: RequestId,
        subscription: SubscriptionId,
        tx: mpsc::UnboundedSender<LocationResult>,
    ) {
        if let Some(request) = self.locations.get_mut(id) {
            request.subscribers_mut().add(subscription, tx);
        } else if let Some(request) = self.lookups.get_mut(id) {
            request.subscribers_mut().add(subscription, tx);
        } else {
            // dropping `tx` closes the new subscription right away
            debug!(request_id = %id, "subscribe to finished request");
        }
    }

    fn cancel(&mut self, id: RequestId) {
        if self.locations.remove(id).is_some() {
            info!(request_id = %id, "request cancelled");
            self.timeouts.cancel(id);
            self.finished(LOCATION, RequestState::Cancelled, None);
            self.sync();
        } else if self.lookups.remove(id).is_some() {
            info!(request_id = %id, "ip lookup cancelled");
            self.finished(IP, RequestState::Cancelled, None);
        } else {
            debug!(request_id = %id, "cancel for unknown request ignored");
        }
    }

    fn cancel_subscription(&mut self, id: RequestId, subscription: SubscriptionId) {
        let remaining = if let Some(request) = self.locations.get_mut(id) {
            request.subscribers_mut().remove(subscription);
            request.subscribers().len()
        } else if let Some(request) = self.lookups.get_mut(id) {
            request.subscribers_mut().remove(subscription);
            request.subscribers().len()
        } else {
            return;
        };

        debug!(request_id = %id, subscription = %subscription, remaining, "subscription released");
        if remaining == 0 {
            self.cancel(id);
        }
    }

    // ===== Sensor / timer callbacks =====

    #[instrument(level = "trace", name = "locator_sensor_event", skip(self, event))]
    fn on_sensor_event(&mut self, epoch: u64, event: SensorEvent) {
        if epoch != self.epoch {
            debug!(epoch, current = self.epoch, "event from detached sensor ignored");
            return;
        }

        let report = match event {
            SensorEvent::Success(readings) => {
                let report = dispatch_readings(&mut self.locations, &readings, Utc::now());
                if !report.delivered.is_empty() {
                    // A satisfying reading ends the wait of continuous requests too.
                    for id in &report.delivered {
                        self.timeouts.cancel(*id);
                        self.metrics.inc_readings_delivered();
                    }
                    observability::record_reading_delivered(report.delivered.len());
                }
                for (_, reason) in &report.discarded {
                    self.metrics.inc_readings_discarded();
                    observability::record_reading_discarded(reason.label());
                }
                report
            }
            SensorEvent::Failure(error) => {
                let status = self.sensor.authorization_status();
                dispatch_failure(&mut self.locations, &error, status)
            }
        };

        self.account(&report);
        self.sync();
    }

    fn on_authorization(
        &mut self,
        epoch: u64,
        state: AuthorizationState,
        prompted: Option<AuthorizationMode>,
    ) {
        if epoch != self.epoch {
            debug!(epoch, current = self.epoch, "authorization from detached sensor ignored");
            return;
        }
        match prompted {
            Some(mode) => self.gate.prompt_resolved(mode, state),
            None => self.gate.resolve_satisfied(state),
        }
        info!(state = ?state, prompted = ?prompted, "authorization changed");

        if state.is_denied() {
            let ids = self.locations.ids();
            self.fail_requests(&ids, LocatorError::AuthorizationDenied);
            self.sync();
            return;
        }

        if self.locations.iter().any(|r| covers(state, r)) {
            self.reconcile();
        } else {
            debug!(state = ?state, "authorization covers no pending request");
        }
    }

    fn on_expired(&mut self, expiry: Expiry) {
        let Some(duration) = self.timeouts.take_expired(expiry) else {
            return;
        };
        let id = expiry.id;
        let Some(request) = self.locations.get_mut(id) else {
            return;
        };
        if request.state().is_terminal() {
            return;
        }

        warn!(request_id = %id, timeout_ms = duration.as_millis() as u64, "request timed out");
        request.fail(LocatorError::Timeout(duration));
        self.locations.remove(id);
        self.metrics.inc_timed_out();
        observability::record_request_finished(LOCATION, "timeout");
        self.sync();
    }

    fn on_ip_finished(&mut self, id: RequestId, result: LocationResult) {
        let Some(request) = self.lookups.get_mut(id) else {
            debug!(request_id = %id, "result for cancelled ip lookup ignored");
            return;
        };
        let elapsed = request.submitted_at().elapsed();
        let state = match request.finish(result) {
            Delivery::Abandoned => RequestState::Cancelled,
            _ => request.state(),
        };
        self.lookups.remove(id);
        self.finished(IP, state, Some(elapsed));
    }

    // ===== Reconciliation =====

    /// Reconcile if the location queue changed since the last pass
    fn sync(&mut self) {
        if self.locations.revision() != self.reconciled {
            self.reconcile();
        }
    }

    /// Compute, gate and apply the shared configuration
    ///
    /// Requests the current status already covers are configured and
    /// activated right away; the gate only prompts for the rest. Loops
    /// while gating fails requests out of the queue, since each removal
    /// changes the configuration.
    #[instrument(
        level = "debug",
        name = "locator_reconcile",
        skip(self),
        fields(queued = self.locations.len())
    )]
    fn reconcile(&mut self) {
        loop {
            let config = reconcile(self.locations.iter().map(|r| r.options()));
            let Some(required) = config.required_authorization() else {
                self.apply(config);
                break;
            };

            let status = self.sensor.authorization_status();
            if !status.satisfies(required) && !status.is_denied() {
                let opted_out = AuthorizationGate::opted_out(status, self.locations.iter());
                if !opted_out.is_empty() {
                    self.fail_requests(&opted_out, LocatorError::AuthorizationNeeded);
                    continue;
                }
            }

            let decision = self.gate.evaluate(status, required);
            if decision == GateDecision::Denied {
                let ids = self.locations.ids();
                self.fail_requests(&ids, LocatorError::AuthorizationDenied);
                continue;
            }

            let covered = reconcile(
                self.locations
                    .iter()
                    .filter(|r| r.is_active() || covers(status, r))
                    .map(|r| r.options()),
            );
            self.apply(covered);
            self.activate_covered(status);

            if let GateDecision::Prompt(mode) = decision {
                self.prompt(mode);
            }
            break;
        }
        self.reconciled = self.locations.revision();
    }

    fn apply(&mut self, config: SensorConfiguration) {
        let applied = self.settings.apply_if_changed(self.sensor.as_ref(), config);
        if applied {
            self.metrics.inc_settings_applied();
        } else {
            self.metrics.inc_settings_ignored();
        }
        observability::record_settings_update(applied);
    }

    /// `Queued -> Active` for the requests `status` covers, arming their timers
    fn activate_covered(&mut self, status: AuthorizationState) {
        for request in self.locations.iter_mut() {
            if !covers(status, request) || !request.activate() {
                continue;
            }
            debug!(request_id = %request.id(), "request active");
            if let Some(timeout) = request.options().timeout {
                self.timeouts.arm(request.id(), timeout);
            }
        }
    }

    fn prompt(&mut self, mode: AuthorizationMode) {
        info!(mode = ?mode, sensor = self.sensor.name(), "requesting authorization");
        self.metrics.inc_authorization_prompts();
        observability::record_authorization_prompt(mode_label(mode));

        let inbox = self.inbox.clone();
        let epoch = self.epoch;
        self.sensor.request_authorization(
            mode,
            Arc::new(move |state| {
                let _ = inbox.send(Command::Authorization {
                    epoch,
                    state,
                    prompted: Some(mode),
                });
            }),
        );
    }

    /// Fail and remove `ids` in one batch
    fn fail_requests(&mut self, ids: &[RequestId], error: LocatorError) {
        if ids.is_empty() {
            return;
        }
        warn!(requests = ids.len(), error = %error, "failing requests");
        for id in ids {
            if let Some(request) = self.locations.get_mut(*id) {
                request.fail(error.clone());
            }
            self.timeouts.cancel(*id);
        }
        for request in self.locations.remove_many(ids) {
            observability::record_request_finished(LOCATION, error.label());
            match request.state() {
                RequestState::Cancelled => self.metrics.inc_cancelled(),
                _ => self.metrics.inc_failed(),
            }
        }
    }

    fn account(&mut self, report: &DispatchReport) {
        for resolved in &report.resolved {
            self.timeouts.cancel(resolved.id);
            self.finished(LOCATION, resolved.state, Some(resolved.elapsed));
        }
    }

    fn finished(&self, kind: &'static str, state: RequestState, elapsed: Option<Duration>) {
        match state {
            RequestState::Completed => {
                self.metrics.inc_completed();
                if let Some(elapsed) = elapsed {
                    observability::record_time_to_result(elapsed);
                }
            }
            RequestState::Cancelled => self.metrics.inc_cancelled(),
            _ => self.metrics.inc_failed(),
        }
        observability::record_request_finished(kind, state.label());
    }

    // ===== Sensor lifecycle =====

    fn attach_sensor(&self) {
        let epoch = self.epoch;
        let events = self.inbox.clone();
        let changes = self.inbox.clone();
        self.sensor.listen(
            Arc::new(move |event| {
                let _ = events.send(Command::Sensor { epoch, event });
            }),
            Arc::new(move |state| {
                let _ = changes.send(Command::Authorization {
                    epoch,
                    state,
                    prompted: None,
                });
            }),
        );
    }

    /// Idle the old sensor, cancel everything and attach `sensor`
    fn swap_sensor(&mut self, sensor: Arc<dyn Sensor>) {
        info!(from = self.sensor.name(), to = sensor.name(), "swapping sensor");
        self.apply(SensorConfiguration::idle());
        self.cancel_everything();

        self.settings.reset();
        self.gate.reset();
        self.epoch += 1;
        self.sensor = sensor;
        self.attach_sensor();
        self.reconciled = self.locations.revision();
    }

    fn cancel_everything(&mut self) {
        self.timeouts.cancel_all();
        for _ in self.locations.remove_all() {
            self.finished(LOCATION, RequestState::Cancelled, None);
        }
        for _ in self.lookups.remove_all() {
            self.finished(IP, RequestState::Cancelled, None);
        }
    }

    /// Cancel every request and idle the sensor; idempotent
    pub(crate) fn shutdown(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        info!(
            requests = self.locations.len(),
            lookups = self.lookups.len(),
            "Locator shutting down"
        );
        self.cancel_everything();
        self.apply(SensorConfiguration::idle());
        self.reconciled = self.locations.revision();
    }

    pub(crate) fn snapshot(&self) -> LocatorSnapshot {
        LocatorSnapshot {
            requests: self
                .locations
                .iter()
                .map(|r| RequestSummary {
                    id: r.id(),
                    state: r.state(),
                    accuracy: r.options().accuracy,
                    mode: r.options().mode,
                    subscribers: r.subscribers().len(),
                    timeout_armed: self.timeouts.is_armed(r.id()),
                })
                .collect(),
            lookups: self
                .lookups
                .iter()
                .map(|r| LookupSummary {
                    id: r.id(),
                    provider: r.provider().to_string(),
                    state: r.state(),
                })
                .collect(),
            applied: self.settings.last_applied().clone(),
            authorization: self.sensor.authorization_status(),
            prompting: self.gate.is_prompting(),
            armed_timeouts: self.timeouts.armed_count(),
            epoch: self.epoch,
            metrics: self.metrics.snapshot(),
        }
    }
}

/// Whether `status` covers a still pending `request`
fn covers(status: AuthorizationState, request: &LocationRequest) -> bool {
    request.is_pending() && status.satisfies(request.options().required_authorization())
}

fn mode_label(mode: AuthorizationMode) -> &'static str {
    match mode {
        AuthorizationMode::WhenInUse => "when_in_use",
        AuthorizationMode::Always => "always",
    }
}
