//! Locator facade - the only entry point for callers
//!
//! Every call turns into a [`Command`] for the actor and returns without
//! waiting for it to be processed.

use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument};

use contracts::{
    AuthorizationState, IpLocationProvider, IpLookupOptions, LocatorConfig, LocatorError,
    RequestId, RequestOptions, Sensor, SubscriptionId,
};

use crate::actor::{self, Command};
use crate::engine::{LocatorCore, LocatorSnapshot};
use crate::ip_lookup::{spawn_lookup, IpRequest};
use crate::metrics::{LocatorMetrics, MetricsSnapshot};
use crate::request::{LocationRequest, LocationResult};

/// Arbiter for one shared sensor
///
/// Must be created inside a tokio runtime. Dropping it shuts the actor down,
/// cancelling every outstanding request.
pub struct Locator {
    tx: mpsc::UnboundedSender<Command>,
    sensor: Arc<RwLock<Arc<dyn Sensor>>>,
    config: LocatorConfig,
    metrics: Arc<LocatorMetrics>,
    worker: Option<JoinHandle<()>>,
}

impl Locator {
    /// Spawn the actor for `sensor`
    pub fn new(sensor: Arc<dyn Sensor>, config: LocatorConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let metrics = Arc::new(LocatorMetrics::new());
        let core = LocatorCore::new(sensor.clone(), &config, metrics.clone(), tx.clone());
        let worker = tokio::spawn(actor::run(core, rx));

        info!(sensor = sensor.name(), "Locator created");
        Self {
            tx,
            sensor: Arc::new(RwLock::new(sensor)),
            config,
            metrics,
            worker: Some(worker),
        }
    }

    /// Submit a live-sensor request
    ///
    /// The configured default timeout applies when `options` declares none.
    ///
    /// # Errors
    /// `InvalidOptions` when the options are rejected; `Cancelled` when the
    /// locator has already shut down.
    #[instrument(
        name = "locator_submit",
        skip(self, options),
        fields(accuracy = ?options.accuracy, mode = ?options.mode)
    )]
    pub fn submit(&self, mut options: RequestOptions) -> Result<RequestHandle, LocatorError> {
        options.validate()?;
        if options.timeout.is_none() {
            options.timeout = self.config.default_timeout;
        }

        let id = RequestId::next();
        let mut request = LocationRequest::new(id, options);
        let (subscription, tx) = Subscription::open(id, self.tx.clone());
        request.subscribers_mut().add(subscription.id(), tx);

        self.send(Command::Submit(request))?;
        Ok(RequestHandle::new(id, self.tx.clone(), subscription))
    }

    /// Start a one-shot IP lookup through `provider`
    ///
    /// # Errors
    /// `InvalidOptions` for a zero timeout; `Cancelled` after shutdown.
    #[instrument(name = "locator_lookup_ip", skip(self, provider, options))]
    pub fn lookup_ip<P>(
        &self,
        provider: Arc<P>,
        options: IpLookupOptions,
    ) -> Result<RequestHandle, LocatorError>
    where
        P: IpLocationProvider + Sync + 'static,
    {
        let timeout = options.timeout.unwrap_or(self.config.ip_lookup_timeout);
        if timeout.is_zero() {
            return Err(LocatorError::invalid_options("timeout", "must be > 0"));
        }

        let id = RequestId::next();
        let mut request = IpRequest::new(id, provider.name(), timeout);
        let (subscription, tx) = Subscription::open(id, self.tx.clone());
        request.subscribers_mut().add(subscription.id(), tx);

        let inbox = self.tx.clone();
        let launch = Box::new(move || {
            spawn_lookup(provider, id, timeout, move |id, result| {
                let _ = inbox.send(Command::IpFinished { id, result });
            })
        });

        self.send(Command::SubmitIp { request, launch })?;
        Ok(RequestHandle::new(id, self.tx.clone(), subscription))
    }

    /// Cancel a request; its subscribers receive `Cancelled`
    pub fn cancel(&self, handle: &RequestHandle) {
        self.cancel_request(handle.id());
    }

    pub fn cancel_request(&self, id: RequestId) {
        let _ = self.send(Command::Cancel(id));
    }

    /// Release one subscription; releasing the last cancels the request
    pub fn cancel_subscription(&self, request: RequestId, subscription: SubscriptionId) {
        let _ = self.send(Command::CancelSubscription {
            request,
            subscription,
        });
    }

    /// Authorization as reported by the current sensor
    pub fn current_authorization(&self) -> AuthorizationState {
        self.sensor
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .authorization_status()
    }

    /// Replace the sensor
    ///
    /// Outstanding requests are cancelled and the old sensor is idled before
    /// the new one is attached.
    pub fn set_sensor(&self, sensor: Arc<dyn Sensor>) {
        info!(sensor = sensor.name(), "Sensor replaced");
        *self.sensor.write().unwrap_or_else(PoisonError::into_inner) = sensor.clone();
        let _ = self.send(Command::SwapSensor(sensor));
    }

    /// State of the actor after every command sent so far
    ///
    /// `None` once the actor has stopped.
    pub async fn snapshot(&self) -> Option<LocatorSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Snapshot(reply)).ok()?;
        rx.await.ok()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Cancel everything, idle the sensor and wait for the actor to stop
    #[instrument(name = "locator_shutdown", skip(self))]
    pub async fn shutdown(mut self) {
        let (ack, done) = oneshot::channel();
        if self.send(Command::Shutdown(Some(ack))).is_ok() {
            let _ = done.await;
        }
        if let Some(worker) = self.worker.take() {
            if let Err(e) = worker.await {
                error!(error = ?e, "Locator actor panicked");
            }
        }
        debug!("Locator shutdown complete");
    }

    fn send(&self, command: Command) -> Result<(), LocatorError> {
        self.tx.send(command).map_err(|_| LocatorError::Cancelled)
    }
}

impl Drop for Locator {
    fn drop(&mut self) {
        if self.worker.is_some() {
            let _ = self.tx.send(Command::Shutdown(None));
        }
    }
}

/// Caller's side of one submitted request
pub struct RequestHandle {
    id: RequestId,
    tx: mpsc::UnboundedSender<Command>,
    primary: Subscription,
}

impl RequestHandle {
    fn new(id: RequestId, tx: mpsc::UnboundedSender<Command>, primary: Subscription) -> Self {
        Self { id, tx, primary }
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Add another subscriber to the same request
    ///
    /// Subscribing to a request that already finished yields a subscription
    /// whose `recv` returns `None`.
    pub fn subscribe(&self) -> Subscription {
        let (subscription, tx) = Subscription::open(self.id, self.tx.clone());
        let _ = self.tx.send(Command::Subscribe {
            request: self.id,
            subscription: subscription.id(),
            tx,
        });
        subscription
    }

    /// Cancel the whole request
    pub fn cancel(&self) {
        let _ = self.tx.send(Command::Cancel(self.id));
    }

    /// Next result on the primary subscription
    pub async fn recv(&mut self) -> Option<LocationResult> {
        self.primary.recv().await
    }

    /// Wait for the first result
    ///
    /// A closed subscription without any result counts as `Cancelled`.
    pub async fn result(mut self) -> LocationResult {
        self.primary.recv().await.unwrap_or(Err(LocatorError::Cancelled))
    }

    /// Keep only the primary subscription
    pub fn into_subscription(self) -> Subscription {
        self.primary
    }
}

/// One subscriber token
pub struct Subscription {
    id: SubscriptionId,
    request: RequestId,
    rx: mpsc::UnboundedReceiver<LocationResult>,
    tx: mpsc::UnboundedSender<Command>,
}

impl Subscription {
    fn open(
        request: RequestId,
        tx: mpsc::UnboundedSender<Command>,
    ) -> (Self, mpsc::UnboundedSender<LocationResult>) {
        let (results_tx, rx) = mpsc::unbounded_channel();
        let subscription = Self {
            id: SubscriptionId::next(),
            request,
            rx,
            tx,
        };
        (subscription, results_tx)
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn request(&self) -> RequestId {
        self.request
    }

    /// Next result; `None` once the request has finished
    pub async fn recv(&mut self) -> Option<LocationResult> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<LocationResult> {
        self.rx.try_recv().ok()
    }

    /// Release this token
    pub fn cancel(self) {
        let _ = self.tx.send(Command::CancelSubscription {
            request: self.request,
            subscription: self.id,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{
        Accuracy, AuthorizationMode, Coordinate, Reading, SensorConfiguration, SensorError,
        SensorErrorKind, ServiceKind,
    };
    use sensors::{ScriptedSensor, StaticIpProvider};
    use std::time::Duration;

    use crate::request::RequestState;

    fn setup(state: AuthorizationState) -> (Arc<ScriptedSensor>, Locator) {
        let sensor = Arc::new(ScriptedSensor::with_authorization(state));
        let locator = Locator::new(sensor.clone(), LocatorConfig::default());
        (sensor, locator)
    }

    fn reading(accuracy: f64) -> Reading {
        Reading::now(Coordinate::new(45.4642, 9.19), accuracy)
    }

    #[tokio::test]
    async fn test_single_prompt_for_concurrent_requests() {
        let (sensor, locator) = setup(AuthorizationState::NotDetermined);
        let _a = locator.submit(RequestOptions::new(Accuracy::Room)).unwrap();
        let _b = locator.submit(RequestOptions::new(Accuracy::City)).unwrap();

        let snapshot = locator.snapshot().await.unwrap();
        assert_eq!(sensor.authorization_requests(), vec![AuthorizationMode::WhenInUse]);
        assert!(snapshot.prompting);
        assert_eq!(snapshot.active(), 0);
        assert_eq!(sensor.update_count(), 0);

        sensor.respond_to_prompt(AuthorizationState::RestrictedForeground);
        let snapshot = locator.snapshot().await.unwrap();
        assert_eq!(snapshot.active(), 2);
        assert!(!snapshot.prompting);
        assert_eq!(sensor.update_count(), 1);
        assert_eq!(sensor.last_settings().unwrap().accuracy, Accuracy::Room);
    }

    #[tokio::test]
    async fn test_one_shot_resolves_and_idles_sensor() {
        let (sensor, locator) = setup(AuthorizationState::FullAccess);
        let handle = locator.submit(RequestOptions::new(Accuracy::House)).unwrap();
        locator.snapshot().await.unwrap();

        sensor.emit_readings(vec![reading(10.0)]);
        let result = handle.result().await.unwrap();
        assert_eq!(result.horizontal_accuracy, 10.0);

        let snapshot = locator.snapshot().await.unwrap();
        assert_eq!(snapshot.pending(), 0);
        assert_eq!(snapshot.applied, SensorConfiguration::idle());
        assert_eq!(snapshot.metrics.completed, 1);
        assert_eq!(sensor.update_count(), 2);
    }

    #[tokio::test]
    async fn test_identical_requests_do_not_reapply_settings() {
        let (sensor, locator) = setup(AuthorizationState::FullAccess);
        let _a = locator.submit(RequestOptions::new(Accuracy::Block)).unwrap();
        let _b = locator.submit(RequestOptions::new(Accuracy::Block)).unwrap();
        let _c = locator.submit(RequestOptions::new(Accuracy::City)).unwrap();

        let snapshot = locator.snapshot().await.unwrap();
        assert_eq!(sensor.update_count(), 1);
        assert_eq!(snapshot.metrics.settings_applied, 1);
        assert_eq!(snapshot.metrics.settings_ignored, 2);
    }

    #[tokio::test]
    async fn test_opted_out_request_never_prompts() {
        let (sensor, locator) = setup(AuthorizationState::NotDetermined);
        let handle = locator
            .submit(RequestOptions::new(Accuracy::Room).avoiding_prompt())
            .unwrap();

        assert_eq!(handle.result().await, Err(LocatorError::AuthorizationNeeded));
        locator.snapshot().await.unwrap();
        assert!(sensor.authorization_requests().is_empty());
        assert_eq!(sensor.update_count(), 0);
    }

    #[tokio::test]
    async fn test_denial_fails_pending_requests() {
        let (sensor, locator) = setup(AuthorizationState::NotDetermined);
        let a = locator.submit(RequestOptions::new(Accuracy::Room)).unwrap();
        let b = locator.submit(RequestOptions::new(Accuracy::City)).unwrap();
        locator.snapshot().await.unwrap();

        sensor.respond_to_prompt(AuthorizationState::Denied);
        assert_eq!(a.result().await, Err(LocatorError::AuthorizationDenied));
        assert_eq!(b.result().await, Err(LocatorError::AuthorizationDenied));

        let snapshot = locator.snapshot().await.unwrap();
        assert_eq!(snapshot.pending(), 0);
        assert_eq!(snapshot.metrics.failed, 2);
    }

    #[tokio::test]
    async fn test_already_denied_fails_without_prompt() {
        let (sensor, locator) = setup(AuthorizationState::Denied);
        let handle = locator.submit(RequestOptions::default()).unwrap();

        assert_eq!(handle.result().await, Err(LocatorError::AuthorizationDenied));
        assert!(sensor.authorization_requests().is_empty());
    }

    #[tokio::test]
    async fn test_insufficient_answer_keeps_requests_queued() {
        let (sensor, locator) = setup(AuthorizationState::NotDetermined);
        let _handle = locator
            .submit(RequestOptions::default().with_service(ServiceKind::Visits))
            .unwrap();
        locator.snapshot().await.unwrap();
        assert_eq!(sensor.authorization_requests(), vec![AuthorizationMode::Always]);

        sensor.respond_to_prompt(AuthorizationState::RestrictedForeground);
        let snapshot = locator.snapshot().await.unwrap();
        assert_eq!(snapshot.requests[0].state, RequestState::Queued);
        assert!(!snapshot.prompting);

        // queue churn must not ask again for an answered prompt
        let other = locator
            .submit(RequestOptions::new(Accuracy::City).with_service(ServiceKind::Visits))
            .unwrap();
        locator.snapshot().await.unwrap();
        other.cancel();
        let snapshot = locator.snapshot().await.unwrap();
        assert_eq!(snapshot.pending(), 1);
        assert_eq!(sensor.authorization_requests().len(), 1);
        assert_eq!(snapshot.metrics.authorization_prompts, 1);
        assert_eq!(sensor.update_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_foreground_request_runs_while_background_waits() {
        let (sensor, locator) = setup(AuthorizationState::RestrictedForeground);
        let _visits = locator
            .submit(RequestOptions::default().with_service(ServiceKind::Visits))
            .unwrap();
        locator.snapshot().await.unwrap();
        sensor.respond_to_prompt(AuthorizationState::RestrictedForeground);

        let timed = locator
            .submit(RequestOptions::new(Accuracy::House).with_timeout(Duration::from_secs(1)))
            .unwrap();
        let snapshot = locator.snapshot().await.unwrap();
        assert_eq!(snapshot.requests[0].state, RequestState::Queued);
        assert_eq!(snapshot.requests[1].state, RequestState::Active);
        assert!(snapshot.requests[1].timeout_armed);
        assert_eq!(
            snapshot.applied.services.iter().copied().collect::<Vec<_>>(),
            vec![ServiceKind::Continuous]
        );
        assert_eq!(sensor.authorization_requests().len(), 1);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(
            timed.result().await,
            Err(LocatorError::Timeout(Duration::from_secs(1)))
        );

        let quick = locator.submit(RequestOptions::new(Accuracy::House)).unwrap();
        locator.snapshot().await.unwrap();
        sensor.emit_readings(vec![reading(10.0)]);
        assert!(quick.result().await.is_ok());

        let snapshot = locator.snapshot().await.unwrap();
        assert_eq!(snapshot.pending(), 1);
        assert_eq!(snapshot.requests[0].state, RequestState::Queued);
        assert_eq!(sensor.authorization_requests().len(), 1);
    }

    #[tokio::test]
    async fn test_unsolicited_grant_settles_prompt() {
        let (sensor, locator) = setup(AuthorizationState::NotDetermined);
        let _handle = locator.submit(RequestOptions::new(Accuracy::Room)).unwrap();
        assert!(locator.snapshot().await.unwrap().prompting);

        sensor.set_authorization(AuthorizationState::FullAccess);
        let snapshot = locator.snapshot().await.unwrap();
        assert!(!snapshot.prompting);
        assert_eq!(snapshot.active(), 1);
        assert_eq!(sensor.update_count(), 1);
        assert_eq!(sensor.authorization_requests().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_isolated() {
        let (sensor, locator) = setup(AuthorizationState::FullAccess);
        let short = locator
            .submit(RequestOptions::new(Accuracy::Room).with_timeout(Duration::from_secs(1)))
            .unwrap();
        let long = locator.submit(RequestOptions::new(Accuracy::Room)).unwrap();
        locator.snapshot().await.unwrap();

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(
            short.result().await,
            Err(LocatorError::Timeout(Duration::from_secs(1)))
        );

        let snapshot = locator.snapshot().await.unwrap();
        assert_eq!(snapshot.pending(), 1);
        assert_eq!(snapshot.requests[0].id, long.id());
        assert_eq!(snapshot.metrics.timed_out, 1);

        sensor.emit_readings(vec![reading(3.0)]);
        assert!(long.result().await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_not_armed_before_authorization() {
        let (sensor, locator) = setup(AuthorizationState::NotDetermined);
        let handle = locator
            .submit(RequestOptions::default().with_timeout(Duration::from_secs(1)))
            .unwrap();

        tokio::time::sleep(Duration::from_secs(5)).await;
        let snapshot = locator.snapshot().await.unwrap();
        assert_eq!(snapshot.armed_timeouts, 0);
        assert_eq!(snapshot.requests[0].state, RequestState::Queued);

        sensor.respond_to_prompt(AuthorizationState::FullAccess);
        assert!(locator.snapshot().await.unwrap().requests[0].timeout_armed);
        assert_eq!(
            handle.result().await,
            Err(LocatorError::Timeout(Duration::from_secs(1)))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_timeout_from_config() {
        let sensor = Arc::new(ScriptedSensor::with_authorization(
            AuthorizationState::FullAccess,
        ));
        let config = LocatorConfig {
            default_timeout: Some(Duration::from_millis(500)),
            ..Default::default()
        };
        let locator = Locator::new(sensor, config);
        let handle = locator.submit(RequestOptions::default()).unwrap();

        assert_eq!(
            handle.result().await,
            Err(LocatorError::Timeout(Duration::from_millis(500)))
        );
    }

    #[tokio::test]
    async fn test_invalid_options_rejected() {
        let (_sensor, locator) = setup(AuthorizationState::FullAccess);
        let err = locator
            .submit(RequestOptions::default().with_min_distance(-1.0))
            .err()
            .unwrap();
        assert!(matches!(err, LocatorError::InvalidOptions { .. }));
        assert_eq!(locator.metrics().submitted, 0);
    }

    #[tokio::test]
    async fn test_continuous_request_keeps_delivering() {
        let (sensor, locator) = setup(AuthorizationState::FullAccess);
        let mut handle = locator
            .submit(RequestOptions::new(Accuracy::House).continuous())
            .unwrap();
        locator.snapshot().await.unwrap();

        for _ in 0..3 {
            sensor.emit_readings(vec![reading(20.0)]);
        }
        sensor.emit_readings(vec![reading(500.0)]);
        sensor.emit_error(SensorError::new(SensorErrorKind::LocationUnknown, "no fix"));

        for _ in 0..3 {
            assert!(handle.recv().await.unwrap().is_ok());
        }
        assert!(matches!(
            handle.recv().await,
            Some(Err(LocatorError::SensorFailure(_)))
        ));

        let snapshot = locator.snapshot().await.unwrap();
        assert_eq!(snapshot.active(), 1);
        assert_eq!(snapshot.metrics.readings_delivered, 3);
        assert_eq!(snapshot.metrics.readings_discarded, 1);

        handle.cancel();
        assert_eq!(handle.recv().await, Some(Err(LocatorError::Cancelled)));
        assert_eq!(handle.recv().await, None);
    }

    #[tokio::test]
    async fn test_last_subscription_cancels_request() {
        let (sensor, locator) = setup(AuthorizationState::FullAccess);
        let handle = locator.submit(RequestOptions::default().continuous()).unwrap();
        let extra = handle.subscribe();

        let snapshot = locator.snapshot().await.unwrap();
        assert_eq!(snapshot.requests[0].subscribers, 2);

        extra.cancel();
        let snapshot = locator.snapshot().await.unwrap();
        assert_eq!(snapshot.requests[0].subscribers, 1);

        let primary = handle.into_subscription();
        primary.cancel();
        let snapshot = locator.snapshot().await.unwrap();
        assert_eq!(snapshot.pending(), 0);
        assert_eq!(snapshot.metrics.cancelled, 1);
        assert_eq!(sensor.last_settings(), Some(SensorConfiguration::idle()));
    }

    #[tokio::test]
    async fn test_dropped_subscriber_is_released() {
        let (sensor, locator) = setup(AuthorizationState::FullAccess);
        let handle = locator.submit(RequestOptions::default().continuous()).unwrap();
        locator.snapshot().await.unwrap();
        drop(handle);

        sensor.emit_readings(vec![reading(5.0)]);
        let snapshot = locator.snapshot().await.unwrap();
        assert_eq!(snapshot.pending(), 0);
        assert_eq!(snapshot.applied, SensorConfiguration::idle());
    }

    #[tokio::test]
    async fn test_swap_sensor_clears_queue() {
        let (old, locator) = setup(AuthorizationState::FullAccess);
        let handle = locator.submit(RequestOptions::new(Accuracy::Room)).unwrap();
        locator.snapshot().await.unwrap();

        let new = Arc::new(ScriptedSensor::with_authorization(
            AuthorizationState::RestrictedForeground,
        ));
        locator.set_sensor(new.clone());
        assert_eq!(handle.result().await, Err(LocatorError::Cancelled));
        assert_eq!(
            locator.current_authorization(),
            AuthorizationState::RestrictedForeground
        );

        let snapshot = locator.snapshot().await.unwrap();
        assert_eq!(snapshot.epoch, 1);
        assert_eq!(old.last_settings(), Some(SensorConfiguration::idle()));
        assert!(new.is_listening());
        assert_eq!(new.update_count(), 0);

        // events from the detached sensor go nowhere
        let next = locator.submit(RequestOptions::default()).unwrap();
        old.emit_readings(vec![reading(5.0)]);
        let snapshot = locator.snapshot().await.unwrap();
        assert_eq!(snapshot.active(), 1);

        new.emit_readings(vec![reading(5.0)]);
        assert!(next.result().await.is_ok());
    }

    #[tokio::test]
    async fn test_ip_lookup_bypasses_sensor() {
        let (sensor, locator) = setup(AuthorizationState::NotDetermined);
        let provider = Arc::new(StaticIpProvider::new("fixed", Coordinate::new(41.9, 12.5)));
        let handle = locator
            .lookup_ip(provider, IpLookupOptions::default())
            .unwrap();

        let reading = handle.result().await.unwrap();
        assert_eq!(reading.source, contracts::ReadingSource::Ip);
        assert!(sensor.authorization_requests().is_empty());
        assert_eq!(sensor.update_count(), 0);

        let snapshot = locator.snapshot().await.unwrap();
        assert!(snapshot.lookups.is_empty());
        assert_eq!(snapshot.metrics.completed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_ip_lookup_counts_as_cancelled() {
        let (_sensor, locator) = setup(AuthorizationState::NotDetermined);
        let provider = Arc::new(
            StaticIpProvider::new("slow", Coordinate::new(41.9, 12.5))
                .with_delay(Duration::from_secs(2)),
        );
        let handle = locator
            .lookup_ip(provider, IpLookupOptions::default())
            .unwrap();
        assert_eq!(locator.snapshot().await.unwrap().lookups.len(), 1);
        drop(handle);

        tokio::time::sleep(Duration::from_secs(3)).await;
        let snapshot = locator.snapshot().await.unwrap();
        assert!(snapshot.lookups.is_empty());
        assert_eq!(snapshot.metrics.cancelled, 1);
        assert_eq!(snapshot.metrics.completed, 0);
    }

    #[tokio::test]
    async fn test_shutdown_cancels_everything() {
        let (sensor, locator) = setup(AuthorizationState::FullAccess);
        let handle = locator.submit(RequestOptions::new(Accuracy::Room)).unwrap();
        locator.snapshot().await.unwrap();

        locator.shutdown().await;
        assert_eq!(handle.result().await, Err(LocatorError::Cancelled));
        assert_eq!(sensor.last_settings(), Some(SensorConfiguration::idle()));
    }
}
