//! Actor - serializes every mutation through one task
//!
//! Facade calls, sensor callbacks and timer expiries all become [`Command`]s
//! on a single unbounded channel, so queue mutation, reconciliation and
//! dispatch are observed in issue order.

use std::ops::ControlFlow;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{info, instrument, trace};

use contracts::{
    AuthorizationMode, AuthorizationState, RequestId, Sensor, SensorEvent, SubscriptionId,
};

use crate::engine::{LocatorCore, LocatorSnapshot};
use crate::ip_lookup::IpRequest;
use crate::request::{LocationRequest, LocationResult};
use crate::timeout::Expiry;

/// Starts an IP lookup task once its request is queued
pub(crate) type Launcher = Box<dyn FnOnce() -> JoinHandle<()> + Send>;

pub(crate) type Inbox = mpsc::UnboundedSender<Command>;

pub(crate) enum Command {
    Submit(LocationRequest),
    SubmitIp {
        request: IpRequest,
        launch: Launcher,
    },
    Subscribe {
        request: RequestId,
        subscription: SubscriptionId,
        tx: mpsc::UnboundedSender<LocationResult>,
    },
    Cancel(RequestId),
    CancelSubscription {
        request: RequestId,
        subscription: SubscriptionId,
    },
    /// Event from the sensor attached at `epoch`
    Sensor {
        epoch: u64,
        event: SensorEvent,
    },
    /// Authorization report; `prompted` is set when answering our prompt
    Authorization {
        epoch: u64,
        state: AuthorizationState,
        prompted: Option<AuthorizationMode>,
    },
    Expired(Expiry),
    IpFinished {
        id: RequestId,
        result: LocationResult,
    },
    SwapSensor(Arc<dyn Sensor>),
    Snapshot(oneshot::Sender<LocatorSnapshot>),
    Shutdown(Option<oneshot::Sender<()>>),
}

impl Command {
    fn label(&self) -> &'static str {
        match self {
            Self::Submit(_) => "submit",
            Self::SubmitIp { .. } => "submit_ip",
            Self::Subscribe { .. } => "subscribe",
            Self::Cancel(_) => "cancel",
            Self::CancelSubscription { .. } => "cancel_subscription",
            Self::Sensor { .. } => "sensor",
            Self::Authorization { .. } => "authorization",
            Self::Expired(_) => "expired",
            Self::IpFinished { .. } => "ip_finished",
            Self::SwapSensor(_) => "swap_sensor",
            Self::Snapshot(_) => "snapshot",
            Self::Shutdown(_) => "shutdown",
        }
    }
}

/// Actor main loop
///
/// Returns after a `Shutdown` command or once every sender is gone.
#[instrument(name = "locator_actor", skip_all)]
pub(crate) async fn run(mut core: LocatorCore, mut rx: mpsc::UnboundedReceiver<Command>) {
    info!("Locator actor started");

    let mut handled: u64 = 0;
    while let Some(command) = rx.recv().await {
        handled += 1;
        trace!(command = command.label(), "handling command");
        if let ControlFlow::Break(()) = core.handle(command) {
            break;
        }
    }

    core.shutdown();
    info!(commands = handled, "Locator actor stopped");
}
