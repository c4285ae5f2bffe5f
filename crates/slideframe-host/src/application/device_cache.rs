//! DeviceCache: registry of remote frames and settings fan-out.
//!
//! The cache is the host's in-memory database of every secondary frame it
//! pushes settings to.  Each entry is a [`RemoteDevice`] whose
//! [`DeviceState`] follows the outcome of the most recent delivery.
//!
//! # Readiness
//!
//! The cache starts *not ready*.  [`DeviceCache::initialize`] loads the
//! persisted device list, probes every device concurrently, records the
//! results, and then marks the cache ready.  The host calls it once, in the
//! background, right after the control surface starts listening.
//!
//! A propagation that arrives before initialization has finished waits for
//! readiness, bounded by [`DeviceCacheConfig::init_wait`].  If the bound
//! elapses it proceeds with whatever membership is present at that moment.
//!
//! # Fan-out
//!
//! [`DeviceCache::propagate_setting`] snapshots the membership, then pushes
//! the setting to every device concurrently with at most
//! [`DeviceCacheConfig::max_concurrency`] requests in flight.  Outcomes are
//! written back only for devices that are still registered when the result
//! arrives, so a device removed mid-propagation never reappears.
//!
//! # Ordering
//!
//! Every device has a delivery lane: a fair async mutex held for the whole
//! of one delivery, retries included.  Concurrent propagations therefore
//! reach a device one at a time, in the order they queued.  The value is
//! read when the lane is acquired ([`DeviceCache::propagate_current`]), so
//! a push that queued behind a slow one carries the newest value and the
//! last write to reach a device is always the current one.
//!
//! ```text
//!  propagate_setting("rotation", "90")
//!        │ snapshot membership
//!        ▼
//!  ┌─────────┬─────────┬─────────┐   ≤ max_concurrency in flight
//!  │ frame A │ frame B │ frame C │ ──► SettingsDispatcher::push_setting
//!  └─────────┴─────────┴─────────┘
//!        │ record outcomes (still-registered devices only)
//!        ▼
//!  PropagationReport { id, field, deliveries }
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use slideframe_core::{DeviceAddress, DeviceState, RemoteDevice};
use thiserror::Error;
use tokio::sync::{watch, Mutex, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::persistence::SettingsRepository;

// ── Dispatcher port ───────────────────────────────────────────────────────────

/// Why a delivery to one device failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatchError {
    /// Every attempt failed with a transient error.
    #[error("gave up after {attempts} attempt(s): {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    /// The device answered with a status that retrying cannot fix.
    #[error("device rejected the request with HTTP {status}")]
    Rejected { status: u16 },

    /// The request could not be built for this device.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The host is shutting down; no further attempt was made.
    #[error("shutting down; delivery abandoned")]
    ShuttingDown,
}

impl DispatchError {
    /// Whether this failure says anything about the device itself.
    ///
    /// A delivery abandoned during shutdown leaves the device's state alone.
    pub fn reflects_on_device(&self) -> bool {
        !matches!(self, DispatchError::ShuttingDown)
    }
}

/// Delivers settings to one remote frame.
///
/// The infrastructure implementation speaks HTTP with retries; tests use
/// mocks or recording doubles.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SettingsDispatcher: Send + Sync {
    /// Pushes `field=value` to `device`.
    async fn push_setting(
        &self,
        device: &DeviceAddress,
        field: &str,
        value: &str,
    ) -> Result<(), DispatchError>;

    /// Checks that `device` answers at all.
    async fn probe(&self, device: &DeviceAddress) -> Result<(), DispatchError>;
}

// ── Configuration & reports ───────────────────────────────────────────────────

/// Tuning knobs for the cache.
#[derive(Debug, Clone)]
pub struct DeviceCacheConfig {
    /// Upper bound on concurrent deliveries during one fan-out.
    pub max_concurrency: usize,
    /// How long a propagation waits for initialization to finish.
    pub init_wait: Duration,
}

impl Default for DeviceCacheConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 8,
            init_wait: Duration::from_secs(5),
        }
    }
}

/// Outcome of one delivery to one device.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryReport {
    pub address: DeviceAddress,
    /// `None` when the delivery succeeded.
    pub error: Option<String>,
    /// State recorded for the device, or `None` if it was unregistered while
    /// the delivery was in flight.
    pub state: Option<DeviceState>,
}

impl DeliveryReport {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Outcome of one [`DeviceCache::propagate_setting`] call.
#[derive(Debug, Clone, Serialize)]
pub struct PropagationReport {
    /// Correlates the log lines of one propagation.
    pub id: Uuid,
    pub field: String,
    /// One entry per device in the membership snapshot, sorted by address.
    pub deliveries: Vec<DeliveryReport>,
}

impl PropagationReport {
    pub fn succeeded(&self) -> usize {
        self.deliveries.iter().filter(|d| d.succeeded()).count()
    }

    pub fn failed(&self) -> usize {
        self.deliveries.len() - self.succeeded()
    }
}

/// Reads the value to push at the moment a device's lane is acquired.
pub type ValueSource<'a> = &'a (dyn Fn() -> String + Sync);

enum Delivery<'a> {
    Probe,
    Push {
        field: &'a str,
        value: ValueSource<'a>,
    },
}

/// A registered device and its delivery lane.
struct Tracked {
    device: RemoteDevice,
    lane: Arc<Mutex<()>>,
}

type Target = (DeviceAddress, Arc<Mutex<()>>);

// ── DeviceCache ───────────────────────────────────────────────────────────────

/// Shared registry of remote frames.
///
/// Lives behind an `Arc` for the whole process.  The membership map sits
/// behind an async `RwLock`, but no lock is held while a delivery is in
/// flight: fan-out works on a snapshot and re-acquires the lock only to
/// record outcomes.
pub struct DeviceCache {
    devices: RwLock<HashMap<DeviceAddress, Tracked>>,
    dispatcher: Arc<dyn SettingsDispatcher>,
    config: DeviceCacheConfig,
    ready: watch::Sender<bool>,
}

impl DeviceCache {
    pub fn new(dispatcher: Arc<dyn SettingsDispatcher>, config: DeviceCacheConfig) -> Self {
        let (ready, _) = watch::channel(false);
        Self {
            devices: RwLock::new(HashMap::new()),
            dispatcher,
            config,
            ready,
        }
    }

    /// Loads the persisted device list, probes every device, and marks the
    /// cache ready.
    ///
    /// A repository failure is logged and treated as an empty list; the cache
    /// still becomes ready.  Returns one report per probed device.
    pub async fn initialize(&self, repository: &dyn SettingsRepository) -> Vec<DeliveryReport> {
        let addresses = match repository.load_devices() {
            Ok(addresses) => addresses,
            Err(e) => {
                warn!("device list unavailable, starting with none: {e}");
                Vec::new()
            }
        };

        for address in addresses {
            self.register(address).await;
        }

        let targets = self.targets().await;
        let reports = self.deliver_all(targets, &Delivery::Probe).await;
        let reachable = reports.iter().filter(|r| r.succeeded()).count();
        info!(
            "device cache ready: {reachable}/{} device(s) reachable",
            reports.len()
        );

        self.ready.send_replace(true);
        reports
    }

    /// Whether [`initialize`](Self::initialize) has completed.
    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }

    /// Adds `address` as an `Unknown` device.  Returns `false` if it was
    /// already registered, in which case its state is left alone.
    pub async fn register(&self, address: DeviceAddress) -> bool {
        let mut devices = self.devices.write().await;
        if devices.contains_key(&address) {
            return false;
        }
        info!("registered remote device {address}");
        devices.insert(
            address.clone(),
            Tracked {
                device: RemoteDevice::new(address),
                lane: Arc::new(Mutex::new(())),
            },
        );
        true
    }

    /// Removes `address`.  Returns `false` if it was not registered.
    pub async fn unregister(&self, address: &DeviceAddress) -> bool {
        let removed = self.devices.write().await.remove(address).is_some();
        if removed {
            info!("unregistered remote device {address}");
        }
        removed
    }

    pub async fn contains(&self, address: &DeviceAddress) -> bool {
        self.devices.read().await.contains_key(address)
    }

    /// Returns a copy of every tracked device, sorted by address.
    pub async fn snapshot(&self) -> Vec<RemoteDevice> {
        let mut devices: Vec<RemoteDevice> = self
            .devices
            .read()
            .await
            .values()
            .map(|t| t.device.clone())
            .collect();
        devices.sort_by(|a, b| a.address.cmp(&b.address));
        devices
    }

    /// Pushes `field=value` to every registered device.
    ///
    /// Waits for readiness first (bounded by `init_wait`).  Per-device
    /// failures are recorded and reported, never raised.
    pub async fn propagate_setting(&self, field: &str, value: &str) -> PropagationReport {
        self.propagate_current(field, &|| value.to_string()).await
    }

    /// Like [`propagate_setting`](Self::propagate_setting), but each device
    /// receives whatever `current` returns once its lane is free.
    pub async fn propagate_current(&self, field: &str, current: ValueSource<'_>) -> PropagationReport {
        let id = Uuid::new_v4();
        self.wait_ready().await;

        let targets = self.targets().await;
        if targets.is_empty() {
            debug!("propagation {id}: no remote devices for {field}");
            return PropagationReport {
                id,
                field: field.to_string(),
                deliveries: Vec::new(),
            };
        }

        info!(
            "propagation {id}: pushing {field}={} to {} device(s)",
            current(),
            targets.len()
        );
        let deliveries = self
            .deliver_all(
                targets,
                &Delivery::Push {
                    field,
                    value: current,
                },
            )
            .await;

        let report = PropagationReport {
            id,
            field: field.to_string(),
            deliveries,
        };
        info!(
            "propagation {id}: {} delivered, {} failed",
            report.succeeded(),
            report.failed()
        );
        report
    }

    async fn wait_ready(&self) {
        let mut ready = self.ready.subscribe();
        let wait = ready.wait_for(|r| *r);
        if tokio::time::timeout(self.config.init_wait, wait).await.is_err() {
            warn!(
                "device cache not initialized after {:?}; propagating to current membership",
                self.config.init_wait
            );
        }
    }

    async fn targets(&self) -> Vec<Target> {
        let mut targets: Vec<Target> = self
            .devices
            .read()
            .await
            .iter()
            .map(|(address, t)| (address.clone(), Arc::clone(&t.lane)))
            .collect();
        targets.sort_by(|a, b| a.0.cmp(&b.0));
        targets
    }

    async fn deliver_all(&self, targets: Vec<Target>, delivery: &Delivery<'_>) -> Vec<DeliveryReport> {
        let mut reports: Vec<DeliveryReport> = stream::iter(targets)
            .map(|(address, lane)| async move {
                let _turn = lane.lock().await;
                let result = match delivery {
                    Delivery::Probe => self.dispatcher.probe(&address).await,
                    Delivery::Push { field, value } => {
                        let value = value();
                        self.dispatcher.push_setting(&address, field, &value).await
                    }
                };
                self.record_outcome(address, &lane, result, delivery).await
            })
            .buffer_unordered(self.config.max_concurrency.max(1))
            .collect()
            .await;

        reports.sort_by(|a, b| a.address.cmp(&b.address));
        reports
    }

    /// Writes one delivery's outcome back, unless the device was unregistered
    /// (or unregistered and registered again) while it was in flight.
    async fn record_outcome(
        &self,
        address: DeviceAddress,
        lane: &Arc<Mutex<()>>,
        result: Result<(), DispatchError>,
        delivery: &Delivery<'_>,
    ) -> DeliveryReport {
        let mut devices = self.devices.write().await;
        let state = devices
            .get_mut(&address)
            .filter(|t| Arc::ptr_eq(&t.lane, lane))
            .map(|t| {
                let device = &mut t.device;
                match (&result, delivery) {
                    (Ok(()), Delivery::Probe) => device.record_reachable(),
                    (Ok(()), Delivery::Push { .. }) => device.record_success(SystemTime::now()),
                    (Err(e), _) if e.reflects_on_device() => device.record_failure(),
                    (Err(_), _) => {}
                }
                device.state
            });
        drop(devices);

        match &result {
            Ok(()) => debug!("delivered to {address}"),
            Err(e) => warn!("delivery to {address} failed: {e}"),
        }
        if state.is_none() {
            debug!("{address} was unregistered mid-delivery; outcome not recorded");
        }

        DeliveryReport {
            address,
            error: result.err().map(|e| e.to_string()),
            state,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
