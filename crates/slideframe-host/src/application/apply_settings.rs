//! ApplySettingsUseCase: apply an inbound settings request.
//!
//! An inbound request is a list of `field=value` query pairs.  For each pair
//! the use case:
//!
//! 1. applies the raw value to the named field through the settings store
//!    (unknown names are reported as ignored);
//! 2. once every pair is processed, persists the record if any field was
//!    written;
//! 3. if this frame is the sync leader (`is_sync_enabled`), pushes every
//!    written field's new value to the remote frames.
//!
//! Step 3 only happens for operator changes.  Changes that arrive *from* a
//! leader (`/api/sync`) are applied and persisted but never pushed onwards,
//! so two frames listing each other cannot bounce a change back and forth.
//!
//! Background pushes are tracked; [`ApplySettingsUseCase::drain`] lets the
//! host wait for them on shutdown instead of dropping them mid-request.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use slideframe_core::{ApplyOutcome, SettingsStore};
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use super::device_cache::{DeviceCache, PropagationReport};
use super::persistence::{persist_settings_blocking, SettingsRepository};

/// Fields that describe this frame's role rather than what it displays;
/// they are never pushed to remote frames.
const LOCAL_ONLY_FIELDS: &[&str] = &["is_sync_enabled"];

/// Outcome for one `field=value` pair of a request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldChange {
    pub field: String,
    pub outcome: ApplyOutcome,
    /// Wire form of the field's value after the pair was applied.
    pub value: Option<String>,
}

/// Outcome of one request.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ApplyReport {
    /// One entry per recognized pair, in request order.
    pub fields: Vec<FieldChange>,
    /// Names that matched no settable field.
    pub ignored: Vec<String>,
    /// Whether the record was written to the repository.
    pub persisted: bool,
    /// Whether a background push to remote frames was started.
    pub propagating: bool,
}

impl ApplyReport {
    /// Whether any field was written.
    pub fn any_applied(&self) -> bool {
        self.fields.iter().any(|f| f.outcome.is_applied())
    }

    /// The request's result in the legacy 0/1 form: `1` if any recognized
    /// field had a value supplied, else `0`.
    pub fn legacy_code(&self) -> u8 {
        self.fields
            .iter()
            .map(|f| f.outcome.legacy_code())
            .max()
            .unwrap_or(0)
    }

    /// `(field, wire value)` for every written field that should reach remote
    /// frames.  A field written twice appears once, with its final value.
    pub fn outbound_changes(&self) -> Vec<(String, String)> {
        let mut changes: Vec<(String, String)> = Vec::new();
        for change in self.fields.iter().filter(|f| f.outcome.is_applied()) {
            if LOCAL_ONLY_FIELDS.contains(&change.field.as_str()) {
                continue;
            }
            let Some(value) = &change.value else { continue };
            changes.retain(|(field, _)| field != &change.field);
            changes.push((change.field.clone(), value.clone()));
        }
        changes
    }
}

pub struct ApplySettingsUseCase {
    store: Arc<SettingsStore>,
    repository: Arc<dyn SettingsRepository>,
    devices: Arc<DeviceCache>,
    propagations: TaskTracker,
}

impl ApplySettingsUseCase {
    pub fn new(
        store: Arc<SettingsStore>,
        repository: Arc<dyn SettingsRepository>,
        devices: Arc<DeviceCache>,
    ) -> Self {
        Self {
            store,
            repository,
            devices,
            propagations: TaskTracker::new(),
        }
    }

    /// Applies and persists `params` without pushing anything to remote
    /// frames.
    pub async fn apply(&self, params: &[(String, String)]) -> ApplyReport {
        let mut report = ApplyReport::default();

        for (name, raw) in params {
            match self.store.apply(name, Some(raw)) {
                Ok(outcome) => {
                    let value = if outcome.is_applied() {
                        self.store.value_of(name).ok().map(|v| v.to_wire())
                    } else {
                        warn!("{name}: could not parse {raw:?}; keeping current value");
                        None
                    };
                    report.fields.push(FieldChange {
                        field: name.clone(),
                        outcome,
                        value,
                    });
                }
                Err(e) => {
                    debug!("ignoring parameter: {e}");
                    report.ignored.push(name.clone());
                }
            }
        }

        if report.any_applied() {
            report.persisted =
                persist_settings_blocking(Arc::clone(&self.store), Arc::clone(&self.repository))
                    .await;
        }
        report
    }

    /// Applies `params` and, when this frame is the sync leader, starts a
    /// background push of the written fields.
    ///
    /// Returns the report immediately; the handle resolves once every push
    /// has finished.
    pub async fn apply_and_propagate(
        self: &Arc<Self>,
        params: &[(String, String)],
    ) -> (ApplyReport, Option<JoinHandle<Vec<PropagationReport>>>) {
        let mut report = self.apply(params).await;

        let sync_enabled = self.store.with(|s| s.is_sync_enabled);
        let changes = report.outbound_changes();
        if !sync_enabled || changes.is_empty() {
            return (report, None);
        }

        info!("pushing {} changed field(s) to remote frames", changes.len());
        report.propagating = true;
        let this = Arc::clone(self);
        let handle = self
            .propagations
            .spawn(async move { this.propagate(&changes).await });
        (report, Some(handle))
    }

    /// Pushes each changed field to every remote frame, one field at a time.
    ///
    /// Each device receives the field's value as stored when its delivery
    /// starts, so a push queued behind a slower, older one never delivers a
    /// stale value.  `value` is used only if the field can no longer be read.
    pub async fn propagate(&self, changes: &[(String, String)]) -> Vec<PropagationReport> {
        let mut reports = Vec::with_capacity(changes.len());
        for (field, value) in changes {
            let current = || {
                self.store
                    .value_of(field)
                    .map(|v| v.to_wire())
                    .unwrap_or_else(|_| value.clone())
            };
            reports.push(self.devices.propagate_current(field, &current).await);
        }
        reports
    }

    /// Waits for every background push started so far, at most `limit`.
    ///
    /// Returns `false` if some were still running when the limit elapsed.
    pub async fn drain(&self, limit: Duration) -> bool {
        self.propagations.close();
        if self.propagations.is_empty() {
            return true;
        }
        info!(
            "waiting up to {limit:?} for {} background push(es)",
            self.propagations.len()
        );
        let finished = tokio::time::timeout(limit, self.propagations.wait())
            .await
            .is_ok();
        if !finished {
            warn!(
                "{} background push(es) still running after {limit:?}; abandoning",
                self.propagations.len()
            );
        }
        finished
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
