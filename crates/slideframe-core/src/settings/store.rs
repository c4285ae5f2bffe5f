//! Process-wide settings store.
//!
//! One [`SettingsStore`] is built at startup from the persisted settings and
//! handed to every component as an `Arc<SettingsStore>`.  It is mutated in
//! place by inbound requests and read everywhere else; it lives for the whole
//! process.
//!
//! # Locking
//!
//! A `std::sync::RwLock` guards the record.  Each field write happens under
//! the write lock, so concurrent requests resolve last-write-wins per field
//! and readers never see a half-written value.  No lock is held across an
//! `.await`, so the blocking lock is fine inside async handlers.
//!
//! A panic while the lock is held would poison it.  The record is always left
//! in a consistent state between field writes, so a poisoned lock is recovered
//! rather than propagated.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, warn};

use super::apply::{apply_raw, ApplyOutcome, SettingsError};
use super::fields::{lookup, SettingValue};
use super::schema::Settings;

/// Shared, mutable settings record.
#[derive(Debug, Default)]
pub struct SettingsStore {
    inner: RwLock<Settings>,
}

impl SettingsStore {
    pub fn new(settings: Settings) -> Self {
        Self {
            inner: RwLock::new(settings),
        }
    }

    /// Returns a copy of the whole record.
    pub fn snapshot(&self) -> Settings {
        self.read().clone()
    }

    /// Runs `f` against the record under the read lock.
    pub fn with<R>(&self, f: impl FnOnce(&Settings) -> R) -> R {
        f(&self.read())
    }

    /// Applies one raw value to the field called `name`.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::UnknownField`] if no settable field has that name.
    pub fn apply(&self, name: &str, raw: Option<&str>) -> Result<ApplyOutcome, SettingsError> {
        let field = lookup(name).ok_or_else(|| SettingsError::UnknownField(name.to_string()))?;
        let outcome = apply_raw(&mut self.write(), field, raw);
        debug!("apply {name}={raw:?} -> {outcome:?}");
        Ok(outcome)
    }

    /// Legacy 0/1 façade over [`apply`](Self::apply).
    ///
    /// Unknown field names answer `0`, the same as "nothing supplied".
    pub fn apply_legacy(&self, name: &str, raw: Option<&str>) -> u8 {
        match self.apply(name, raw) {
            Ok(outcome) => outcome.legacy_code(),
            Err(e) => {
                warn!("{e}");
                0
            }
        }
    }

    /// Reads the current value of the field called `name`.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::UnknownField`] if no settable field has that name.
    pub fn value_of(&self, name: &str) -> Result<SettingValue, SettingsError> {
        let field = lookup(name).ok_or_else(|| SettingsError::UnknownField(name.to_string()))?;
        Ok(field.read(&self.read()))
    }

    /// Adds `address` to the remote-client list.  Returns `false` if it was
    /// already present.
    pub fn add_remote_client(&self, address: &str) -> bool {
        let mut settings = self.write();
        if settings.remote_clients.iter().any(|a| a == address) {
            return false;
        }
        settings.remote_clients.push(address.to_string());
        true
    }

    /// Removes every remote-client entry for which `matches` returns `true`.
    /// Returns `false` if nothing was removed.
    pub fn remove_remote_clients(&self, matches: impl Fn(&str) -> bool) -> bool {
        let mut settings = self.write();
        let before = settings.remote_clients.len();
        settings.remote_clients.retain(|a| !matches(a));
        settings.remote_clients.len() != before
    }

    fn read(&self) -> RwLockReadGuard<'_, Settings> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Settings> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
