//! ManageDevicesUseCase: add and remove remote frames.
//!
//! A remote frame lives in two places: the [`DeviceCache`] (runtime
//! membership and reachability) and the persisted `remote_clients` list
//! (membership across restarts).  This use case keeps both in step.
//!
//! Both operations are idempotent.  Persisted entries are compared as parsed
//! addresses, so `10.0.0.5` and `10.0.0.5:8000` name the same frame.

use std::sync::Arc;

use serde::Serialize;
use slideframe_core::{AddressError, DeviceAddress, SettingsStore};

use super::device_cache::DeviceCache;
use super::persistence::{persist_settings_blocking, SettingsRepository};

/// Outcome of a register or unregister request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceChange {
    pub address: DeviceAddress,
    /// Whether membership actually changed.
    pub changed: bool,
    /// Whether the remote-client list was written to the repository.
    pub persisted: bool,
}

pub struct ManageDevicesUseCase {
    store: Arc<SettingsStore>,
    repository: Arc<dyn SettingsRepository>,
    devices: Arc<DeviceCache>,
    device_port: u16,
}

impl ManageDevicesUseCase {
    pub fn new(
        store: Arc<SettingsStore>,
        repository: Arc<dyn SettingsRepository>,
        devices: Arc<DeviceCache>,
        device_port: u16,
    ) -> Self {
        Self {
            store,
            repository,
            devices,
            device_port,
        }
    }

    /// Parses `raw` with the configured default port.
    ///
    /// # Errors
    ///
    /// Returns the [`AddressError`] if `raw` is not a valid device address.
    pub fn parse_address(&self, raw: &str) -> Result<DeviceAddress, AddressError> {
        DeviceAddress::parse_with_default_port(raw, self.device_port)
    }

    /// Registers the frame at `raw` and records it in `remote_clients`.
    ///
    /// # Errors
    ///
    /// Returns the [`AddressError`] if `raw` is not a valid device address.
    pub async fn register(&self, raw: &str) -> Result<DeviceChange, AddressError> {
        let address = self.parse_address(raw)?;
        let added_to_cache = self.devices.register(address.clone()).await;

        let already_listed = self.store.with(|s| {
            s.remote_clients
                .iter()
                .any(|entry| self.names(entry, &address))
        });
        let added_to_list = !already_listed && self.store.add_remote_client(&address.to_string());

        let persisted = added_to_list && self.persist().await;
        Ok(DeviceChange {
            address,
            changed: added_to_cache || added_to_list,
            persisted,
        })
    }

    /// Unregisters the frame at `raw` and drops it from `remote_clients`.
    ///
    /// # Errors
    ///
    /// Returns the [`AddressError`] if `raw` is not a valid device address.
    pub async fn unregister(&self, raw: &str) -> Result<DeviceChange, AddressError> {
        let address = self.parse_address(raw)?;
        let removed_from_cache = self.devices.unregister(&address).await;
        let removed_from_list = self
            .store
            .remove_remote_clients(|entry| self.names(entry, &address));

        let persisted = removed_from_list && self.persist().await;
        Ok(DeviceChange {
            address,
            changed: removed_from_cache || removed_from_list,
            persisted,
        })
    }

    async fn persist(&self) -> bool {
        persist_settings_blocking(Arc::clone(&self.store), Arc::clone(&self.repository)).await
    }

    /// Whether the persisted `entry` refers to `address`.
    fn names(&self, entry: &str, address: &DeviceAddress) -> bool {
        DeviceAddress::parse_with_default_port(entry, self.device_port)
            .is_ok_and(|parsed| &parsed == address)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
