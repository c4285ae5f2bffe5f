//! Settings persistence port.
//!
//! The host keeps exactly one settings record on disk.  Use cases never touch
//! the file system themselves; they talk to a [`SettingsRepository`] and the
//! binary decides which implementation backs it (TOML file or in-memory).

use std::sync::Arc;

use slideframe_core::{DeviceAddress, Settings, SettingsStore, DEFAULT_DEVICE_PORT};
use thiserror::Error;
use tracing::{error, warn};

/// Error type for settings persistence.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("failed to load settings: {0}")]
    Load(String),
    #[error("failed to save settings: {0}")]
    Save(String),
}

/// Loads and saves the persisted settings record.
pub trait SettingsRepository: Send + Sync {
    /// Loads the persisted record, or the defaults if none exists yet.
    fn load(&self) -> Result<Settings, RepositoryError>;

    /// Replaces the persisted record with `settings`.
    fn save(&self, settings: &Settings) -> Result<(), RepositoryError>;

    /// Saves the store's current record.
    ///
    /// Implementations shared between requests take the snapshot inside
    /// their write lock, so a stale snapshot never overwrites a newer one.
    fn save_current(&self, store: &SettingsStore) -> Result<(), RepositoryError> {
        self.save(&store.snapshot())
    }

    /// Port assumed for `remote_clients` entries that do not name one.
    fn default_device_port(&self) -> u16 {
        DEFAULT_DEVICE_PORT
    }

    /// Loads the persisted remote-device list.
    ///
    /// Entries that do not parse as a device address are logged and skipped;
    /// duplicates collapse to one.
    fn load_devices(&self) -> Result<Vec<DeviceAddress>, RepositoryError> {
        let settings = self.load()?;
        Ok(parse_device_list(
            &settings.remote_clients,
            self.default_device_port(),
        ))
    }
}

/// Parses persisted `remote_clients` entries into device addresses.
pub fn parse_device_list(entries: &[String], default_port: u16) -> Vec<DeviceAddress> {
    let mut devices: Vec<DeviceAddress> = Vec::with_capacity(entries.len());
    for entry in entries {
        match DeviceAddress::parse_with_default_port(entry, default_port) {
            Ok(address) if !devices.contains(&address) => devices.push(address),
            Ok(_) => {}
            Err(e) => warn!("ignoring remote client entry {entry:?}: {e}"),
        }
    }
    devices
}

/// Saves the store's current record.  Failures are logged, not returned: the
/// in-memory record stays authoritative for the rest of the process lifetime.
///
/// Returns `true` if the record was written.
pub fn persist_settings(store: &SettingsStore, repository: &dyn SettingsRepository) -> bool {
    match repository.save_current(store) {
        Ok(()) => true,
        Err(e) => {
            error!("settings not persisted: {e}");
            false
        }
    }
}

/// [`persist_settings`] on the blocking pool, for callers on the async
/// runtime.
pub async fn persist_settings_blocking(
    store: Arc<SettingsStore>,
    repository: Arc<dyn SettingsRepository>,
) -> bool {
    let task = tokio::task::spawn_blocking(move || persist_settings(&store, repository.as_ref()));
    match task.await {
        Ok(persisted) => persisted,
        Err(e) => {
            error!("settings save task failed: {e}");
            false
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
