//! TOML-based settings persistence.
//!
//! Reads and writes the [`Settings`] record to the platform-appropriate file:
//! - Windows:  `%APPDATA%\Slideframe\settings.toml`
//! - Linux:    `~/.config/slideframe/settings.toml`
//! - macOS:    `~/Library/Application Support/Slideframe/settings.toml`
//!
//! A different path can be given explicitly (`--settings-file`).
//!
//! # File format
//!
//! One flat table whose keys are the settings field names:
//!
//! ```toml
//! fade_transition_time = 1200.0
//! slideshow_transition_time = 30000
//! shuffle = true
//! is_sync_enabled = true
//! remote_clients = ["192.168.1.41", "192.168.1.42:8001"]
//! ```
//!
//! Every field has a serde default, so a missing file, or a file written by an
//! older version that lacks newer fields, still loads.
//!
//! # Atomic writes
//!
//! `save` writes a uniquely named sibling `.tmp` file and renames it over the
//! target, so a crash mid-write leaves the previous file intact.  The
//! repository serializes its saves and snapshots the store under the same
//! lock, so the file always ends up holding the newest record.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use slideframe_core::{Settings, SettingsStore, DEFAULT_DEVICE_PORT};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::application::persistence::{RepositoryError, SettingsRepository};

const SETTINGS_FILE_NAME: &str = "settings.toml";

/// Error type for settings file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing settings at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse settings TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The settings could not be serialized to TOML.
    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Paths ─────────────────────────────────────────────────────────────────────

/// Resolves the default settings file path for this platform.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn default_settings_path() -> Result<PathBuf, ConfigError> {
    platform_config_dir()
        .map(|dir| dir.join(SETTINGS_FILE_NAME))
        .ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the platform config directory including the `slideframe` part.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("Slideframe"))
    }

    #[cfg(target_os = "linux")]
    {
        // XDG_CONFIG_HOME or ~/.config
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("slideframe"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("Slideframe")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Load / save ───────────────────────────────────────────────────────────────

/// Loads settings from `path`, returning the defaults if the file does not
/// exist yet.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_settings(path: &Path) -> Result<Settings, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("no settings file at {}; using defaults", path.display());
            Ok(Settings::default())
        }
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Persists `settings` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_settings(path: &Path, settings: &Settings) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(settings)?;
    let tmp = path.with_extension(format!("toml.{}.tmp", Uuid::new_v4().simple()));
    std::fs::write(&tmp, content).map_err(|source| ConfigError::Io {
        path: tmp.clone(),
        source,
    })?;
    if let Err(source) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        });
    }
    debug!("settings written to {}", path.display());
    Ok(())
}

// ── Repository ────────────────────────────────────────────────────────────────

/// [`SettingsRepository`] backed by one TOML file.
#[derive(Debug)]
pub struct TomlSettingsRepository {
    path: PathBuf,
    device_port: u16,
    /// Held across snapshot and write.
    write_lock: Mutex<()>,
}

impl TomlSettingsRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            device_port: DEFAULT_DEVICE_PORT,
            write_lock: Mutex::new(()),
        }
    }

    /// Port assumed for `remote_clients` entries without one.
    pub fn with_device_port(mut self, port: u16) -> Self {
        self.device_port = port;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsRepository for TomlSettingsRepository {
    fn load(&self) -> Result<Settings, RepositoryError> {
        load_settings(&self.path).map_err(|e| RepositoryError::Load(e.to_string()))
    }

    fn save(&self, settings: &Settings) -> Result<(), RepositoryError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        save_settings(&self.path, settings).map_err(|e| RepositoryError::Save(e.to_string()))
    }

    fn save_current(&self, store: &SettingsStore) -> Result<(), RepositoryError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        save_settings(&self.path, &store.snapshot())
            .map_err(|e| RepositoryError::Save(e.to_string()))
    }

    fn default_device_port(&self) -> u16 {
        self.device_port
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
