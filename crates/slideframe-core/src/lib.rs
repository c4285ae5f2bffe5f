//! # slideframe-core
//!
//! Shared domain library for Slideframe, a networked slideshow player in
//! which one *primary* frame keeps a fleet of *remote* frames configured
//! the same way.
//!
//! This crate has no network, file-system, or UI dependencies.  It defines:
//!
//! - **`settings`** – The named-field settings record, the compile-time table
//!   that lets fields be set by name, and the typed applier that turns an
//!   untyped query-string value into a field write.
//!
//! - **`device`** – Remote device addresses and the reachability state machine
//!   the host's device cache drives.
//!
//! - **`shuffle`** – The Fisher–Yates shuffler used to randomise playlist order.

pub mod device;
pub mod settings;
pub mod shuffle;

// Re-export the most-used types at the crate root so callers can write
// `slideframe_core::SettingsStore` instead of the full module path.
pub use device::{AddressError, DeviceAddress, DeviceState, RemoteDevice, DEFAULT_DEVICE_PORT};
pub use settings::{ApplyOutcome, SettingValue, Settings, SettingsError, SettingsStore};
pub use shuffle::shuffle;
