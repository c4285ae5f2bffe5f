//! Application layer use cases for the frame host.
//!
//! Use cases in this layer orchestrate the settings store and the device
//! cache to fulfil a request, and depend only on traits
//! ([`persistence::SettingsRepository`], [`device_cache::SettingsDispatcher`])
//! for anything that touches disk or the network.  The concrete adapters live
//! in `infrastructure` and are injected at construction time, so every use
//! case here is unit-testable without sockets or files.
//!
//! # Sub-modules
//!
//! - **`persistence`**     – The settings repository port plus the shared
//!   "persist the current record" helper.
//!
//! - **`device_cache`**    – Registry of remote frames and the concurrent
//!   fan-out that pushes one setting to all of them.
//!
//! - **`apply_settings`**  – Applies an inbound batch of `field=value` pairs,
//!   persists the result, and propagates applied fields when this frame is
//!   the sync leader.
//!
//! - **`manage_devices`**  – Adds and removes remote frames, keeping the
//!   cache and the persisted `remote_clients` list in step.

pub mod apply_settings;
pub mod device_cache;
pub mod manage_devices;
pub mod persistence;
