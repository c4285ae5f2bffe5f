//! Settings record, field table, typed applier, and the shared store.
//!
//! - **`schema`** – the [`Settings`] record and its defaults.
//! - **`fields`** – compile-time table mapping field names to typed accessors.
//! - **`apply`** – turns one untyped text value into a typed field write.
//! - **`store`** – the `RwLock`-guarded record shared across the process.

pub mod apply;
pub mod fields;
pub mod schema;
pub mod store;

pub use apply::{apply_raw, ApplyOutcome, SettingsError};
pub use fields::{lookup, FieldDescriptor, FieldKind, SettingValue, FIELDS};
pub use schema::Settings;
pub use store::SettingsStore;
