//! Settings persistence adapters.

pub mod memory;
pub mod settings_file;
