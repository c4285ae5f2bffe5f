//! Infrastructure layer for the frame host.
//!
//! Contains OS-facing adapters: outbound HTTP to remote frames, interface
//! enumeration, settings file storage, and the inbound HTTP control surface.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `slideframe_core`, but MUST NOT be imported by the `application` layer.

pub mod control_api;
pub mod host_config;
pub mod network;
pub mod server;
pub mod storage;
