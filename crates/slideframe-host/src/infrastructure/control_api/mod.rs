//! HTTP control surface.
//!
//! Every frame listens on one port (8000 by default) and serves:
//!
//! | Route                               | Purpose                                   |
//! |-------------------------------------|-------------------------------------------|
//! | `GET /api/settings`                 | current settings record                   |
//! | `GET /api/settings/apply?f=v&...`   | operator change; propagated if leader     |
//! | `GET /api/sync?f=v&...`             | change pushed by a leader; not propagated |
//! | `GET /api/status`                   | version, endpoints, device snapshot       |
//! | `GET /api/devices`                  | device snapshot                           |
//! | `PUT /api/devices/{address}`        | register a remote frame                   |
//! | `DELETE /api/devices/{address}`     | unregister a remote frame                 |
//!
//! Settings changes use `GET` with query parameters because that is what
//! remote leaders and existing frame firmware send.
//!
//! All responses share the `{ success, data, error }` envelope; see
//! [`dto::CommandResult`].

pub mod dto;
pub mod handlers;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Json, Router};
use slideframe_core::{AddressError, SettingsStore};
use thiserror::Error;
use tower_http::trace::TraceLayer;

use crate::application::apply_settings::ApplySettingsUseCase;
use crate::application::device_cache::DeviceCache;
use crate::application::manage_devices::ManageDevicesUseCase;
use crate::application::persistence::SettingsRepository;

use self::dto::CommandResult;

// ── Shared application state ──────────────────────────────────────────────────

/// State shared by every handler, behind one `Arc`.
pub struct AppState {
    pub store: Arc<SettingsStore>,
    pub devices: Arc<DeviceCache>,
    pub apply_settings: Arc<ApplySettingsUseCase>,
    pub manage_devices: Arc<ManageDevicesUseCase>,
    /// Port this frame's control surface is reachable on.
    pub service_port: u16,
    pub version: String,
}

impl AppState {
    /// Wires the use cases around the shared store, repository and cache.
    pub fn new(
        store: Arc<SettingsStore>,
        repository: Arc<dyn SettingsRepository>,
        devices: Arc<DeviceCache>,
        device_port: u16,
        service_port: u16,
    ) -> Arc<Self> {
        let apply_settings = Arc::new(ApplySettingsUseCase::new(
            Arc::clone(&store),
            Arc::clone(&repository),
            Arc::clone(&devices),
        ));
        let manage_devices = Arc::new(ManageDevicesUseCase::new(
            Arc::clone(&store),
            repository,
            Arc::clone(&devices),
            device_port,
        ));
        Arc::new(Self {
            store,
            devices,
            apply_settings,
            manage_devices,
            service_port,
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }
}

// ── Errors ────────────────────────────────────────────────────────────────────

/// Request-level failures, rendered as `400` with the envelope.
#[derive(Debug, Error)]
pub enum ControlApiError {
    #[error(transparent)]
    InvalidAddress(#[from] AddressError),
}

impl IntoResponse for ControlApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ControlApiError::InvalidAddress(_) => StatusCode::BAD_REQUEST,
        };
        (status, Json(CommandResult::<()>::err(self.to_string()))).into_response()
    }
}

// ── Router ────────────────────────────────────────────────────────────────────

/// Builds the control API router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/settings", get(handlers::get_settings))
        .route("/api/settings/apply", get(handlers::apply_settings))
        .route("/api/sync", get(handlers::sync_settings))
        .route("/api/status", get(handlers::get_status))
        .route("/api/devices", get(handlers::list_devices))
        .route(
            "/api/devices/{address}",
            put(handlers::register_device).delete(handlers::unregister_device),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
