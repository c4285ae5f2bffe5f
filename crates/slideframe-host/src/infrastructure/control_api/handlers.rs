//! Route handlers for the control API.
//!
//! Handlers are thin: they extract request data, delegate to the settings
//! store or a use case, and wrap the result in a [`CommandResult`].

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use slideframe_core::Settings;
use tracing::info;

use super::dto::{ApplyResultDto, CommandResult, DeviceDto, StatusDto};
use super::{AppState, ControlApiError};
use crate::application::manage_devices::DeviceChange;
use crate::infrastructure::network::self_identify::local_endpoints;

pub type ApiResponse<T> = (StatusCode, Json<CommandResult<T>>);

fn ok<T: serde::Serialize>(data: T) -> ApiResponse<T> {
    (StatusCode::OK, Json(CommandResult::ok(data)))
}

/// `GET /api/settings`
pub async fn get_settings(State(state): State<Arc<AppState>>) -> ApiResponse<Settings> {
    ok(state.store.snapshot())
}

/// `GET /api/settings/apply?<field>=<value>...`
///
/// Operator change: applied, persisted, and pushed to remote frames when
/// sync is enabled.  The push runs in the background and is drained on
/// shutdown.
pub async fn apply_settings(
    State(state): State<Arc<AppState>>,
    Query(params): Query<Vec<(String, String)>>,
) -> ApiResponse<ApplyResultDto> {
    let (report, _propagation) = state.apply_settings.apply_and_propagate(&params).await;
    ok(ApplyResultDto::from(report))
}

/// `GET /api/sync?<field>=<value>...`
///
/// Change pushed by a sync leader: applied and persisted, never pushed on.
pub async fn sync_settings(
    State(state): State<Arc<AppState>>,
    Query(params): Query<Vec<(String, String)>>,
) -> ApiResponse<ApplyResultDto> {
    let report = state.apply_settings.apply(&params).await;
    ok(ApplyResultDto::from(report))
}

/// `GET /api/status`
///
/// Also serves as the liveness probe remote leaders send to this frame.
pub async fn get_status(State(state): State<Arc<AppState>>) -> ApiResponse<StatusDto> {
    let endpoints = local_endpoints(state.service_port);
    let devices = state.devices.snapshot().await;
    ok(StatusDto {
        version: state.version.clone(),
        endpoints: endpoints.iter().map(|e| e.url()).collect(),
        addresses: endpoints.iter().map(ToString::to_string).collect(),
        sync_enabled: state.store.with(|s| s.is_sync_enabled),
        devices_ready: state.devices.is_ready(),
        devices: devices.iter().map(DeviceDto::from).collect(),
    })
}

/// `GET /api/devices`
pub async fn list_devices(State(state): State<Arc<AppState>>) -> ApiResponse<Vec<DeviceDto>> {
    let devices = state.devices.snapshot().await;
    ok(devices.iter().map(DeviceDto::from).collect())
}

/// `PUT /api/devices/{address}`
pub async fn register_device(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
) -> Result<ApiResponse<DeviceChange>, ControlApiError> {
    let change = state.manage_devices.register(&address).await?;
    if change.changed {
        info!("operator registered {}", change.address);
    }
    Ok(ok(change))
}

/// `DELETE /api/devices/{address}`
pub async fn unregister_device(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
) -> Result<ApiResponse<DeviceChange>, ControlApiError> {
    let change = state.manage_devices.unregister(&address).await?;
    if change.changed {
        info!("operator unregistered {}", change.address);
    }
    Ok(ok(change))
}
