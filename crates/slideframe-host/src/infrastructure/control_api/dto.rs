//! Data Transfer Objects for the control API.
//!
//! Internal types (`RemoteDevice`, `SystemTime`, ...) are converted into
//! plain JSON-friendly structs here.  Every response is wrapped in
//! [`CommandResult`], so clients can always read `success` first.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use slideframe_core::{DeviceState, RemoteDevice};

use crate::application::apply_settings::ApplyReport;

/// Unified response wrapper: `{ success, data, error }`.
#[derive(Debug, Serialize, Deserialize)]
pub struct CommandResult<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> CommandResult<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

/// One remote frame as shown to operators.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeviceDto {
    pub address: String,
    pub state: DeviceState,
    /// Milliseconds since the Unix epoch of the last successful delivery.
    pub last_sync_unix_ms: Option<u64>,
}

impl From<&RemoteDevice> for DeviceDto {
    fn from(d: &RemoteDevice) -> Self {
        Self {
            address: d.address.to_string(),
            state: d.state,
            last_sync_unix_ms: d.last_sync.and_then(unix_millis),
        }
    }
}

fn unix_millis(at: SystemTime) -> Option<u64> {
    at.duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|d| u64::try_from(d.as_millis()).ok())
}

/// Operator status page: who am I, where can I be reached, who do I sync.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusDto {
    pub version: String,
    /// `http://ip:port` URLs of this frame's control surface.
    pub endpoints: Vec<String>,
    /// The same endpoints as bare `ip:port`.
    pub addresses: Vec<String>,
    pub sync_enabled: bool,
    /// Whether the device cache has finished its startup probe.
    pub devices_ready: bool,
    pub devices: Vec<DeviceDto>,
}

/// Response body of the apply and sync endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct ApplyResultDto {
    #[serde(flatten)]
    pub report: ApplyReport,
    /// `1` if any recognized field had a value supplied, else `0`.
    pub legacy_result: u8,
}

impl From<ApplyReport> for ApplyResultDto {
    fn from(report: ApplyReport) -> Self {
        let legacy_result = report.legacy_code();
        Self {
            report,
            legacy_result,
        }
    }
}
