//! Runtime configuration for the host process.
//!
//! Built by the binary from command-line arguments (with `SLIDEFRAME_*`
//! environment-variable fallbacks) and passed to the components that need
//! it.  This is *process* configuration; the user-facing slideshow settings
//! live in the persisted settings record.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use slideframe_core::DEFAULT_DEVICE_PORT;

use crate::application::device_cache::DeviceCacheConfig;
use crate::infrastructure::network::dispatcher::RetryPolicy;

#[derive(Debug, Clone)]
pub struct HostConfig {
    /// Where the control API listens.
    pub bind_addr: SocketAddr,
    /// Settings file; `None` means the platform default location.
    pub settings_path: Option<PathBuf>,
    /// When `false`, settings are kept in memory only.
    pub persist: bool,
    /// Port assumed for remote frames listed without one.
    pub device_port: u16,
    pub retry: RetryPolicy,
    /// Per-request timeout for outbound calls to remote frames.
    pub request_timeout: Duration,
    pub cache: DeviceCacheConfig,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_DEVICE_PORT)),
            settings_path: None,
            persist: true,
            device_port: DEFAULT_DEVICE_PORT,
            retry: RetryPolicy::default(),
            request_timeout: Duration::from_secs(2),
            cache: DeviceCacheConfig::default(),
        }
    }
}

impl HostConfig {
    /// Port operators reach the control API on.
    pub fn service_port(&self) -> u16 {
        self.bind_addr.port()
    }

    /// Longest one delivery can take with every retry used: the grace
    /// period background pushes get on shutdown.
    pub fn delivery_budget(&self) -> Duration {
        (self.request_timeout + self.retry.delay) * self.retry.max_attempts
    }
}
