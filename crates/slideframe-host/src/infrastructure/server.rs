//! Host assembly and the serve loop.
//!
//! [`run_host`] wires every component from a [`HostConfig`], starts the
//! control API, and runs until the shared `running` flag is cleared.
//!
//! # Startup order
//!
//! ```text
//! load settings ─► log settings ─► build dispatcher + cache ─► bind listener
//!                                                                 │
//!                     ┌───────────────────────────────────────────┤
//!                     ▼                                           ▼
//!      cache.initialize() (background)                    serve requests
//! ```
//!
//! The device cache probes remote frames in the background so a slow or
//! missing frame never delays the control surface.  Propagations that arrive
//! before the probe finishes wait for it (bounded).
//!
//! # Shutdown
//!
//! The same `running` flag gates the dispatcher: once it is cleared no new
//! delivery attempt starts and the server stops accepting connections.
//! Background pushes already in flight are then given
//! [`HostConfig::delivery_budget`] to finish or time out before the host
//! returns.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use slideframe_core::{Settings, SettingsStore};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::application::device_cache::DeviceCache;
use crate::application::persistence::SettingsRepository;
use crate::infrastructure::control_api::{build_router, AppState};
use crate::infrastructure::host_config::HostConfig;
use crate::infrastructure::network::dispatcher::RetryingDispatcher;
use crate::infrastructure::network::http_transport::ReqwestTransport;
use crate::infrastructure::network::self_identify::local_endpoints;
use crate::infrastructure::storage::memory::InMemorySettingsRepository;
use crate::infrastructure::storage::settings_file::{
    default_settings_path, TomlSettingsRepository,
};

/// How often the shutdown watcher checks the `running` flag.
const SHUTDOWN_POLL: Duration = Duration::from_millis(200);

/// Builds the settings repository the config asks for.
///
/// # Errors
///
/// Returns an error if persistence is enabled, no path was given, and the
/// platform config directory cannot be determined.
pub fn build_repository(config: &HostConfig) -> anyhow::Result<Arc<dyn SettingsRepository>> {
    if !config.persist {
        info!("settings persistence disabled; changes last until exit");
        return Ok(Arc::new(InMemorySettingsRepository::default()));
    }
    let path = match &config.settings_path {
        Some(path) => path.clone(),
        None => default_settings_path().context("cannot locate the settings file")?,
    };
    info!("settings file: {}", path.display());
    Ok(Arc::new(
        TomlSettingsRepository::new(path).with_device_port(config.device_port),
    ))
}

/// Runs the host until `running` is cleared.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be built, the settings file
/// location cannot be resolved, or the listener cannot be bound.
pub async fn run_host(config: HostConfig, running: Arc<AtomicBool>) -> anyhow::Result<()> {
    let repository = build_repository(&config)?;

    let settings = repository.load().unwrap_or_else(|e| {
        warn!("{e}; starting from defaults");
        Settings::default()
    });
    settings.log_summary();
    let store = Arc::new(SettingsStore::new(settings));

    let transport =
        ReqwestTransport::new(config.request_timeout).context("failed to build HTTP client")?;
    let dispatcher = Arc::new(RetryingDispatcher::new(
        transport,
        config.retry.clone(),
        Arc::clone(&running),
    ));
    let devices = Arc::new(DeviceCache::new(dispatcher, config.cache.clone()));

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind control API on {}", config.bind_addr))?;
    info!("control API listening on {}", config.bind_addr);
    for endpoint in local_endpoints(config.service_port()) {
        info!("reachable at {}", endpoint.url());
    }

    {
        let devices = Arc::clone(&devices);
        let repository = Arc::clone(&repository);
        tokio::spawn(async move {
            devices.initialize(repository.as_ref()).await;
        });
    }

    let state = AppState::new(
        store,
        repository,
        devices,
        config.device_port,
        config.service_port(),
    );
    axum::serve(listener, build_router(Arc::clone(&state)))
        .with_graceful_shutdown(wait_for_shutdown(running))
        .await
        .context("control API server failed")?;
    info!("control API stopped");

    state.apply_settings.drain(config.delivery_budget()).await;
    Ok(())
}

async fn wait_for_shutdown(running: Arc<AtomicBool>) {
    while running.load(Ordering::Relaxed) {
        tokio::time::sleep(SHUTDOWN_POLL).await;
    }
}
