//! Slideframe host: entry point.
//!
//! Runs the control surface of one photo frame.  The frame serves its
//! settings over HTTP, accepts changes from operators and from a sync leader,
//! and, when it is itself the leader (`is_sync_enabled`), pushes every change
//! to the frames listed in `remote_clients`.
//!
//! # Usage
//!
//! ```text
//! slideframe-host [OPTIONS]
//!
//! Options:
//!   --bind <IP>                 Control API bind address [default: 0.0.0.0]
//!   --port <PORT>               Control API port [default: 8000]
//!   --settings-file <PATH>      Settings TOML [default: platform config dir]
//!   --no-persist                Keep settings in memory only
//!   --device-port <PORT>        Port of remote frames listed without one [default: 8000]
//!   --retry-attempts <N>        Attempts per delivery, including the first [default: 3]
//!   --retry-delay-ms <MS>       Delay between attempts [default: 250]
//!   --request-timeout-ms <MS>   Per-request timeout [default: 2000]
//!   --max-concurrency <N>       Deliveries in flight per propagation [default: 8]
//!   --init-wait-ms <MS>         How long propagation waits for startup probing [default: 5000]
//!   --log-level <FILTER>        Default log filter when RUST_LOG is unset [default: info]
//! ```
//!
//! Every option can also be set through an environment variable named
//! `SLIDEFRAME_<OPTION>` (e.g. `SLIDEFRAME_PORT`).  CLI args take precedence
//! when both are present.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::{ensure, Context};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use slideframe_host::application::device_cache::DeviceCacheConfig;
use slideframe_host::infrastructure::host_config::HostConfig;
use slideframe_host::infrastructure::network::dispatcher::RetryPolicy;
use slideframe_host::infrastructure::server::run_host;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Slideframe host.
///
/// Serves this frame's settings and keeps remote frames in sync.
#[derive(Debug, Parser)]
#[command(
    name = "slideframe-host",
    about = "Settings control surface and fleet sync for Slideframe photo frames",
    version
)]
struct Cli {
    /// IP address to bind the control API to.
    ///
    /// `0.0.0.0` accepts connections on every interface, which is what remote
    /// leaders and operators on the LAN need.
    #[arg(long, default_value = "0.0.0.0", env = "SLIDEFRAME_BIND")]
    bind: String,

    /// TCP port of the control API.
    #[arg(long, default_value_t = 8000, env = "SLIDEFRAME_PORT")]
    port: u16,

    /// Settings file location.  Defaults to the platform config directory.
    #[arg(long, env = "SLIDEFRAME_SETTINGS_FILE")]
    settings_file: Option<PathBuf>,

    /// Keep settings in memory only; nothing is read from or written to disk.
    #[arg(long, env = "SLIDEFRAME_NO_PERSIST")]
    no_persist: bool,

    /// Port assumed for remote frames whose address has none.
    #[arg(long, default_value_t = 8000, env = "SLIDEFRAME_DEVICE_PORT")]
    device_port: u16,

    /// Attempts per delivery to a remote frame, including the first.
    #[arg(long, default_value_t = 3, env = "SLIDEFRAME_RETRY_ATTEMPTS")]
    retry_attempts: u32,

    /// Delay between delivery attempts, in milliseconds.
    #[arg(long, default_value_t = 250, env = "SLIDEFRAME_RETRY_DELAY_MS")]
    retry_delay_ms: u64,

    /// Timeout of one outbound request, in milliseconds.
    #[arg(long, default_value_t = 2000, env = "SLIDEFRAME_REQUEST_TIMEOUT_MS")]
    request_timeout_ms: u64,

    /// Maximum deliveries in flight during one propagation.
    #[arg(long, default_value_t = 8, env = "SLIDEFRAME_MAX_CONCURRENCY")]
    max_concurrency: usize,

    /// How long an early propagation waits for the startup probe, in
    /// milliseconds.
    #[arg(long, default_value_t = 5000, env = "SLIDEFRAME_INIT_WAIT_MS")]
    init_wait_ms: u64,

    /// Log filter used when `RUST_LOG` is not set.
    #[arg(long, default_value = "info", env = "SLIDEFRAME_LOG_LEVEL")]
    log_level: String,
}

impl Cli {
    /// Converts the parsed CLI arguments into a [`HostConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if `--bind` is not an IP address or a numeric option
    /// is out of range.
    fn into_host_config(self) -> anyhow::Result<HostConfig> {
        let ip: IpAddr = self
            .bind
            .parse()
            .with_context(|| format!("invalid bind address: '{}'", self.bind))?;
        ensure!(self.port != 0, "--port must not be 0");
        ensure!(self.device_port != 0, "--device-port must not be 0");
        ensure!(self.retry_attempts >= 1, "--retry-attempts must be at least 1");
        ensure!(self.max_concurrency >= 1, "--max-concurrency must be at least 1");
        ensure!(self.request_timeout_ms > 0, "--request-timeout-ms must be positive");

        Ok(HostConfig {
            bind_addr: SocketAddr::new(ip, self.port),
            settings_path: self.settings_file,
            persist: !self.no_persist,
            device_port: self.device_port,
            retry: RetryPolicy {
                max_attempts: self.retry_attempts,
                delay: Duration::from_millis(self.retry_delay_ms),
            },
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            cache: DeviceCacheConfig {
                max_concurrency: self.max_concurrency,
                init_wait: Duration::from_millis(self.init_wait_ms),
            },
        })
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over --log-level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .init();

    let config = cli.into_host_config()?;
    info!(
        "slideframe host {} starting on {}",
        env!("CARGO_PKG_VERSION"),
        config.bind_addr
    );

    // ── Graceful shutdown flag ────────────────────────────────────────────────
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C; shutting down");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => {
                tracing::error!("failed to listen for Ctrl+C signal: {e}");
            }
        }
    });

    run_host(config, running).await?;

    info!("slideframe host stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
