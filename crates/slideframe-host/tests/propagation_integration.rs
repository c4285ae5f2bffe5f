//! End-to-end propagation tests over real loopback HTTP.
//!
//! Each test starts one or more scripted "frames" (small axum servers bound
//! to `127.0.0.1:0`) and drives the real [`RetryingDispatcher`] +
//! [`ReqwestTransport`] + [`DeviceCache`] stack against them.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use slideframe_core::{DeviceAddress, DeviceState, Settings, SettingsStore};
use slideframe_host::application::device_cache::{DeviceCache, DeviceCacheConfig};
use slideframe_host::application::persistence::SettingsRepository;
use slideframe_host::infrastructure::control_api::{build_router, AppState};
use slideframe_host::infrastructure::network::dispatcher::{RetryPolicy, RetryingDispatcher};
use slideframe_host::infrastructure::network::http_transport::ReqwestTransport;
use slideframe_host::infrastructure::storage::memory::InMemorySettingsRepository;
use tokio::net::TcpListener;

// ── Scripted frame ────────────────────────────────────────────────────────────

/// A fake remote frame that fails its first `failures` requests with
/// `failure_status`, then answers 200.  `delay` is applied to every request.
struct ScriptedFrame {
    failures: usize,
    failure_status: StatusCode,
    delay: Duration,
    hits: AtomicUsize,
    received: Mutex<Vec<Vec<(String, String)>>>,
}

impl ScriptedFrame {
    fn new(failures: usize, failure_status: StatusCode) -> Arc<Self> {
        Arc::new(Self {
            failures,
            failure_status,
            delay: Duration::ZERO,
            hits: AtomicUsize::new(0),
            received: Mutex::new(Vec::new()),
        })
    }

    fn healthy() -> Arc<Self> {
        Self::new(0, StatusCode::OK)
    }

    fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

async fn scripted_handler(
    State(frame): State<Arc<ScriptedFrame>>,
    Query(params): Query<Vec<(String, String)>>,
) -> StatusCode {
    let n = frame.hits.fetch_add(1, Ordering::SeqCst);
    if !frame.delay.is_zero() {
        tokio::time::sleep(frame.delay).await;
    }
    frame.received.lock().unwrap().push(params);
    if n < frame.failures {
        frame.failure_status
    } else {
        StatusCode::OK
    }
}

/// Serves `frame` on an ephemeral loopback port and returns its address.
async fn serve_frame(frame: Arc<ScriptedFrame>) -> DeviceAddress {
    let app = Router::new()
        .route("/api/sync", get(scripted_handler))
        .route("/api/status", get(scripted_handler))
        .with_state(frame);
    serve(app).await
}

async fn serve(app: Router) -> DeviceAddress {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    DeviceAddress::parse(&addr.to_string()).unwrap()
}

/// An address on which nothing listens.
fn closed_port() -> DeviceAddress {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    DeviceAddress::parse(&format!("127.0.0.1:{port}")).unwrap()
}

fn cache_with(timeout: Duration, running: Arc<AtomicBool>) -> DeviceCache {
    let transport = ReqwestTransport::new(timeout).unwrap();
    let dispatcher = RetryingDispatcher::new(
        transport,
        RetryPolicy {
            max_attempts: 3,
            delay: Duration::from_millis(10),
        },
        running,
    );
    DeviceCache::new(
        Arc::new(dispatcher),
        DeviceCacheConfig {
            max_concurrency: 8,
            init_wait: Duration::from_millis(50),
        },
    )
}

fn cache() -> DeviceCache {
    cache_with(Duration::from_secs(2), Arc::new(AtomicBool::new(true)))
}

async fn state_of(cache: &DeviceCache, address: &DeviceAddress) -> DeviceState {
    cache
        .snapshot()
        .await
        .into_iter()
        .find(|d| &d.address == address)
        .map(|d| d.state)
        .expect("device is registered")
}

// ── Retry behaviour ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_transient_failure_then_success_marks_device_reachable() {
    // Arrange: first request answers 503
    let frame = ScriptedFrame::new(1, StatusCode::SERVICE_UNAVAILABLE);
    let address = serve_frame(frame.clone()).await;
    let cache = cache();
    cache.register(address.clone()).await;

    // Act
    let report = cache.propagate_setting("rotation", "90").await;

    // Assert
    assert_eq!(report.succeeded(), 1);
    assert_eq!(frame.hits(), 2);
    assert_eq!(state_of(&cache, &address).await, DeviceState::Reachable);
}

#[tokio::test]
async fn test_persistent_server_errors_exhaust_retries() {
    let frame = ScriptedFrame::new(usize::MAX, StatusCode::INTERNAL_SERVER_ERROR);
    let address = serve_frame(frame.clone()).await;
    let cache = cache();
    cache.register(address.clone()).await;

    let report = cache.propagate_setting("rotation", "90").await;

    assert_eq!(report.failed(), 1);
    assert_eq!(frame.hits(), 3);
    assert_eq!(state_of(&cache, &address).await, DeviceState::Unreachable);
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let frame = ScriptedFrame::new(usize::MAX, StatusCode::NOT_FOUND);
    let address = serve_frame(frame.clone()).await;
    let cache = cache();
    cache.register(address.clone()).await;

    let report = cache.propagate_setting("rotation", "90").await;

    assert_eq!(report.failed(), 1);
    assert_eq!(frame.hits(), 1);
    assert_eq!(state_of(&cache, &address).await, DeviceState::Unreachable);
}

#[tokio::test]
async fn test_too_many_requests_is_retried() {
    let frame = ScriptedFrame::new(2, StatusCode::TOO_MANY_REQUESTS);
    let address = serve_frame(frame.clone()).await;
    let cache = cache();
    cache.register(address.clone()).await;

    let report = cache.propagate_setting("shuffle", "on").await;

    assert_eq!(report.succeeded(), 1);
    assert_eq!(frame.hits(), 3);
}

#[tokio::test]
async fn test_slow_frame_times_out_and_is_retried() {
    // Arrange: every request takes longer than the client timeout
    let frame = Arc::new(ScriptedFrame {
        failures: 0,
        failure_status: StatusCode::OK,
        delay: Duration::from_millis(500),
        hits: AtomicUsize::new(0),
        received: Mutex::new(Vec::new()),
    });
    let address = serve_frame(frame.clone()).await;
    let cache = cache_with(Duration::from_millis(100), Arc::new(AtomicBool::new(true)));
    cache.register(address.clone()).await;

    // Act
    let report = cache.propagate_setting("rotation", "90").await;

    // Assert
    assert_eq!(report.failed(), 1);
    assert_eq!(frame.hits(), 3);
    assert!(report.deliveries[0]
        .error
        .as_deref()
        .is_some_and(|e| e.contains("timed out")));
}

#[tokio::test]
async fn test_closed_port_is_unreachable() {
    let address = closed_port();
    let cache = cache();
    cache.register(address.clone()).await;

    let report = cache.propagate_setting("rotation", "90").await;

    assert_eq!(report.failed(), 1);
    assert_eq!(state_of(&cache, &address).await, DeviceState::Unreachable);
}

// ── Fan-out ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_mixed_fleet_isolates_failures() {
    // Arrange
    let healthy = ScriptedFrame::healthy();
    let broken = ScriptedFrame::new(usize::MAX, StatusCode::BAD_GATEWAY);
    let healthy_addr = serve_frame(healthy.clone()).await;
    let broken_addr = serve_frame(broken.clone()).await;
    let dead_addr = closed_port();
    let cache = cache();
    for a in [&healthy_addr, &broken_addr, &dead_addr] {
        cache.register(a.clone()).await;
    }

    // Act
    let report = cache.propagate_setting("date_time_format", "HH:mm").await;

    // Assert
    assert_eq!(report.deliveries.len(), 3);
    assert_eq!(report.succeeded(), 1);
    assert_eq!(state_of(&cache, &healthy_addr).await, DeviceState::Reachable);
    assert_eq!(state_of(&cache, &broken_addr).await, DeviceState::Unreachable);
    assert_eq!(state_of(&cache, &dead_addr).await, DeviceState::Unreachable);
    assert_eq!(
        healthy.received.lock().unwrap()[0],
        vec![("date_time_format".to_string(), "HH:mm".to_string())]
    );
}

#[tokio::test]
async fn test_initialize_checks_persisted_devices() {
    let healthy = ScriptedFrame::healthy();
    let healthy_addr = serve_frame(healthy.clone()).await;
    let dead_addr = closed_port();
    let mut settings = Settings::default();
    settings.remote_clients = vec![healthy_addr.to_string(), dead_addr.to_string()];
    let repo = InMemorySettingsRepository::new(settings);
    let cache = cache();

    let reports = cache.initialize(&repo).await;

    assert_eq!(reports.len(), 2);
    assert!(cache.is_ready());
    assert_eq!(healthy.hits(), 1);
    assert_eq!(state_of(&cache, &healthy_addr).await, DeviceState::Reachable);
    assert_eq!(state_of(&cache, &dead_addr).await, DeviceState::Unreachable);
}

#[tokio::test]
async fn test_shutdown_flag_stops_deliveries() {
    let frame = ScriptedFrame::healthy();
    let address = serve_frame(frame.clone()).await;
    let running = Arc::new(AtomicBool::new(true));
    let cache = cache_with(Duration::from_secs(2), Arc::clone(&running));
    cache.register(address.clone()).await;

    running.store(false, Ordering::SeqCst);
    let report = cache.propagate_setting("rotation", "90").await;

    assert_eq!(report.failed(), 1);
    assert_eq!(frame.hits(), 0);
    assert_eq!(state_of(&cache, &address).await, DeviceState::Unknown);
}

// ── Leader → follower ─────────────────────────────────────────────────────────

struct Frame {
    address: DeviceAddress,
    store: Arc<SettingsStore>,
    repository: Arc<InMemorySettingsRepository>,
}

/// Starts a complete host (control API + device cache) on loopback.
async fn start_frame(settings: Settings) -> Frame {
    let store = Arc::new(SettingsStore::new(settings.clone()));
    let repository = Arc::new(InMemorySettingsRepository::new(settings));
    let devices = Arc::new(cache());
    devices.initialize(repository.as_ref()).await;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = AppState::new(
        Arc::clone(&store),
        Arc::clone(&repository) as Arc<dyn SettingsRepository>,
        devices,
        8000,
        addr.port(),
    );
    let app = build_router(state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Frame {
        address: DeviceAddress::parse(&addr.to_string()).unwrap(),
        store,
        repository,
    }
}

async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

#[tokio::test]
async fn test_leader_change_reaches_follower() {
    // Arrange: a follower, and a sync-enabled leader
    let follower = start_frame(Settings::default()).await;
    let mut leader_settings = Settings::default();
    leader_settings.is_sync_enabled = true;
    let leader = start_frame(leader_settings).await;
    let client = reqwest::Client::new();

    let register = client
        .put(format!(
            "{}/api/devices/{}",
            leader.address.base_url(),
            follower.address
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(register.status(), 200);

    // Act: operator changes two settings on the leader
    let apply = client
        .get(format!("{}/api/settings/apply", leader.address.base_url()))
        .query(&[("slideshow_transition_time", "12000"), ("shuffle", "on")])
        .send()
        .await
        .unwrap();
    assert_eq!(apply.status(), 200);

    // Assert: the follower converges, and persisted what it received
    let converged = eventually(|| {
        let s = follower.store.snapshot();
        s.slideshow_transition_time == 12000 && s.shuffle
    })
    .await;
    assert!(converged, "follower never received the change");
    assert!(follower.repository.current().shuffle);
    assert_eq!(leader.store.snapshot().slideshow_transition_time, 12000);
    assert_eq!(
        leader.repository.current().remote_clients,
        vec![follower.address.to_string()]
    );
}

#[tokio::test]
async fn test_follower_does_not_echo_changes_back() {
    // Arrange: the follower is (mis)configured as a leader pointing back
    let leader_probe = ScriptedFrame::healthy();
    let leader_addr = serve_frame(leader_probe.clone()).await;
    let mut settings = Settings::default();
    settings.is_sync_enabled = true;
    settings.remote_clients = vec![leader_addr.to_string()];
    let follower = start_frame(settings).await;
    let hits_after_probe = leader_probe.hits();

    // Act: a push arrives from the leader
    let response = reqwest::Client::new()
        .get(format!("{}/api/sync", follower.address.base_url()))
        .query(&[("rotation", "270")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Assert
    assert_eq!(follower.store.snapshot().rotation, 270);
    assert_eq!(leader_probe.hits(), hits_after_probe);
}
