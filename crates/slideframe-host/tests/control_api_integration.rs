//! Control API tests driven through the router with `tower::ServiceExt`.
//!
//! No sockets: every request goes through `Router::oneshot`.  Remote frames
//! are replaced by a recording [`SettingsDispatcher`].

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use slideframe_core::{DeviceAddress, Settings, SettingsStore};
use slideframe_host::application::device_cache::{
    DeviceCache, DeviceCacheConfig, DispatchError, SettingsDispatcher,
};
use slideframe_host::application::persistence::SettingsRepository;
use slideframe_host::infrastructure::control_api::{build_router, AppState};
use slideframe_host::infrastructure::storage::memory::InMemorySettingsRepository;
use tower::ServiceExt;

// ── Harness ───────────────────────────────────────────────────────────────────

#[derive(Default)]
struct RecordingDispatcher {
    pushes: Mutex<Vec<(String, String, String)>>,
}

#[async_trait]
impl SettingsDispatcher for RecordingDispatcher {
    async fn push_setting(
        &self,
        device: &DeviceAddress,
        field: &str,
        value: &str,
    ) -> Result<(), DispatchError> {
        self.pushes
            .lock()
            .unwrap()
            .push((device.to_string(), field.to_string(), value.to_string()));
        Ok(())
    }

    async fn probe(&self, _device: &DeviceAddress) -> Result<(), DispatchError> {
        Ok(())
    }
}

struct Harness {
    router: Router,
    store: Arc<SettingsStore>,
    repository: Arc<InMemorySettingsRepository>,
    dispatcher: Arc<RecordingDispatcher>,
}

async fn harness(settings: Settings) -> Harness {
    let store = Arc::new(SettingsStore::new(settings.clone()));
    let repository = Arc::new(InMemorySettingsRepository::new(settings));
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let devices = Arc::new(DeviceCache::new(
        Arc::clone(&dispatcher) as Arc<dyn SettingsDispatcher>,
        DeviceCacheConfig {
            max_concurrency: 4,
            init_wait: Duration::from_millis(50),
        },
    ));
    devices.initialize(repository.as_ref()).await;

    let state = AppState::new(
        Arc::clone(&store),
        Arc::clone(&repository) as Arc<dyn SettingsRepository>,
        devices,
        8000,
        8000,
    );
    Harness {
        router: build_router(state),
        store,
        repository,
        dispatcher,
    }
}

async fn send(router: &Router, method: Method, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn get(router: &Router, uri: &str) -> (StatusCode, Value) {
    send(router, Method::GET, uri).await
}

fn outcome_of<'a>(body: &'a Value, field: &str) -> Option<&'a str> {
    body["data"]["fields"]
        .as_array()?
        .iter()
        .find(|f| f["field"] == field)?["outcome"]
        .as_str()
}

// ── Settings ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_get_settings_returns_current_record() {
    let h = harness(Settings::default()).await;

    let (status, body) = get(&h.router, "/api/settings").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["rotation"], 0);
    assert_eq!(body["data"]["shuffle"], false);
}

#[tokio::test]
async fn test_apply_reports_each_field_outcome() {
    // Arrange
    let h = harness(Settings::default()).await;

    // Act
    let (status, body) = get(
        &h.router,
        "/api/settings/apply?rotation=90&video_volume=abc&brightness=3",
    )
    .await;

    // Assert
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome_of(&body, "rotation"), Some("applied"));
    assert_eq!(outcome_of(&body, "video_volume"), Some("parse_failed"));
    assert_eq!(body["data"]["ignored"], serde_json::json!(["brightness"]));
    assert_eq!(body["data"]["persisted"], true);
    assert_eq!(body["data"]["legacy_result"], 1);
    assert_eq!(h.store.snapshot().rotation, 90);
    assert_eq!(h.repository.current().rotation, 90);
}

#[tokio::test]
async fn test_apply_with_only_unknown_fields_persists_nothing() {
    let h = harness(Settings::default()).await;

    let (_, body) = get(&h.router, "/api/settings/apply?brightness=3").await;

    assert_eq!(body["data"]["persisted"], false);
    assert_eq!(body["data"]["legacy_result"], 0);
    assert_eq!(h.repository.save_count(), 0);
}

#[tokio::test]
async fn test_apply_rejects_non_finite_float() {
    let h = harness(Settings::default()).await;

    let (_, body) = get(&h.router, "/api/settings/apply?fade_transition_time=NaN").await;

    assert_eq!(outcome_of(&body, "fade_transition_time"), Some("parse_failed"));
    assert!(h.store.snapshot().fade_transition_time.is_finite());
}

#[tokio::test]
async fn test_apply_without_sync_does_not_push() {
    let mut settings = Settings::default();
    settings.remote_clients = vec!["10.0.0.2".into()];
    let h = harness(settings).await;

    let (_, body) = get(&h.router, "/api/settings/apply?rotation=180").await;

    assert_eq!(body["data"]["propagating"], false);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(h.dispatcher.pushes.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_apply_with_sync_pushes_to_every_remote() {
    // Arrange
    let mut settings = Settings::default();
    settings.is_sync_enabled = true;
    settings.remote_clients = vec!["10.0.0.2".into(), "10.0.0.3:9000".into()];
    let h = harness(settings).await;

    // Act
    let (_, body) = get(&h.router, "/api/settings/apply?shuffle=on&is_sync_enabled=on").await;

    // Assert
    assert_eq!(body["data"]["propagating"], true);
    let mut pushes = Vec::new();
    for _ in 0..50 {
        pushes = h.dispatcher.pushes.lock().unwrap().clone();
        if pushes.len() >= 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    pushes.sort();
    assert_eq!(
        pushes,
        vec![
            ("10.0.0.2:8000".to_string(), "shuffle".to_string(), "on".to_string()),
            ("10.0.0.3:9000".to_string(), "shuffle".to_string(), "on".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_sync_endpoint_applies_without_pushing() {
    let mut settings = Settings::default();
    settings.is_sync_enabled = true;
    settings.remote_clients = vec!["10.0.0.2".into()];
    let h = harness(settings).await;

    let (status, body) = get(&h.router, "/api/sync?date_time_format=HH%3Amm").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome_of(&body, "date_time_format"), Some("applied"));
    assert_eq!(body["data"]["propagating"], false);
    assert_eq!(h.store.snapshot().date_time_format, "HH:mm");
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(h.dispatcher.pushes.lock().unwrap().is_empty());
}

// ── Devices ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_register_device_adds_remote_client() {
    // Arrange
    let h = harness(Settings::default()).await;

    // Act
    let (status, body) = send(&h.router, Method::PUT, "/api/devices/192.168.1.40").await;

    // Assert
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["address"], "192.168.1.40:8000");
    assert_eq!(body["data"]["changed"], true);
    assert_eq!(body["data"]["persisted"], true);
    assert_eq!(
        h.repository.current().remote_clients,
        vec!["192.168.1.40:8000".to_string()]
    );

    let (_, devices) = get(&h.router, "/api/devices").await;
    assert_eq!(devices["data"][0]["address"], "192.168.1.40:8000");
    assert_eq!(devices["data"][0]["state"], "unknown");
}

#[tokio::test]
async fn test_register_twice_is_idempotent() {
    let h = harness(Settings::default()).await;

    send(&h.router, Method::PUT, "/api/devices/192.168.1.40").await;
    let (_, body) = send(&h.router, Method::PUT, "/api/devices/192.168.1.40:8000").await;

    assert_eq!(body["data"]["changed"], false);
    assert_eq!(h.store.snapshot().remote_clients.len(), 1);
}

#[tokio::test]
async fn test_unregister_removes_legacy_entry() {
    // Arrange: entry stored without a port
    let mut settings = Settings::default();
    settings.remote_clients = vec!["192.168.1.40".into(), "192.168.1.41".into()];
    let h = harness(settings).await;

    // Act
    let (status, body) =
        send(&h.router, Method::DELETE, "/api/devices/192.168.1.40:8000").await;

    // Assert
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["changed"], true);
    assert_eq!(
        h.repository.current().remote_clients,
        vec!["192.168.1.41".to_string()]
    );
    let (_, devices) = get(&h.router, "/api/devices").await;
    assert_eq!(devices["data"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn test_invalid_address_is_bad_request() {
    let h = harness(Settings::default()).await;

    let (status, body) = send(&h.router, Method::PUT, "/api/devices/host:notaport").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["error"].is_string());
    assert!(h.store.snapshot().remote_clients.is_empty());
}

// ── Status ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_status_reports_readiness_and_devices() {
    let mut settings = Settings::default();
    settings.is_sync_enabled = true;
    settings.remote_clients = vec!["10.0.0.2".into()];
    let h = harness(settings).await;

    let (status, body) = get(&h.router, "/api/status").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["data"]["sync_enabled"], true);
    assert_eq!(body["data"]["devices_ready"], true);
    assert_eq!(body["data"]["devices"][0]["state"], "reachable");
    assert!(body["data"]["endpoints"].is_array());
}
