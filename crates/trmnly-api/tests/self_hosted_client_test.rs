#![allow(clippy::unwrap_used)]
// Integration tests for `SelfHostedClient` using wiremock.

use std::time::Duration;

use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use trmnly_api::{
    DevicePatch, Error, ManagementApi, ModelPatch, NewDevice, NewModel, NewScreen,
    SelfHostedClient, ScreenImage, ScreenPatch, TransportConfig, TrmnlBackend,
};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, SelfHostedClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let client = SelfHostedClient::new(base_url, None, &TransportConfig::default()).unwrap();
    (server, client)
}

fn devices_envelope() -> serde_json::Value {
    json!({
        "data": [
            {
                "id": 1,
                "friendly_id": "ABC123",
                "label": "Kitchen",
                "mac_address": "AA:BB:CC:00:11:22",
                "api_key": "device-key",
                "refresh_rate": 900,
                "battery_voltage": 3.9
            },
            {
                "id": 2,
                "friendly_id": "XYZ789",
                "label": "Office",
                "mac_address": "AA:BB:CC:00:11:33",
                "refresh_rate": 1800
            }
        ]
    })
}

async fn mount_devices(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(devices_envelope()))
        .mount(server)
        .await;
}

// ── Listing ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_devices_unwraps_envelope() {
    let (server, client) = setup().await;
    mount_devices(&server).await;

    let devices = client.list_devices().await.unwrap();

    assert_eq!(devices.len(), 2);
    assert_eq!(devices[0].friendly_id.as_deref(), Some("ABC123"));
    assert_eq!(devices[0].battery, Some(3.9));
    assert_eq!(devices[1].refresh_rate, Some(1800));
}

#[tokio::test]
async fn test_list_devices_without_data_is_empty() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "devices": [] })))
        .mount(&server)
        .await;

    assert!(client.list_devices().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_list_devices_skips_malformed_entries() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "id": 5, "friendly_id": "OK" }, { "friendly_id": "NO-ID" }]
        })))
        .mount(&server)
        .await;

    let devices = client.list_devices().await.unwrap();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].id, 5);
}

#[tokio::test]
async fn test_list_devices_keeps_record_with_duplicate_spellings() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{
                "id": 7,
                "friendly_id": "ABC",
                "last_seen_at": "2026-03-01T10:00:00Z",
                "updated_at": "2026-03-02T09:00:00Z",
                "battery": 3.95,
                "battery_voltage": 3.7,
                "wifi": -50,
                "rssi": -70
            }]
        })))
        .mount(&server)
        .await;

    let device = client.find_device("ABC").await.unwrap().unwrap();
    assert_eq!(device.id, 7);
    assert_eq!(device.last_seen.as_deref(), Some("2026-03-01T10:00:00Z"));
    assert_eq!(device.battery, Some(3.95));
    assert_eq!(device.wifi, Some(-50));
}

#[tokio::test]
async fn test_find_device_by_either_alias() {
    let (server, client) = setup().await;
    mount_devices(&server).await;

    let by_friendly = client.find_device("XYZ789").await.unwrap().unwrap();
    let by_numeric = client.find_device("2").await.unwrap().unwrap();
    assert_eq!(by_friendly, by_numeric);
    assert!(client.find_device("NOPE").await.unwrap().is_none());
}

// ── Status mapping ──────────────────────────────────────────────────

#[tokio::test]
async fn test_not_found_maps_to_not_found() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/devices"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let result = client.list_devices().await;
    assert!(
        matches!(result, Err(Error::NotFound { .. })),
        "expected NotFound, got: {result:?}"
    );
}

#[tokio::test]
async fn test_server_error_carries_status_and_body() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/devices"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    match client.list_devices().await {
        Err(Error::Api { status, body }) => {
            assert_eq!(status, 500);
            assert_eq!(body, "boom");
        }
        other => panic!("expected Api error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_unauthorized_maps_to_authentication() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/devices"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = client.list_devices().await.unwrap_err();
    assert!(err.is_auth(), "expected auth error, got: {err:?}");
}

#[tokio::test]
async fn test_slow_server_times_out() {
    let server = MockServer::start().await;
    let config = TransportConfig {
        timeout: Duration::from_millis(200),
    };
    let client =
        SelfHostedClient::new(Url::parse(&server.uri()).unwrap(), None, &config).unwrap();

    Mock::given(method("GET"))
        .and(path("/api/devices"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(devices_envelope())
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let err = client.list_devices().await.unwrap_err();
    assert!(
        matches!(err, Error::Timeout { .. }),
        "expected Timeout, got: {err:?}"
    );
}

// ── Success bodies ──────────────────────────────────────────────────

#[tokio::test]
async fn test_no_content_matches_empty_ok_body() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/no-content"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/empty"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let no_content = client.transport().get("/no-content").await.unwrap();
    let empty = client.transport().get("/empty").await.unwrap();

    assert!(no_content.is_marker());
    assert!(empty.is_marker());
    assert_eq!(no_content.body, empty.body);
    assert_eq!(no_content.body, json!({ "status": "ok" }));
}

// ── Writes ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_refresh_rate_patch_targets_numeric_id() {
    let (server, client) = setup().await;
    mount_devices(&server).await;

    Mock::given(method("PATCH"))
        .and(path("/api/devices/1"))
        .and(body_json(json!({ "device": { "refresh_rate": 10 } })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client.set_refresh_rate("ABC123", 10).await.unwrap();
}

#[tokio::test]
async fn test_non_json_success_is_not_an_error() {
    let (server, client) = setup().await;
    mount_devices(&server).await;

    Mock::given(method("PATCH"))
        .and(path("/api/devices/2"))
        .respond_with(ResponseTemplate::new(200).set_body_string("updated"))
        .mount(&server)
        .await;

    let patch = DevicePatch {
        label: Some("Den".into()),
        ..DevicePatch::default()
    };
    client.update_device("2", &patch).await.unwrap();
}

#[tokio::test]
async fn test_update_unknown_device_is_not_found() {
    let (server, client) = setup().await;
    mount_devices(&server).await;

    let err = client
        .update_device("GHOST", &DevicePatch::refresh_rate(10))
        .await
        .unwrap_err();
    assert!(err.is_not_found(), "expected NotFound, got: {err:?}");
}

#[tokio::test]
async fn test_create_device_falls_back_to_listing() {
    let (server, client) = setup().await;
    mount_devices(&server).await;

    Mock::given(method("POST"))
        .and(path("/api/devices"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;

    let new = NewDevice {
        label: "Office".into(),
        mac_address: "aa:bb:cc:00:11:33".into(),
        ..NewDevice::default()
    };
    let created = client
        .management()
        .unwrap()
        .create_device(&new)
        .await
        .unwrap();
    assert_eq!(created.id, 2);
}

// ── Screens ─────────────────────────────────────────────────────────

async fn mount_screens(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/screens"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                { "id": 4, "name": "kitchen-dash", "model_id": 1 },
                { "id": 5, "name": "office-dash", "label": "Office" }
            ]
        })))
        .mount(server)
        .await;
}

fn new_screen() -> NewScreen {
    NewScreen {
        name: "kitchen-dash".into(),
        label: None,
        model_id: Some(1),
        image: ScreenImage::from_bytes(b"png"),
    }
}

#[tokio::test]
async fn test_fetch_screens_unwraps_envelope() {
    let (server, client) = setup().await;
    mount_screens(&server).await;

    let screens = client.fetch_screens().await.unwrap();
    assert_eq!(screens.len(), 2);
    assert_eq!(screens[1].label.as_deref(), Some("Office"));
}

#[tokio::test]
async fn test_post_screen_wraps_body_and_decodes_reply() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/screens"))
        .and(body_json(json!({
            "screen": {
                "name": "kitchen-dash",
                "model_id": 1,
                "image": { "data": "cG5n" }
            }
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "data": { "id": 9, "name": "kitchen-dash" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let created = client.post_screen(&new_screen()).await.unwrap();
    assert_eq!(created.id, 9);
}

#[tokio::test]
async fn test_post_screen_without_body_relists_by_name() {
    let (server, client) = setup().await;
    mount_screens(&server).await;

    Mock::given(method("POST"))
        .and(path("/api/screens"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;

    let created = client.post_screen(&new_screen()).await.unwrap();
    assert_eq!(created.id, 4);
}

#[tokio::test]
async fn test_patch_screen_resolves_name_to_numeric_id() {
    let (server, client) = setup().await;
    mount_screens(&server).await;

    Mock::given(method("PATCH"))
        .and(path("/api/screens/4"))
        .and(body_json(json!({ "screen": { "label": "Kitchen" } })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let patch = ScreenPatch {
        label: Some("Kitchen".into()),
        ..ScreenPatch::default()
    };
    client.patch_screen("kitchen-dash", &patch).await.unwrap();
}

#[tokio::test]
async fn test_remove_screen_by_numeric_id() {
    let (server, client) = setup().await;
    mount_screens(&server).await;

    Mock::given(method("DELETE"))
        .and(path("/api/screens/5"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client.remove_screen("5").await.unwrap();
}

#[tokio::test]
async fn test_remove_unknown_screen_is_not_found() {
    let (server, client) = setup().await;
    mount_screens(&server).await;

    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let err = client.remove_screen("ghost-dash").await.unwrap_err();
    assert!(err.is_not_found(), "expected NotFound, got: {err:?}");
}

// ── Models ──────────────────────────────────────────────────────────

async fn mount_models(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                { "id": 1, "name": "og_png", "label": "TRMNL OG", "description": "Original" },
                { "id": 2, "name": "v2", "description": "Seven point five" },
                { "id": 3, "name": "bare" }
            ]
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_fetch_models_unwraps_envelope() {
    let (server, client) = setup().await;
    mount_models(&server).await;

    let models = client.fetch_models().await.unwrap();
    assert_eq!(models.len(), 3);
    assert_eq!(models[0].name.as_deref(), Some("og_png"));
}

#[tokio::test]
async fn test_model_names_prefer_label_then_description() {
    let (server, client) = setup().await;
    mount_models(&server).await;

    let names = client.management().unwrap().model_names().await.unwrap();
    assert_eq!(names[&1], "TRMNL OG");
    assert_eq!(names[&2], "Seven point five");
    assert_eq!(names[&3], "Model 3");
}

#[tokio::test]
async fn test_post_model_wraps_body() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/models"))
        .and(body_json(json!({
            "model": { "name": "x", "width": 800, "height": 480 }
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "data": { "id": 12, "name": "x", "width": 800, "height": 480 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let new = NewModel {
        name: "x".into(),
        label: None,
        description: None,
        width: 800,
        height: 480,
    };
    assert_eq!(client.post_model(&new).await.unwrap().id, 12);
}

#[tokio::test]
async fn test_patch_model_resolves_name_to_numeric_id() {
    let (server, client) = setup().await;
    mount_models(&server).await;

    Mock::given(method("PATCH"))
        .and(path("/api/models/2"))
        .and(body_json(json!({ "model": { "width": 800 } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": {} })))
        .expect(1)
        .mount(&server)
        .await;

    let patch = ModelPatch {
        width: Some(800),
        ..ModelPatch::default()
    };
    client.patch_model("v2", &patch).await.unwrap();
}

#[tokio::test]
async fn test_remove_model_by_numeric_id() {
    let (server, client) = setup().await;
    mount_models(&server).await;

    Mock::given(method("DELETE"))
        .and(path("/api/models/3"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client.remove_model("3").await.unwrap();
}

#[tokio::test]
async fn test_patch_unknown_model_is_not_found() {
    let (server, client) = setup().await;
    mount_models(&server).await;

    let err = client
        .patch_model("nope", &ModelPatch::default())
        .await
        .unwrap_err();
    assert!(err.is_not_found(), "expected NotFound, got: {err:?}");
}

// ── Display content ─────────────────────────────────────────────────

#[tokio::test]
async fn test_display_content_identifies_device_by_mac() {
    let (server, client) = setup().await;
    mount_devices(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/display"))
        .and(header("ID", "AA:BB:CC:00:11:22"))
        .and(header("Access-Token", "device-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "image_url": "http://host/images/a.png",
            "filename": "a.png",
            "refresh_rate": 900
        })))
        .expect(1)
        .mount(&server)
        .await;

    let content = client.display_content("ABC123").await.unwrap();
    assert_eq!(content.filename.as_deref(), Some("a.png"));
    assert_eq!(content.refresh_rate, Some(900));
}

// ── Connection test ─────────────────────────────────────────────────

#[tokio::test]
async fn test_connection_ok() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .mount(&server)
        .await;

    assert!(client.test_connection().await);
}

#[tokio::test]
async fn test_connection_rejected_credentials_is_false() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    assert!(!client.test_connection().await);
}

#[tokio::test]
async fn test_connection_falls_back_to_tcp() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    // Listener is up, so the TCP probe succeeds.
    assert!(client.test_connection().await);
}

#[tokio::test]
async fn test_bearer_token_is_sent() {
    let server = MockServer::start().await;
    let client = SelfHostedClient::new(
        Url::parse(&server.uri()).unwrap(),
        Some("tok".to_string().into()),
        &TransportConfig::default(),
    )
    .unwrap();

    Mock::given(method("GET"))
        .and(path("/api/devices"))
        .and(header("Authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(devices_envelope()))
        .expect(1)
        .mount(&server)
        .await;

    assert_eq!(client.list_devices().await.unwrap().len(), 2);
}
