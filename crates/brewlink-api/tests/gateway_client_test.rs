#![allow(clippy::unwrap_used)]
// Integration tests for `GatewayClient` using wiremock.

use std::time::Duration;

use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use brewlink_api::channel::ChannelState;
use brewlink_api::types::ShotSettingsDto;
use brewlink_api::{BackoffSchedule, Error, GatewayClient, paths};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, GatewayClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    // Streaming tests use an unroutable ws base; REST tests never dial it.
    let ws_base = Url::parse("ws://127.0.0.1:1/").unwrap();
    let client = GatewayClient::from_reqwest(reqwest::Client::new(), base_url, ws_base);
    (server, client)
}

// ── REST tests ──────────────────────────────────────────────────────

#[tokio::test]
async fn list_devices() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "de1-01", "name": "DE1", "type": "machine", "state": "connected" },
            { "id": "lunar-7", "name": "Lunar", "type": "scale" }
        ])))
        .mount(&server)
        .await;

    let devices = client.devices().await.unwrap();

    assert_eq!(devices.len(), 2);
    assert_eq!(devices[0].id, "de1-01");
    assert_eq!(devices[0].device_type, "machine");
    assert_eq!(devices[1].name.as_deref(), Some("Lunar"));
    assert_eq!(devices[1].state, None);
}

#[tokio::test]
async fn failure_status_yields_api_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/machine/info"))
        .respond_with(ResponseTemplate::new(503).set_body_string("machine not connected"))
        .mount(&server)
        .await;

    let result = client.machine_info().await;

    match result {
        Err(Error::Api { status, body }) => {
            assert_eq!(status, 503);
            assert_eq!(body, "machine not connected");
        }
        other => panic!("expected Api error, got: {other:?}"),
    }
}

#[tokio::test]
async fn empty_success_body_is_empty_result() {
    let (server, client) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/api/v1/scale/tare"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    client.scale_tare().await.unwrap();
}

#[tokio::test]
async fn state_change_hits_parameterized_path() {
    let (server, client) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/api/v1/machine/state/espresso"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client.set_machine_state("espresso").await.unwrap();
}

#[tokio::test]
async fn shot_settings_post_carries_camel_case_body() {
    let (server, client) = setup().await;

    let settings = ShotSettingsDto {
        steam_setting: Some(1),
        target_steam_temp: Some(150.0),
        target_hot_water_temp: Some(85.0),
        target_shot_volume: Some(36.0),
        group_temp: Some(92.5),
        ..ShotSettingsDto::default()
    };

    Mock::given(method("POST"))
        .and(path("/api/v1/machine/shotSettings"))
        .and(body_json(json!({
            "steamSetting": 1,
            "targetSteamTemp": 150.0,
            "targetSteamDuration": null,
            "targetHotWaterTemp": 85.0,
            "targetHotWaterVolume": null,
            "targetHotWaterDuration": null,
            "targetShotVolume": 36.0,
            "groupTemp": 92.5
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client.set_shot_settings(&settings).await.unwrap();
}

#[tokio::test]
async fn multibyte_body_near_preview_cut_is_a_clean_error() {
    let (server, client) = setup().await;

    // Not JSON, with a two-byte char straddling the preview length.
    let mut body = "x".repeat(199);
    body.push('é');
    body.push_str(" and some trailing garbage");

    Mock::given(method("GET"))
        .and(path("/api/v1/machine/info"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let result = client.machine_info().await;

    assert!(matches!(result, Err(Error::Deserialization { .. })));
}

#[tokio::test]
async fn sparse_water_levels_body_parses() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/machine/waterLevels"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "currentPercentage": 62.5
        })))
        .mount(&server)
        .await;

    let levels = client.water_levels().await.unwrap();
    assert_eq!(levels.current_percentage, Some(62.5));
    assert_eq!(levels.warning_threshold_percentage, None);
}

// ── Liveness ────────────────────────────────────────────────────────

#[tokio::test]
async fn is_reachable_follows_enumeration_status() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    assert!(client.is_reachable().await);
}

#[tokio::test]
async fn is_reachable_is_false_for_dead_endpoint() {
    let base = Url::parse("http://127.0.0.1:1/").unwrap();
    let ws = Url::parse("ws://127.0.0.1:1/").unwrap();
    let client = GatewayClient::from_reqwest(reqwest::Client::new(), base, ws);

    assert!(!client.is_reachable().await);
}

// ── Streaming channel registry ──────────────────────────────────────

#[tokio::test]
async fn connect_channel_is_idempotent() {
    let (_server, client) = setup().await;

    let _first = client.connect_channel(paths::MACHINE_SNAPSHOT).unwrap();
    let _second = client.connect_channel(paths::MACHINE_SNAPSHOT).unwrap();

    // One underlying channel for the path, shared by both handles.
    assert_eq!(client.channel_count(), 1);

    let _other = client.connect_channel(paths::SCALE_SNAPSHOT).unwrap();
    assert_eq!(client.channel_count(), 2);

    client.dispose_all().await;
    assert_eq!(client.channel_count(), 0);
}

#[tokio::test]
async fn dispose_all_prevents_reconnect() {
    let (_server, client) = setup().await;
    // ws base points at a closed port, so every attempt fails fast.
    let client = client.with_backoff(BackoffSchedule {
        initial: Duration::from_millis(100),
        max: Duration::from_secs(1),
    });

    let handle = client.connect_channel(paths::MACHINE_SNAPSHOT).unwrap();
    let mut state = handle.state_stream();

    // Wait until the channel has failed once and entered backoff.
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if matches!(*state.borrow(), ChannelState::Backoff { .. }) {
                break;
            }
            state.changed().await.unwrap();
        }
    })
    .await
    .expect("channel should reach backoff");

    client.dispose_all().await;
    assert_eq!(handle.state(), ChannelState::Disposed);

    // Wait out more than a full backoff interval: still disposed, no
    // reconnect attempt.
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(handle.state(), ChannelState::Disposed);
}

#[tokio::test]
async fn disconnect_channel_removes_only_that_path() {
    let (_server, client) = setup().await;

    let _a = client.connect_channel(paths::MACHINE_SNAPSHOT).unwrap();
    let _b = client.connect_channel(paths::MACHINE_WATER_LEVELS).unwrap();
    assert_eq!(client.channel_count(), 2);

    client.disconnect_channel(paths::MACHINE_SNAPSHOT).await;
    assert_eq!(client.channel_count(), 1);

    client.dispose_all().await;
}
