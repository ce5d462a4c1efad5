#![allow(clippy::unwrap_used)]
//! Device adapter tests against a wiremock gateway.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use brewlink_api::GatewayClient;
use brewlink_core::device::{Device, Machine, MachineAdapter, Scale, ScaleAdapter};
use brewlink_core::{ConnectionState, CoreError, ShotSettings};

/// A client pointed at the mock REST server, with a streaming base that
/// refuses connections (adapter tests exercise REST and lifecycle, not
/// live sockets).
fn client_for(server: &MockServer) -> Arc<GatewayClient> {
    let base: Url = server.uri().parse().expect("mock server uri");
    let ws_base: Url = "ws://127.0.0.1:1/".parse().expect("static url");
    Arc::new(GatewayClient::from_reqwest(
        reqwest::Client::new(),
        base,
        ws_base,
    ))
}

fn machine_info_body() -> serde_json::Value {
    serde_json::json!({
        "model": "Micra",
        "serial": "LM-1234",
        "firmwareVersion": "3.1.0",
        "apiVersion": "v1"
    })
}

#[tokio::test]
async fn failed_primary_fetch_aborts_connect() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/machine/info"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let machine = MachineAdapter::new("m1", Some("machine".into()), Arc::clone(&client));
    let state = machine.connection_state();

    let err = machine.connect().await.expect_err("connect should fail");
    assert!(matches!(err, CoreError::ConnectionFailed { .. }));

    assert_eq!(*state.borrow(), ConnectionState::Disconnected);
    // No channel may be opened before the primary descriptor succeeds.
    assert_eq!(client.channel_count(), 0);
}

#[tokio::test]
async fn failed_secondary_fetch_does_not_abort_connect() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/machine/info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(machine_info_body()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/machine/shotSettings"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/machine/waterLevels"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "currentPercentage": 80.0
        })))
        .mount(&server)
        .await;

    let machine = MachineAdapter::new("m1", None, client_for(&server));

    machine.connect().await.expect("connect should succeed");
    assert_eq!(*machine.connection_state().borrow(), ConnectionState::Connected);

    // The failed stream stays empty until the first frame arrives.
    assert!(machine.shot_settings().latest().is_none());
    // The successful one was seeded from the one-shot read.
    let levels = machine.water_levels().latest().expect("seeded water levels");
    assert_eq!(levels.current_percentage, Some(80.0));

    machine.disconnect().await;
    assert_eq!(
        *machine.connection_state().borrow(),
        ConnectionState::Disconnected
    );
}

#[tokio::test]
async fn connect_is_idempotent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/machine/info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(machine_info_body()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/machine/shotSettings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/machine/waterLevels"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .mount(&server)
        .await;

    let machine = MachineAdapter::new("m1", None, client_for(&server));

    machine.connect().await.expect("first connect");
    machine.connect().await.expect("second connect is a no-op");

    machine.disconnect().await;
}

#[tokio::test]
async fn cached_steam_flow_is_merged_into_published_settings() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/machine/info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(machine_info_body()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/machine/shotSettings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "targetShotVolume": 36.0
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/machine/waterLevels"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/machine/shotSettings"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let machine = MachineAdapter::new("m1", None, client_for(&server));
    machine.connect().await.expect("connect");

    let settings = ShotSettings {
        target_shot_volume: Some(40.0),
        steam_flow: Some(0.8),
        ..ShotSettings::default()
    };
    machine
        .update_shot_settings(settings)
        .await
        .expect("update settings");

    // Server-owned fields keep their last known value; the cached field
    // is merged so observers see one consistent view.
    let published = machine.shot_settings().latest().expect("published view");
    assert_eq!(published.steam_flow, Some(0.8));
    assert_eq!(published.target_shot_volume, Some(36.0));

    machine.disconnect().await;
}

#[tokio::test]
async fn scale_connect_requires_enumeration_row() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            { "id": "m1", "name": "machine", "type": "machine" }
        ])))
        .mount(&server)
        .await;

    let scale = ScaleAdapter::new("s1", Some("lunar".into()), client_for(&server));

    let err = scale.connect().await.expect_err("scale is not enumerated");
    assert!(matches!(err, CoreError::ConnectionFailed { .. }));
    assert_eq!(
        *scale.connection_state().borrow(),
        ConnectionState::Disconnected
    );
}

#[tokio::test]
async fn scale_tare_hits_command_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            { "id": "s1", "name": "lunar", "type": "scale" }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/scale/tare"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/scale/disconnect"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let scale = ScaleAdapter::new("s1", None, client_for(&server));
    scale.connect().await.expect("connect");

    scale.tare().await.expect("tare");

    scale.disconnect().await;
}
