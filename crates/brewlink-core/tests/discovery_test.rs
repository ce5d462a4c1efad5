#![allow(clippy::unwrap_used)]
//! Discovery coordinator tests, driven through the injected event seam.

use std::time::Duration;

use pretty_assertions::assert_eq;
use tokio::sync::mpsc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use brewlink_core::{
    DeviceKind, DiscoveryConfig, DiscoveryCoordinator, DiscoveryEvent, TransportConfig,
};

fn fast_config() -> DiscoveryConfig {
    DiscoveryConfig {
        override_endpoint: None,
        scan_budget: Duration::from_secs(5),
        settle_delay: Duration::from_millis(50),
    }
}

fn found_event(host: &str, port: u16) -> DiscoveryEvent {
    DiscoveryEvent::Found {
        name: "brewgate._brewgate._tcp.local.".into(),
        attributes: [
            ("ip".to_owned(), host.to_owned()),
            ("port".to_owned(), port.to_string()),
        ]
        .into_iter()
        .collect(),
    }
}

async fn mock_gateway(devices: serde_json::Value) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(devices))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/devices/scan"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    server
}

fn server_port(server: &MockServer) -> u16 {
    server.address().port()
}

#[tokio::test(start_paused = true)]
async fn elapsed_budget_is_an_empty_result_not_an_error() {
    let coordinator = DiscoveryCoordinator::new(DiscoveryConfig::default(), TransportConfig::default());

    // Keep the sender alive so the stream stays silent rather than ending.
    let (_tx, rx) = mpsc::channel(4);
    let devices = coordinator
        .scan_with_events(rx)
        .await
        .expect("timeout is a normal outcome");

    assert!(devices.is_empty());
}

#[tokio::test]
async fn fallback_attributes_win_over_later_resolution() {
    let server = mock_gateway(serde_json::json!([
        { "id": "m1", "name": "micra", "type": "machine" },
        { "id": "s1", "name": "lunar", "type": "scale" }
    ]))
    .await;

    let coordinator = DiscoveryCoordinator::new(fast_config(), TransportConfig::default());
    let (tx, rx) = mpsc::channel(4);

    // The attribute-bearing Found event arrives first; the Resolved event
    // points somewhere dead and must never be dialed.
    tx.send(found_event("127.0.0.1", server_port(&server)))
        .await
        .expect("send found");
    tx.send(DiscoveryEvent::Resolved {
        host: "127.0.0.1".into(),
        port: 1,
    })
    .await
    .expect("send resolved");

    let devices = coordinator.scan_with_events(rx).await.expect("scan");

    assert_eq!(devices.len(), 2);
    assert_eq!(devices[0].kind, DeviceKind::Machine);
    assert_eq!(devices[1].kind, DeviceKind::Scale);

    let endpoint = coordinator.endpoint().await.expect("adopted endpoint");
    assert_eq!(endpoint.http_port, server_port(&server));
    // No ws attribute in the advertisement: streaming follows HTTP.
    assert_eq!(endpoint.ws_port, endpoint.http_port);

    assert_eq!(coordinator.machines().await.len(), 1);
    assert_eq!(coordinator.scales().await.len(), 1);
    coordinator.dispose().await;
}

#[tokio::test]
async fn unreachable_candidate_is_discarded_and_scan_continues() {
    let server = mock_gateway(serde_json::json!([
        { "id": "m1", "type": "machine" }
    ]))
    .await;

    let config = DiscoveryConfig {
        scan_budget: Duration::from_secs(10),
        ..fast_config()
    };
    let transport = TransportConfig {
        probe_timeout: Duration::from_millis(200),
        ..TransportConfig::default()
    };
    let coordinator = DiscoveryCoordinator::new(config, transport);
    let (tx, rx) = mpsc::channel(4);

    // Dead candidate first, then the real gateway.
    tx.send(found_event("127.0.0.1", 1)).await.expect("send dead");
    tx.send(found_event("127.0.0.1", server_port(&server)))
        .await
        .expect("send live");

    let devices = coordinator.scan_with_events(rx).await.expect("scan");
    assert_eq!(devices.len(), 1);
    coordinator.dispose().await;
}

#[tokio::test]
async fn unusable_advertised_host_is_discarded_and_scan_continues() {
    let server = mock_gateway(serde_json::json!([
        { "id": "m1", "type": "machine" }
    ]))
    .await;

    let coordinator = DiscoveryCoordinator::new(fast_config(), TransportConfig::default());
    let (tx, rx) = mpsc::channel(4);

    // An advertisement whose ip attribute cannot form a URL, then the
    // real gateway. The garbage candidate must not end the scan.
    tx.send(found_event("bad host with spaces", 8080))
        .await
        .expect("send garbage");
    tx.send(found_event("127.0.0.1", server_port(&server)))
        .await
        .expect("send live");

    let devices = coordinator.scan_with_events(rx).await.expect("scan");
    assert_eq!(devices.len(), 1);
    coordinator.dispose().await;
}

#[tokio::test]
async fn enumeration_failure_leaves_prior_device_list_unchanged() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/devices/scan"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    // Three successes cover scan #1 (probe + enumeration) and scan #2's
    // probe; scan #2's enumeration then hits the 500 fallback.
    Mock::given(method("GET"))
        .and(path("/api/v1/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            { "id": "m1", "name": "micra", "type": "machine" }
        ])))
        .up_to_n_times(3)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/devices"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let coordinator = DiscoveryCoordinator::new(fast_config(), TransportConfig::default());

    let (tx, rx) = mpsc::channel(4);
    tx.send(found_event("127.0.0.1", server_port(&server)))
        .await
        .expect("send found");
    let first = coordinator.scan_with_events(rx).await.expect("first scan");
    assert_eq!(first.len(), 1);

    let (tx, rx) = mpsc::channel(4);
    tx.send(found_event("127.0.0.1", server_port(&server)))
        .await
        .expect("send found again");
    let second = coordinator.scan_with_events(rx).await.expect("second scan");

    // The failed enumeration falls back to the last good list.
    assert_eq!(second, first);
    assert_eq!(coordinator.device_list().borrow().len(), 1);
    coordinator.dispose().await;
}

#[tokio::test]
async fn unreachable_override_yields_empty_list() {
    let config = DiscoveryConfig {
        override_endpoint: Some(brewlink_core::Endpoint::new("127.0.0.1", 1, 1)),
        ..fast_config()
    };
    let transport = TransportConfig {
        probe_timeout: Duration::from_millis(200),
        ..TransportConfig::default()
    };

    let coordinator = DiscoveryCoordinator::new(config, transport);
    let devices = coordinator.scan().await.expect("unreachable is not an error");

    assert!(devices.is_empty());
    assert!(coordinator.endpoint().await.is_none());
}
