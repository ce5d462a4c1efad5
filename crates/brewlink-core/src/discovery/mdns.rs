//! mDNS browse backend.
//!
//! Thin bridge from the `mdns-sd` daemon to the coordinator's event
//! channel. Kept separate so everything above it can be driven by
//! injected events in tests.

use std::collections::{HashMap, HashSet};

use mdns_sd::{ResolvedService, ScopedIp, ServiceDaemon, ServiceEvent};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::discovery::DiscoveryEvent;
use crate::error::CoreError;

/// Start browsing `service_type` and forward events until cancelled.
///
/// TXT properties ride on the Found event so attribute-based resolution
/// can win over protocol-level resolution when the advertisement carries
/// explicit `ip`/`port` overrides.
pub(crate) fn spawn_browser(
    service_type: &str,
    events: mpsc::Sender<DiscoveryEvent>,
    cancel: CancellationToken,
) -> Result<(), CoreError> {
    let daemon = ServiceDaemon::new().map_err(|e| CoreError::Discovery(e.to_string()))?;
    let receiver = daemon
        .browse(service_type)
        .map_err(|e| CoreError::Discovery(e.to_string()))?;

    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                event = receiver.recv_async() => match event {
                    Ok(ServiceEvent::ServiceFound(_, fullname)) => {
                        debug!(service = %fullname, "service announced");
                        let found = DiscoveryEvent::Found {
                            name: fullname,
                            attributes: HashMap::new(),
                        };
                        if events.send(found).await.is_err() {
                            break;
                        }
                    }
                    Ok(ServiceEvent::ServiceResolved(info)) => {
                        if forward_resolved(&info, &events).await.is_err() {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        debug!(error = %e, "mdns receiver closed");
                        break;
                    }
                },
            }
        }

        let _ = daemon.shutdown();
    });

    Ok(())
}

async fn forward_resolved(
    info: &ResolvedService,
    events: &mpsc::Sender<DiscoveryEvent>,
) -> Result<(), mpsc::error::SendError<DiscoveryEvent>> {
    let attributes: HashMap<String, String> = info
        .txt_properties
        .iter()
        .map(|p| (p.key().to_string(), p.val_str().to_string()))
        .collect();

    debug!(service = %info.fullname, port = info.port, "service resolved");

    events
        .send(DiscoveryEvent::Found {
            name: info.fullname.clone(),
            attributes,
        })
        .await?;

    if let Some(host) = pick_address(&info.addresses) {
        events
            .send(DiscoveryEvent::Resolved {
                host,
                port: info.port,
            })
            .await?;
    }

    Ok(())
}

/// Prefer an IPv4 address; the gateway's URLs are plain host:port.
fn pick_address(addresses: &HashSet<ScopedIp>) -> Option<String> {
    addresses
        .iter()
        .find(|a| a.is_ipv4())
        .or_else(|| addresses.iter().next())
        .map(|a| a.to_ip_addr().to_string())
}

// ── Tests ────────────────────────────────────────────────────────────
