// ── Gateway discovery ──
//
// Locates the gateway on the local network (mDNS, or a manual override),
// vets the candidate with a liveness probe, then enumerates attached
// devices and builds one adapter per device. The mDNS daemon lives
// behind an mpsc event seam; everything above it is clock-drivable in
// tests.

mod mdns;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use brewlink_api::{GatewayClient, TransportConfig};

use crate::convert;
use crate::device::{MachineAdapter, ScaleAdapter};
use crate::error::CoreError;
use crate::model::{DeviceEntry, DeviceKind, Endpoint};

/// mDNS service type the gateway advertises.
pub const SERVICE_TYPE: &str = "_brewgate._tcp.local.";

const EVENT_CHANNEL_CAPACITY: usize = 16;

// ── Events ───────────────────────────────────────────────────────────

/// One observation from the discovery backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryEvent {
    /// A service announcement, possibly carrying TXT fallback attributes
    /// (`ip`, `port`, `ws`/`wsPort` as string-encoded integers).
    Found {
        name: String,
        attributes: HashMap<String, String>,
    },
    /// Protocol-level resolution to a concrete address.
    Resolved { host: String, port: u16 },
}

/// Extract a candidate endpoint from one event, if it carries enough to
/// dial. A Found event qualifies only when its attributes include both
/// `ip` and a parseable `port`; the streaming port falls back to the
/// HTTP port when unspecified.
fn candidate_endpoint(event: &DiscoveryEvent) -> Option<Endpoint> {
    match event {
        DiscoveryEvent::Found { attributes, .. } => {
            let host = attributes.get("ip")?.clone();
            let http_port: u16 = attributes.get("port")?.parse().ok()?;
            let ws_port = attributes
                .get("ws")
                .or_else(|| attributes.get("wsPort"))
                .and_then(|v| v.parse().ok())
                .unwrap_or(http_port);
            Some(Endpoint::new(host, http_port, ws_port))
        }
        DiscoveryEvent::Resolved { host, port } => Some(Endpoint::new(host.clone(), *port, *port)),
    }
}

// ── Configuration ────────────────────────────────────────────────────

/// Tunables for one coordinator instance.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Skip mDNS entirely and probe this endpoint directly.
    pub override_endpoint: Option<Endpoint>,
    /// Wall-clock budget for one browse cycle.
    pub scan_budget: Duration,
    /// Grace period between triggering a gateway-side device scan and
    /// enumerating the result.
    pub settle_delay: Duration,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            override_endpoint: None,
            scan_budget: Duration::from_secs(10),
            settle_delay: Duration::from_secs(2),
        }
    }
}

// ── Coordinator ──────────────────────────────────────────────────────

struct Adopted {
    endpoint: Endpoint,
    client: Arc<GatewayClient>,
    machines: Vec<Arc<MachineAdapter>>,
    scales: Vec<Arc<ScaleAdapter>>,
}

/// Finds the gateway and owns the resulting client and device adapters.
pub struct DiscoveryCoordinator {
    config: DiscoveryConfig,
    transport: TransportConfig,
    devices_tx: watch::Sender<Arc<Vec<DeviceEntry>>>,
    adopted: tokio::sync::Mutex<Option<Adopted>>,
}

impl DiscoveryCoordinator {
    pub fn new(config: DiscoveryConfig, transport: TransportConfig) -> Self {
        Self {
            config,
            transport,
            devices_tx: watch::Sender::new(Arc::new(Vec::new())),
            adopted: tokio::sync::Mutex::new(None),
        }
    }

    /// Run one discovery cycle and return the enumerated devices.
    ///
    /// An empty result is a normal outcome: the budget elapsed, or the
    /// manual override was unreachable. Errors are reserved for local
    /// failures (mDNS daemon, URL construction).
    pub async fn scan(&self) -> Result<Vec<DeviceEntry>, CoreError> {
        if let Some(endpoint) = self.config.override_endpoint.clone() {
            debug!(%endpoint, "manual override set, skipping mdns");
            return match self.probe(&endpoint).await? {
                Some(client) => self.adopt(endpoint, client).await,
                None => {
                    warn!(%endpoint, "override endpoint unreachable");
                    Ok(Vec::new())
                }
            };
        }

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let cancel = CancellationToken::new();
        mdns::spawn_browser(SERVICE_TYPE, tx, cancel.child_token())?;

        let result = self.scan_with_events(rx).await;
        // Winning (or timing out) cancels the rest of the browse cycle.
        cancel.cancel();
        result
    }

    /// Core of the scan loop, driven by an injected event stream.
    ///
    /// The first event that yields a usable, reachable endpoint wins;
    /// unreachable candidates are discarded silently and the scan
    /// continues until the budget elapses.
    pub async fn scan_with_events(
        &self,
        mut events: mpsc::Receiver<DiscoveryEvent>,
    ) -> Result<Vec<DeviceEntry>, CoreError> {
        let deadline = tokio::time::sleep(self.config.scan_budget);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                _ = &mut deadline => {
                    debug!("scan budget elapsed without a usable endpoint");
                    return Ok(Vec::new());
                }
                event = events.recv() => {
                    let Some(event) = event else {
                        debug!("discovery event stream ended");
                        return Ok(Vec::new());
                    };

                    let Some(endpoint) = candidate_endpoint(&event) else {
                        continue;
                    };

                    match self.probe(&endpoint).await {
                        Ok(Some(client)) => return self.adopt(endpoint, client).await,
                        Ok(None) => {
                            debug!(%endpoint, "candidate unreachable, discarded");
                        }
                        Err(e) => {
                            // A candidate bad enough to reject (say, an
                            // unusable advertised host) must not end the
                            // scan for everyone else.
                            debug!(%endpoint, error = %e, "candidate rejected, discarded");
                        }
                    }
                }
            }
        }
    }

    /// Build a client for the candidate and vet it with a liveness probe.
    async fn probe(&self, endpoint: &Endpoint) -> Result<Option<Arc<GatewayClient>>, CoreError> {
        let client = Arc::new(GatewayClient::new(
            endpoint.http_base()?,
            endpoint.ws_base()?,
            &self.transport,
        )?);

        if client.is_reachable().await {
            Ok(Some(client))
        } else {
            Ok(None)
        }
    }

    /// Adopt a live endpoint: trigger a gateway-side device scan, wait
    /// the settle delay, enumerate, and build adapters.
    async fn adopt(
        &self,
        endpoint: Endpoint,
        client: Arc<GatewayClient>,
    ) -> Result<Vec<DeviceEntry>, CoreError> {
        info!(%endpoint, "gateway adopted");

        // Fire-and-forget: an unsupported scan endpoint is not fatal.
        if let Err(e) = client.trigger_scan().await {
            debug!(error = %e, "device scan trigger failed");
        }
        tokio::time::sleep(self.config.settle_delay).await;

        let dtos = match client.devices().await {
            Ok(dtos) => dtos,
            Err(e) => {
                // Keep whatever device list was last emitted.
                warn!(error = %e, "device enumeration failed");
                return Ok(self.devices_tx.borrow().as_ref().clone());
            }
        };

        let entries: Vec<DeviceEntry> = dtos.into_iter().filter_map(convert::device_entry).collect();

        let mut machines = Vec::new();
        let mut scales = Vec::new();
        for entry in &entries {
            match entry.kind {
                DeviceKind::Machine => machines.push(Arc::new(MachineAdapter::new(
                    entry.id.clone(),
                    entry.name.clone(),
                    Arc::clone(&client),
                ))),
                DeviceKind::Scale => scales.push(Arc::new(ScaleAdapter::new(
                    entry.id.clone(),
                    entry.name.clone(),
                    Arc::clone(&client),
                ))),
            }
        }
        info!(
            devices = entries.len(),
            machines = machines.len(),
            scales = scales.len(),
            "devices enumerated"
        );

        *self.adopted.lock().await = Some(Adopted {
            endpoint,
            client,
            machines,
            scales,
        });
        let _ = self.devices_tx.send(Arc::new(entries.clone()));

        Ok(entries)
    }

    // ── Accessors ────────────────────────────────────────────────────

    /// Watchable device list; updated on each successful enumeration.
    pub fn device_list(&self) -> watch::Receiver<Arc<Vec<DeviceEntry>>> {
        self.devices_tx.subscribe()
    }

    pub async fn endpoint(&self) -> Option<Endpoint> {
        self.adopted.lock().await.as_ref().map(|a| a.endpoint.clone())
    }

    pub async fn client(&self) -> Option<Arc<GatewayClient>> {
        self.adopted.lock().await.as_ref().map(|a| Arc::clone(&a.client))
    }

    pub async fn machines(&self) -> Vec<Arc<MachineAdapter>> {
        self.adopted
            .lock()
            .await
            .as_ref()
            .map(|a| a.machines.clone())
            .unwrap_or_default()
    }

    pub async fn scales(&self) -> Vec<Arc<ScaleAdapter>> {
        self.adopted
            .lock()
            .await
            .as_ref()
            .map(|a| a.scales.clone())
            .unwrap_or_default()
    }

    /// Drop the adopted gateway, tearing down every streaming channel
    /// deterministically, and clear the device list.
    pub async fn dispose(&self) {
        if let Some(adopted) = self.adopted.lock().await.take() {
            adopted.client.dispose_all().await;
            let _ = self.devices_tx.send(Arc::new(Vec::new()));
            info!(endpoint = %adopted.endpoint, "gateway released");
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────
