// ── Device and endpoint domain types ──

use serde::{Deserialize, Serialize};
use url::Url;

/// A resolved gateway address: host plus HTTP and streaming ports.
///
/// Created whole on successful resolution and replaced whole on
/// rediscovery -- never partially mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub http_port: u16,
    pub ws_port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, http_port: u16, ws_port: u16) -> Self {
        Self {
            host: host.into(),
            http_port,
            ws_port,
        }
    }

    /// Base URL for REST calls, e.g. `http://192.168.1.40:8080/`.
    pub fn http_base(&self) -> Result<Url, url::ParseError> {
        Url::parse(&format!("http://{}:{}/", self.host, self.http_port))
    }

    /// Base URL for streaming channels, e.g. `ws://192.168.1.40:8080/`.
    pub fn ws_base(&self) -> Result<Url, url::ParseError> {
        Url::parse(&format!("ws://{}:{}/", self.host, self.ws_port))
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.http_port)
    }
}

/// Device role as enumerated by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum DeviceKind {
    Machine,
    Scale,
}

impl DeviceKind {
    /// Parse the gateway's `type` field. Unknown roles yield `None`;
    /// the coordinator skips them rather than guessing.
    pub fn from_wire(wire: &str) -> Option<Self> {
        match wire {
            "machine" => Some(Self::Machine),
            "scale" => Some(Self::Scale),
            _ => None,
        }
    }
}

impl std::fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Machine => write!(f, "machine"),
            Self::Scale => write!(f, "scale"),
        }
    }
}

/// Adapter connection lifecycle, observable per device.
///
/// Monotonic within one connect/disconnect cycle: Connecting is never
/// skipped on the way to Connected, and Disconnected is never emitted
/// twice in a row (the adapters publish through `send_if_modified`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

/// One device known to the gateway, as enumerated by discovery.
///
/// The id is server-assigned and unique per session -- never generated
/// locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceEntry {
    pub id: String,
    pub name: Option<String>,
    pub kind: DeviceKind,
    pub connection_state: ConnectionState,
}
