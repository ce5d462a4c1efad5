// Shared transport configuration for building reqwest::Client instances.
//
// The gateway speaks plain HTTP on the LAN, so there is no TLS mode to
// select -- only timeout and identification concerns live here.

use std::time::Duration;

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Per-request timeout.
    pub timeout: Duration,
    /// Timeout used for liveness probes, which must fail fast during
    /// discovery so an unreachable candidate doesn't eat the scan budget.
    pub probe_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            probe_timeout: Duration::from_secs(2),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, crate::error::Error> {
        Ok(reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("brewlink/", env!("CARGO_PKG_VERSION")))
            .build()?)
    }
}
