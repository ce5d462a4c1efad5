//! Shared configuration for brewlink tools.
//!
//! TOML file + `BREWLINK_`-prefixed environment variables, translated to
//! the core's `DiscoveryConfig` and `TransportConfig`. The gateway is
//! normally found over mDNS; the `[gateway]` section pins a manual
//! endpoint instead.

use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use brewlink_core::{DiscoveryConfig, Endpoint, TransportConfig};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    /// Manual gateway override; absent means discover via mDNS.
    #[serde(default)]
    pub gateway: Option<GatewaySection>,

    #[serde(default)]
    pub discovery: DiscoverySection,

    #[serde(default)]
    pub transport: TransportSection,
}

/// Manual gateway endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewaySection {
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Streaming port; defaults to the HTTP port.
    pub ws_port: Option<u16>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DiscoverySection {
    /// Wall-clock budget for one mDNS browse cycle, in seconds.
    #[serde(default = "default_scan_budget")]
    pub scan_budget_secs: u64,

    /// Grace period between triggering a gateway-side device scan and
    /// enumerating the result, in seconds.
    #[serde(default = "default_settle_delay")]
    pub settle_delay_secs: u64,
}

impl Default for DiscoverySection {
    fn default() -> Self {
        Self {
            scan_budget_secs: default_scan_budget(),
            settle_delay_secs: default_settle_delay(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransportSection {
    /// Per-request timeout, in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Liveness probe timeout, in seconds.
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,
}

impl Default for TransportSection {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            probe_timeout_secs: default_probe_timeout(),
        }
    }
}

fn default_port() -> u16 {
    8080
}
fn default_scan_budget() -> u64 {
    10
}
fn default_settle_delay() -> u64 {
    2
}
fn default_timeout() -> u64 {
    10
}
fn default_probe_timeout() -> u64 {
    2
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "brew-lab", "brewlink").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("brewlink");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full `Config` from file + environment.
///
/// Precedence, lowest to highest: built-in defaults, the TOML file,
/// `BREWLINK_`-prefixed environment variables (nested keys separated by
/// a double underscore, e.g. `BREWLINK_GATEWAY__HOST`).
pub fn load_config() -> Result<Config, ConfigError> {
    extract(Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(config_path()))
        .merge(Env::prefixed("BREWLINK_").split("__")))
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

fn extract(figment: Figment) -> Result<Config, ConfigError> {
    let config: Config = figment.extract()?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    if let Some(gateway) = &config.gateway {
        if gateway.host.trim().is_empty() {
            return Err(ConfigError::Validation {
                field: "gateway.host".into(),
                reason: "must not be empty".into(),
            });
        }
        if gateway.port == 0 {
            return Err(ConfigError::Validation {
                field: "gateway.port".into(),
                reason: "must be non-zero".into(),
            });
        }
    }
    if config.discovery.scan_budget_secs == 0 {
        return Err(ConfigError::Validation {
            field: "discovery.scan_budget_secs".into(),
            reason: "must be non-zero".into(),
        });
    }
    Ok(())
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    let path = config_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(&path, toml_str)?;
    Ok(())
}

// ── Translation to core configs ─────────────────────────────────────

impl Config {
    pub fn discovery_config(&self) -> DiscoveryConfig {
        DiscoveryConfig {
            override_endpoint: self.gateway.as_ref().map(|g| {
                Endpoint::new(g.host.clone(), g.port, g.ws_port.unwrap_or(g.port))
            }),
            scan_budget: Duration::from_secs(self.discovery.scan_budget_secs),
            settle_delay: Duration::from_secs(self.discovery.settle_delay_secs),
        }
    }

    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig {
            timeout: Duration::from_secs(self.transport.timeout_secs),
            probe_timeout: Duration::from_secs(self.transport.probe_timeout_secs),
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────
