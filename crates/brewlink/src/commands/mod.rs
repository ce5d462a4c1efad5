//! Command handlers.

pub mod scan;
pub mod state;
pub mod status;
pub mod tare;
pub mod watch;

use std::sync::Arc;
use std::time::Duration;

use brewlink_core::{
    DeviceEntry, DiscoveryCoordinator, Endpoint, MachineAdapter, ScaleAdapter,
};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

pub async fn dispatch(command: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match command {
        Command::Scan => scan::run(global).await,
        Command::Status => status::run(global).await,
        Command::Watch => watch::run(global).await,
        Command::State(args) => state::run(&args, global).await,
        Command::Tare => tare::run(global).await,
    }
}

// ── Shared session setup ─────────────────────────────────────────────

pub(crate) struct Session {
    pub coordinator: DiscoveryCoordinator,
    pub devices: Vec<DeviceEntry>,
}

/// Load config, apply CLI overrides, run one discovery cycle.
pub(crate) async fn discover(global: &GlobalOpts) -> Result<Session, CliError> {
    let cfg = brewlink_config::load_config_or_default();
    let mut discovery = cfg.discovery_config();

    if let Some(host) = &global.host {
        let port = global.port.unwrap_or(8080);
        discovery.override_endpoint = Some(Endpoint::new(
            host.clone(),
            port,
            global.ws_port.unwrap_or(port),
        ));
    }
    if let Some(budget) = global.scan_budget {
        discovery.scan_budget = Duration::from_secs(budget);
    }

    let coordinator = DiscoveryCoordinator::new(discovery, cfg.transport_config());
    let devices = coordinator.scan().await?;

    if coordinator.endpoint().await.is_none() {
        return Err(CliError::NoGateway);
    }

    Ok(Session {
        coordinator,
        devices,
    })
}

impl Session {
    pub(crate) async fn machine(&self) -> Result<Arc<MachineAdapter>, CliError> {
        self.coordinator
            .machines()
            .await
            .into_iter()
            .next()
            .ok_or(CliError::NoDevice { kind: "machine" })
    }

    pub(crate) async fn scale(&self) -> Result<Arc<ScaleAdapter>, CliError> {
        self.coordinator
            .scales()
            .await
            .into_iter()
            .next()
            .ok_or(CliError::NoDevice { kind: "scale" })
    }
}
