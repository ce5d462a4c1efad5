//! Espresso machine adapter.
//!
//! Wraps one gateway-enumerated machine. `connect()` fetches the primary
//! descriptor, seeds the settings streams with one-shot REST reads, then
//! opens the three machine streaming channels. The `steam_flow` setting
//! is not carried by the gateway; the adapter caches it locally and
//! merges it into every published `ShotSettings` so observers see one
//! consistent view.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use brewlink_api::types::{MachineSnapshotDto, ShotSettingsDto, WaterLevelsDto};
use brewlink_api::{GatewayClient, paths};

use crate::device::{Device, Machine, Session, publish_state, pump_frames};
use crate::error::CoreError;
use crate::model::{
    ConnectionState, DeviceKind, MachineInfo, MachineSettings, MachineSnapshot, ShotSettings,
    WaterLevels,
};
use crate::stream::ValueStream;
use crate::vocab::MachineState;

pub struct MachineAdapter {
    id: String,
    name: Option<String>,
    client: Arc<GatewayClient>,

    state_tx: watch::Sender<ConnectionState>,
    snapshot_tx: watch::Sender<Option<Arc<MachineSnapshot>>>,
    shot_settings_tx: watch::Sender<Option<Arc<ShotSettings>>>,
    water_levels_tx: watch::Sender<Option<Arc<WaterLevels>>>,

    info: Mutex<Option<MachineInfo>>,
    /// Locally cached setting the gateway does not carry.
    steam_flow: Arc<Mutex<Option<f64>>>,

    session: tokio::sync::Mutex<Option<Session>>,
}

impl MachineAdapter {
    pub fn new(id: impl Into<String>, name: Option<String>, client: Arc<GatewayClient>) -> Self {
        Self {
            id: id.into(),
            name,
            client,
            state_tx: watch::Sender::new(ConnectionState::Disconnected),
            snapshot_tx: watch::Sender::new(None),
            shot_settings_tx: watch::Sender::new(None),
            water_levels_tx: watch::Sender::new(None),
            info: Mutex::new(None),
            steam_flow: Arc::new(Mutex::new(None)),
            session: tokio::sync::Mutex::new(None),
        }
    }

    /// The descriptor fetched during the last successful `connect()`.
    pub fn info(&self) -> Option<MachineInfo> {
        self.info
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub async fn machine_settings(&self) -> Result<MachineSettings, CoreError> {
        Ok(self.client.machine_settings().await?.into())
    }

    pub async fn update_machine_settings(
        &self,
        settings: &MachineSettings,
    ) -> Result<(), CoreError> {
        self.client.set_machine_settings(&settings.into()).await?;
        Ok(())
    }

    fn connect_failure(&self, reason: impl std::fmt::Display) -> CoreError {
        publish_state(&self.state_tx, ConnectionState::Disconnected);
        CoreError::ConnectionFailed {
            device: self.id.clone(),
            reason: reason.to_string(),
        }
    }

    fn merge_cached(&self, mut settings: ShotSettings) -> ShotSettings {
        settings.steam_flow = *self
            .steam_flow
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        settings
    }
}

#[async_trait]
impl Device for MachineAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn kind(&self) -> DeviceKind {
        DeviceKind::Machine
    }

    fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    async fn connect(&self) -> Result<(), CoreError> {
        let mut session = self.session.lock().await;
        if session.is_some() {
            return Ok(());
        }

        publish_state(&self.state_tx, ConnectionState::Connecting);

        // Primary descriptor. Its failure aborts the whole connect.
        let info = match self.client.machine_info().await {
            Ok(dto) => MachineInfo::from(dto),
            Err(e) => return Err(self.connect_failure(e)),
        };
        debug!(model = ?info.model, firmware = ?info.firmware_version, "machine descriptor fetched");
        *self.info.lock().unwrap_or_else(PoisonError::into_inner) = Some(info);

        // Secondary fetches are independent and best-effort; a failure
        // leaves that stream empty until the first frame arrives.
        match self.client.shot_settings().await {
            Ok(dto) => {
                let settings = self.merge_cached(ShotSettings::from(dto));
                let _ = self.shot_settings_tx.send(Some(Arc::new(settings)));
            }
            Err(e) => warn!(error = %e, "initial shot settings fetch failed"),
        }
        match self.client.water_levels().await {
            Ok(dto) => {
                let _ = self
                    .water_levels_tx
                    .send(Some(Arc::new(WaterLevels::from(dto))));
            }
            Err(e) => warn!(error = %e, "initial water levels fetch failed"),
        }

        let snapshots = self
            .client
            .connect_channel(paths::MACHINE_SNAPSHOT)
            .map_err(|e| self.connect_failure(e))?;
        let shot_settings = self
            .client
            .connect_channel(paths::MACHINE_SHOT_SETTINGS)
            .map_err(|e| self.connect_failure(e))?;
        let water_levels = self
            .client
            .connect_channel(paths::MACHINE_WATER_LEVELS)
            .map_err(|e| self.connect_failure(e))?;

        let cancel = CancellationToken::new();
        let mut tasks = Vec::new();

        let snapshot_tx = self.snapshot_tx.clone();
        tasks.push(tokio::spawn(pump_frames::<MachineSnapshotDto, _>(
            snapshots,
            cancel.child_token(),
            move |dto| {
                let _ = snapshot_tx.send(Some(Arc::new(MachineSnapshot::from(dto))));
            },
        )));

        let shot_tx = self.shot_settings_tx.clone();
        let cache = Arc::clone(&self.steam_flow);
        tasks.push(tokio::spawn(pump_frames::<ShotSettingsDto, _>(
            shot_settings,
            cancel.child_token(),
            move |dto| {
                let mut settings = ShotSettings::from(dto);
                settings.steam_flow = *cache.lock().unwrap_or_else(PoisonError::into_inner);
                let _ = shot_tx.send(Some(Arc::new(settings)));
            },
        )));

        let water_tx = self.water_levels_tx.clone();
        tasks.push(tokio::spawn(pump_frames::<WaterLevelsDto, _>(
            water_levels,
            cancel.child_token(),
            move |dto| {
                let _ = water_tx.send(Some(Arc::new(WaterLevels::from(dto))));
            },
        )));

        *session = Some(Session { cancel, tasks });
        publish_state(&self.state_tx, ConnectionState::Connected);
        Ok(())
    }

    async fn disconnect(&self) {
        let Some(session) = self.session.lock().await.take() else {
            return;
        };
        session.teardown().await;

        self.client.disconnect_channel(paths::MACHINE_SNAPSHOT).await;
        self.client
            .disconnect_channel(paths::MACHINE_SHOT_SETTINGS)
            .await;
        self.client
            .disconnect_channel(paths::MACHINE_WATER_LEVELS)
            .await;

        // Reset replay values so the next cycle starts empty.
        let _ = self.snapshot_tx.send(None);
        let _ = self.shot_settings_tx.send(None);
        let _ = self.water_levels_tx.send(None);

        publish_state(&self.state_tx, ConnectionState::Disconnected);
    }
}

#[async_trait]
impl Machine for MachineAdapter {
    fn snapshots(&self) -> ValueStream<MachineSnapshot> {
        ValueStream::new(self.snapshot_tx.subscribe())
    }

    fn shot_settings(&self) -> ValueStream<ShotSettings> {
        ValueStream::new(self.shot_settings_tx.subscribe())
    }

    fn water_levels(&self) -> ValueStream<WaterLevels> {
        ValueStream::new(self.water_levels_tx.subscribe())
    }

    async fn set_state(&self, state: MachineState) -> Result<(), CoreError> {
        self.client.set_machine_state(state.to_wire()).await?;
        Ok(())
    }

    async fn update_shot_settings(&self, settings: ShotSettings) -> Result<(), CoreError> {
        *self
            .steam_flow
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = settings.steam_flow;

        self.client
            .set_shot_settings(&ShotSettingsDto::from(&settings))
            .await?;

        // Server-owned fields wait for the next frame; only the cached
        // field is re-merged into the currently published view.
        self.shot_settings_tx.send_modify(|current| {
            if let Some(existing) = current {
                let mut merged = (**existing).clone();
                merged.steam_flow = settings.steam_flow;
                *current = Some(Arc::new(merged));
            }
        });
        Ok(())
    }

    async fn upload_profile(&self, profile: &serde_json::Value) -> Result<(), CoreError> {
        self.client.upload_profile(profile).await?;
        Ok(())
    }
}
