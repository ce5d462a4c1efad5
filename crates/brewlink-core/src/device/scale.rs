//! Scale adapter.
//!
//! The gateway has no per-scale info endpoint; the primary descriptor is
//! the scale's own row in the device enumeration, so `connect()` fails
//! when the gateway no longer lists the scale.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use brewlink_api::types::ScaleSnapshotDto;
use brewlink_api::{GatewayClient, paths};

use crate::device::{Device, Scale, Session, publish_state, pump_frames};
use crate::error::CoreError;
use crate::model::{ConnectionState, DeviceKind, ScaleSnapshot};
use crate::stream::ValueStream;

pub struct ScaleAdapter {
    id: String,
    name: Option<String>,
    client: Arc<GatewayClient>,

    state_tx: watch::Sender<ConnectionState>,
    snapshot_tx: watch::Sender<Option<Arc<ScaleSnapshot>>>,

    session: tokio::sync::Mutex<Option<Session>>,
}

impl ScaleAdapter {
    pub fn new(id: impl Into<String>, name: Option<String>, client: Arc<GatewayClient>) -> Self {
        Self {
            id: id.into(),
            name,
            client,
            state_tx: watch::Sender::new(ConnectionState::Disconnected),
            snapshot_tx: watch::Sender::new(None),
            session: tokio::sync::Mutex::new(None),
        }
    }

    fn connect_failure(&self, reason: impl std::fmt::Display) -> CoreError {
        publish_state(&self.state_tx, ConnectionState::Disconnected);
        CoreError::ConnectionFailed {
            device: self.id.clone(),
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl Device for ScaleAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn kind(&self) -> DeviceKind {
        DeviceKind::Scale
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

        // Primary descriptor: the scale's row in the enumeration.
        let devices = match self.client.devices().await {
            Ok(devices) => devices,
            Err(e) => return Err(self.connect_failure(e)),
        };
        if !devices.iter().any(|d| d.id == self.id) {
            return Err(self.connect_failure("not enumerated by gateway"));
        }

        let snapshots = self
            .client
            .connect_channel(paths::SCALE_SNAPSHOT)
            .map_err(|e| self.connect_failure(e))?;

        let cancel = CancellationToken::new();
        let snapshot_tx = self.snapshot_tx.clone();
        let tasks = vec![tokio::spawn(pump_frames::<ScaleSnapshotDto, _>(
            snapshots,
            cancel.child_token(),
            move |dto| {
                let _ = snapshot_tx.send(Some(Arc::new(ScaleSnapshot::from(dto))));
            },
        ))];

        *session = Some(Session { cancel, tasks });
        publish_state(&self.state_tx, ConnectionState::Connected);
        Ok(())
    }

    async fn disconnect(&self) {
        let Some(session) = self.session.lock().await.take() else {
            return;
        };
        session.teardown().await;
        self.client.disconnect_channel(paths::SCALE_SNAPSHOT).await;

        // Best-effort server-side notification.
        if let Err(e) = self.client.scale_disconnect().await {
            debug!(error = %e, "scale disconnect notification failed");
        }

        let _ = self.snapshot_tx.send(None);
        publish_state(&self.state_tx, ConnectionState::Disconnected);
    }
}

#[async_trait]
impl Scale for ScaleAdapter {
    fn snapshots(&self) -> ValueStream<ScaleSnapshot> {
        ValueStream::new(self.snapshot_tx.subscribe())
    }

    async fn tare(&self) -> Result<(), CoreError> {
        self.client.scale_tare().await?;
        Ok(())
    }
}
