// ── Device adapters ──
//
// Capability traits and concrete adapters wrapping one gateway device
// each. Adapters own the streaming subscriptions for their role and
// republish frames as domain values through replay-last watch channels.

mod machine;
mod scale;

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;

use brewlink_api::ChannelHandle;

use crate::error::CoreError;
use crate::model::{ConnectionState, DeviceKind};

pub use machine::MachineAdapter;
pub use scale::ScaleAdapter;

/// Common surface of every gateway device.
#[async_trait]
pub trait Device: Send + Sync {
    /// Server-assigned id, unique per session.
    fn id(&self) -> &str;

    fn name(&self) -> Option<&str>;

    fn kind(&self) -> DeviceKind;

    /// Observable connection lifecycle for this device.
    fn connection_state(&self) -> watch::Receiver<ConnectionState>;

    /// Fetch the device's primary descriptor and open its streaming
    /// channels. A primary-descriptor failure propagates as
    /// [`CoreError::ConnectionFailed`] and leaves the device Disconnected.
    /// Connecting an already connected device is a no-op.
    async fn connect(&self) -> Result<(), CoreError>;

    /// Close this device's channels and mark it Disconnected. Infallible:
    /// server-side notification failures are logged, never propagated.
    async fn disconnect(&self);
}

/// Espresso machine capabilities.
#[async_trait]
pub trait Machine: Device {
    fn snapshots(&self) -> crate::stream::ValueStream<crate::model::MachineSnapshot>;

    fn shot_settings(&self) -> crate::stream::ValueStream<crate::model::ShotSettings>;

    fn water_levels(&self) -> crate::stream::ValueStream<crate::model::WaterLevels>;

    /// Request a state transition (one REST call, no local mutation).
    async fn set_state(&self, state: crate::vocab::MachineState) -> Result<(), CoreError>;

    async fn update_shot_settings(
        &self,
        settings: crate::model::ShotSettings,
    ) -> Result<(), CoreError>;

    async fn upload_profile(&self, profile: &serde_json::Value) -> Result<(), CoreError>;
}

/// Scale capabilities.
#[async_trait]
pub trait Scale: Device {
    fn snapshots(&self) -> crate::stream::ValueStream<crate::model::ScaleSnapshot>;

    async fn tare(&self) -> Result<(), CoreError>;
}

// ── Shared plumbing ──────────────────────────────────────────────────

/// Running connect cycle: the pump tasks and their cancellation token.
struct Session {
    cancel: CancellationToken,
    tasks: Vec<tokio::task::JoinHandle<()>>,
}

impl Session {
    async fn teardown(self) {
        self.cancel.cancel();
        for task in self.tasks {
            let _ = task.await;
        }
    }
}

/// Publish a connection-state transition, suppressing duplicates so
/// observers never see the same state twice in a row.
fn publish_state(tx: &watch::Sender<ConnectionState>, next: ConnectionState) {
    tx.send_if_modified(|current| {
        if *current == next {
            false
        } else {
            *current = next;
            true
        }
    });
}

/// Drain one streaming channel, deserializing each frame and handing it
/// to `publish`. A frame that does not match the expected shape is
/// dropped with a debug log; lag just skips frames.
async fn pump_frames<T, F>(mut handle: ChannelHandle, cancel: CancellationToken, mut publish: F)
where
    T: DeserializeOwned,
    F: FnMut(T) + Send,
{
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            frame = handle.recv() => match frame {
                Ok(value) => match serde_json::from_value::<T>(Arc::unwrap_or_clone(value)) {
                    Ok(dto) => publish(dto),
                    Err(e) => {
                        tracing::debug!(error = %e, "frame did not match expected shape");
                    }
                },
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "frame consumer lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }
}
