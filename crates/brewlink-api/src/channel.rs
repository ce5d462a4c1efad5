//! Self-healing streaming channel with auto-reconnect.
//!
//! One [`Channel`] owns one long-lived WebSocket subscription to a single
//! gateway streaming path and fans frames out through a
//! [`tokio::sync::broadcast`] channel. Reconnection uses deterministic
//! exponential backoff; disposal cancels any pending backoff timer so no
//! reconnect can race past an intentional shutdown.
//!
//! A frame that fails to parse as a JSON object is logged and dropped --
//! the channel stays open. Parse failures are never a reason to reconnect.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::sync::{broadcast, watch};
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::Error;

// ── Broadcast channel capacity ───────────────────────────────────────

const FRAME_CHANNEL_CAPACITY: usize = 256;

// ── ChannelState ─────────────────────────────────────────────────────

/// Observable lifecycle state of one streaming channel.
///
/// Transitions: `Disconnected → Connecting → Connected → Backoff →
/// Connecting → …`, with `Disposed` reachable from any state and terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelState {
    Disconnected,
    Connecting,
    Connected,
    /// Waiting out the backoff delay after the given consecutive failure.
    Backoff { attempt: u32 },
    /// Intentionally shut down; no further reconnect will occur.
    Disposed,
}

// ── BackoffSchedule ──────────────────────────────────────────────────

/// Deterministic exponential backoff: `clamp(initial * 2^attempt, initial, max)`.
///
/// The attempt counter resets to zero immediately after a successful
/// connect, so a channel that drops after a long healthy period retries
/// quickly again.
#[derive(Debug, Clone)]
pub struct BackoffSchedule {
    /// Delay after the first failure. Default: 500ms.
    pub initial: Duration,
    /// Upper bound on the delay. Default: 30s.
    pub max: Duration,
}

impl Default for BackoffSchedule {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(500),
            max: Duration::from_secs(30),
        }
    }
}

impl BackoffSchedule {
    /// Delay before reconnect attempt `attempt` (0-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let initial = u64::try_from(self.initial.as_millis()).unwrap_or(u64::MAX);
        let max = u64::try_from(self.max.as_millis()).unwrap_or(u64::MAX);

        // Shift saturates well past the clamp point; 2^63ms is ~292M years.
        let factor = 1_u64.checked_shl(attempt.min(62)).unwrap_or(u64::MAX);
        let millis = initial.saturating_mul(factor).clamp(initial, max);
        Duration::from_millis(millis)
    }
}

// ── Channel ──────────────────────────────────────────────────────────

/// A running streaming channel. Owned by the `GatewayClient` registry;
/// consumers hold [`ChannelHandle`]s vended by [`subscribe`](Self::subscribe).
pub(crate) struct Channel {
    frame_tx: broadcast::Sender<Arc<serde_json::Value>>,
    state_rx: watch::Receiver<ChannelState>,
    cancel: CancellationToken,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl Channel {
    /// Spawn the reconnection loop for `url`.
    ///
    /// Returns immediately; the first connection attempt happens
    /// asynchronously. `cancel` is a child of the owning client's token,
    /// so `dispose_all()` tears the channel down too.
    pub(crate) fn open(url: Url, schedule: BackoffSchedule, cancel: CancellationToken) -> Self {
        let (frame_tx, _) = broadcast::channel(FRAME_CHANNEL_CAPACITY);
        let (state_tx, state_rx) = watch::channel(ChannelState::Disconnected);

        let task_frame_tx = frame_tx.clone();
        let task_cancel = cancel.clone();
        let task = tokio::spawn(async move {
            channel_loop(url, task_frame_tx, state_tx, schedule, task_cancel).await;
        });

        Self {
            frame_tx,
            state_rx,
            cancel,
            task: Some(task),
        }
    }

    /// Get a new handle on the shared frame stream. Never dials a second
    /// socket -- all handles observe the same underlying connection.
    pub(crate) fn subscribe(&self) -> ChannelHandle {
        ChannelHandle {
            frames: self.frame_tx.subscribe(),
            state: self.state_rx.clone(),
        }
    }

    /// Cancel the channel task, including any pending backoff timer, and
    /// wait for it to finish. After this returns, no reconnect attempt
    /// can happen on this channel.
    pub(crate) async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ── ChannelHandle ────────────────────────────────────────────────────

/// Consumer handle on one streaming channel.
pub struct ChannelHandle {
    frames: broadcast::Receiver<Arc<serde_json::Value>>,
    state: watch::Receiver<ChannelState>,
}

impl ChannelHandle {
    /// Receive the next frame. If this consumer falls behind it receives
    /// [`broadcast::error::RecvError::Lagged`]; `Closed` means the channel
    /// was disposed.
    pub async fn recv(&mut self) -> Result<Arc<serde_json::Value>, broadcast::error::RecvError> {
        self.frames.recv().await
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ChannelState {
        self.state.borrow().clone()
    }

    /// Watchable lifecycle state stream.
    pub fn state_stream(&self) -> watch::Receiver<ChannelState> {
        self.state.clone()
    }
}

// ── Background reconnection loop ─────────────────────────────────────

/// Main loop: connect → read → on error or remote close, backoff → reconnect.
async fn channel_loop(
    url: Url,
    frame_tx: broadcast::Sender<Arc<serde_json::Value>>,
    state_tx: watch::Sender<ChannelState>,
    schedule: BackoffSchedule,
    cancel: CancellationToken,
) {
    let mut attempt: u32 = 0;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            result = connect_and_read(&url, &frame_tx, &state_tx, &cancel, &mut attempt) => {
                if cancel.is_cancelled() {
                    break;
                }

                match result {
                    Ok(()) => {
                        tracing::info!(url = %url, "channel closed by remote, reconnecting");
                    }
                    Err(e) => {
                        tracing::warn!(url = %url, error = %e, attempt, "channel error");
                    }
                }

                let delay = schedule.delay(attempt);
                let _ = state_tx.send(ChannelState::Backoff { attempt });
                tracing::debug!(
                    url = %url,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    attempt,
                    "waiting before reconnect"
                );

                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {}
                }

                attempt = attempt.saturating_add(1);
            }
        }
    }

    let _ = state_tx.send(ChannelState::Disposed);
    tracing::debug!(url = %url, "channel loop exiting");
}

// ── Single connection lifecycle ──────────────────────────────────────

/// Establish one WebSocket connection and read frames until it drops.
///
/// Resets the attempt counter as soon as the handshake succeeds.
async fn connect_and_read(
    url: &Url,
    frame_tx: &broadcast::Sender<Arc<serde_json::Value>>,
    state_tx: &watch::Sender<ChannelState>,
    cancel: &CancellationToken,
    attempt: &mut u32,
) -> Result<(), Error> {
    let _ = state_tx.send(ChannelState::Connecting);
    tracing::debug!(url = %url, "connecting channel");

    let (ws_stream, _response) = tokio_tungstenite::connect_async(url.as_str())
        .await
        .map_err(|e| Error::WebSocketConnect(e.to_string()))?;

    *attempt = 0;
    let _ = state_tx.send(ChannelState::Connected);
    tracing::info!(url = %url, "channel connected");

    let (_write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(()),
            frame = read.next() => {
                match frame {
                    Some(Ok(tungstenite::Message::Text(text))) => {
                        parse_and_broadcast(text.as_str(), frame_tx);
                    }
                    Some(Ok(tungstenite::Message::Ping(_))) => {
                        // tungstenite answers pings automatically
                        tracing::trace!("channel ping");
                    }
                    Some(Ok(tungstenite::Message::Close(frame))) => {
                        if let Some(ref cf) = frame {
                            tracing::info!(code = %cf.code, reason = %cf.reason, "close frame received");
                        } else {
                            tracing::info!("close frame received (no payload)");
                        }
                        return Ok(());
                    }
                    Some(Err(e)) => {
                        return Err(Error::WebSocketConnect(e.to_string()));
                    }
                    None => {
                        // Stream ended without a close frame
                        tracing::info!("channel stream ended");
                        return Ok(());
                    }
                    _ => {
                        // Binary, Pong, Frame -- ignore
                    }
                }
            }
        }
    }
}

// ── Frame parsing ────────────────────────────────────────────────────

/// Parse one text frame as a JSON object and broadcast it.
///
/// Anything else -- invalid JSON, a bare scalar, an array -- is dropped
/// with a debug log. The channel is never closed over a bad frame.
fn parse_and_broadcast(text: &str, frame_tx: &broadcast::Sender<Arc<serde_json::Value>>) {
    match serde_json::from_str::<serde_json::Value>(text) {
        Ok(value) if value.is_object() => {
            // Send errors just mean no active subscribers right now
            let _ = frame_tx.send(Arc::new(value));
        }
        Ok(other) => {
            tracing::debug!(frame = %other, "non-object frame dropped");
        }
        Err(e) => {
            tracing::debug!(error = %e, "unparseable frame dropped");
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────
