// Hand-crafted async client for the brewgate gateway API (v1).
//
// REST base path: /api/v1/
// Streaming base path: /ws/v1/
// No authentication -- the gateway trusts its LAN.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use crate::Error;
use crate::channel::{BackoffSchedule, Channel, ChannelHandle};
use crate::transport::TransportConfig;
use crate::types;

// ── Streaming paths ──────────────────────────────────────────────────

/// Fixed streaming resource paths served by the gateway.
pub mod paths {
    pub const MACHINE_SNAPSHOT: &str = "/ws/v1/machine/snapshot";
    pub const MACHINE_SHOT_SETTINGS: &str = "/ws/v1/machine/shotSettings";
    pub const MACHINE_WATER_LEVELS: &str = "/ws/v1/machine/waterLevels";
    pub const SCALE_SNAPSHOT: &str = "/ws/v1/scale/snapshot";
}

// ── Client ───────────────────────────────────────────────────────────

/// Async client for one resolved gateway endpoint.
///
/// Owns the REST connection pool and the registry of streaming channels.
/// The registry is bound to this instance's lifetime -- dropping or
/// disposing the client tears down every channel it ever opened.
pub struct GatewayClient {
    http: reqwest::Client,
    base_url: Url,
    ws_base: Url,
    probe_timeout: std::time::Duration,
    backoff: BackoffSchedule,
    channels: Mutex<HashMap<String, Channel>>,
    cancel: CancellationToken,
}

impl GatewayClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build a client for the given HTTP and WebSocket base URLs.
    pub fn new(base_url: Url, ws_base: Url, config: &TransportConfig) -> Result<Self, Error> {
        Ok(Self {
            http: config.build_client()?,
            base_url,
            ws_base,
            probe_timeout: config.probe_timeout,
            backoff: BackoffSchedule::default(),
            channels: Mutex::new(HashMap::new()),
            cancel: CancellationToken::new(),
        })
    }

    /// Wrap an existing `reqwest::Client` (used by tests).
    pub fn from_reqwest(http: reqwest::Client, base_url: Url, ws_base: Url) -> Self {
        Self {
            http,
            base_url,
            ws_base,
            probe_timeout: std::time::Duration::from_secs(2),
            backoff: BackoffSchedule::default(),
            channels: Mutex::new(HashMap::new()),
            cancel: CancellationToken::new(),
        }
    }

    /// Override the reconnect schedule for every channel opened after
    /// this call.
    pub fn with_backoff(mut self, backoff: BackoffSchedule) -> Self {
        self.backoff = backoff;
        self
    }

    /// The HTTP base URL this client talks to.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builder ──────────────────────────────────────────────────

    fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    /// `GET path`, deserializing the JSON response.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("GET {url}");

        let resp = self.http.get(url).send().await?;
        handle_response(resp).await
    }

    /// `POST path` with a JSON body, deserializing the JSON response.
    pub async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("POST {url}");

        let resp = self.http.post(url).json(body).send().await?;
        handle_response(resp).await
    }

    /// `POST path` with a JSON body, ignoring any response body.
    pub async fn post_no_response<B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(), Error> {
        let url = self.url(path)?;
        debug!("POST {url}");

        let resp = self.http.post(url).json(body).send().await?;
        handle_empty(resp).await
    }

    /// `PUT path` with a JSON body, deserializing the JSON response.
    pub async fn put<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("PUT {url}");

        let resp = self.http.put(url).json(body).send().await?;
        handle_response(resp).await
    }

    /// Bodyless `PUT path` (command endpoints), ignoring any response body.
    pub async fn put_no_response(&self, path: &str) -> Result<(), Error> {
        let url = self.url(path)?;
        debug!("PUT {url}");

        let resp = self.http.put(url).send().await?;
        handle_empty(resp).await
    }

    // ── Liveness ─────────────────────────────────────────────────────

    /// Probe the gateway with a short-timeout enumeration request.
    ///
    /// Used by discovery to vet a candidate endpoint before adoption;
    /// any transport failure or error status counts as unreachable.
    pub async fn is_reachable(&self) -> bool {
        let Ok(url) = self.url("/api/v1/devices") else {
            return false;
        };

        match self
            .http
            .get(url)
            .timeout(self.probe_timeout)
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                debug!(error = %e, "liveness probe failed");
                false
            }
        }
    }

    // ── Streaming channels ───────────────────────────────────────────

    /// Open (or join) the streaming channel for `path`.
    ///
    /// Idempotent: a second call with the same path returns a handle on
    /// the existing channel without dialing a second socket. At most one
    /// live channel exists per (client, path) pair.
    pub fn connect_channel(&self, path: &str) -> Result<ChannelHandle, Error> {
        let url = self.ws_base.join(path)?;

        let mut channels = self
            .channels
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        let channel = channels.entry(path.to_owned()).or_insert_with(|| {
            debug!(path, "opening streaming channel");
            Channel::open(url, self.backoff.clone(), self.cancel.child_token())
        });

        Ok(channel.subscribe())
    }

    /// Close the streaming channel for `path`, cancelling its reconnect
    /// timer, and wait for its task to finish.
    pub async fn disconnect_channel(&self, path: &str) {
        let channel = {
            let mut channels = self
                .channels
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            channels.remove(path)
        };

        if let Some(channel) = channel {
            debug!(path, "closing streaming channel");
            channel.shutdown().await;
        }
    }

    /// Number of live streaming channels (diagnostic).
    pub fn channel_count(&self) -> usize {
        self.channels
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    /// Tear down every streaming channel deterministically.
    ///
    /// Cancels each channel's subscription and pending backoff timer and
    /// joins the channel tasks: no background task outlives this call,
    /// and no reconnect attempt can happen afterwards.
    pub async fn dispose_all(&self) {
        self.cancel.cancel();

        let drained: Vec<Channel> = {
            let mut channels = self
                .channels
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            channels.drain().map(|(_, c)| c).collect()
        };

        for channel in drained {
            channel.shutdown().await;
        }
    }

    // ━━ Typed gateway API ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    // ── Devices ──────────────────────────────────────────────────────

    pub async fn devices(&self) -> Result<Vec<types::DeviceDto>, Error> {
        self.get("/api/v1/devices").await
    }

    /// Ask the gateway to (re)scan for attached devices. Fire-and-forget
    /// from the caller's point of view; the result is an acknowledgement.
    pub async fn trigger_scan(&self) -> Result<(), Error> {
        let url = self.url("/api/v1/devices/scan")?;
        debug!("GET {url}");

        let resp = self.http.get(url).send().await?;
        handle_empty(resp).await
    }

    // ── Machine ──────────────────────────────────────────────────────

    pub async fn machine_info(&self) -> Result<types::MachineInfoDto, Error> {
        self.get("/api/v1/machine/info").await
    }

    /// Request a machine state transition. `state` is the gateway's wire
    /// vocabulary (e.g. `"espresso"`, `"sleep"`).
    pub async fn set_machine_state(&self, state: &str) -> Result<(), Error> {
        self.put_no_response(&format!("/api/v1/machine/state/{state}"))
            .await
    }

    pub async fn shot_settings(&self) -> Result<types::ShotSettingsDto, Error> {
        self.get("/api/v1/machine/shotSettings").await
    }

    pub async fn set_shot_settings(&self, settings: &types::ShotSettingsDto) -> Result<(), Error> {
        self.post_no_response("/api/v1/machine/shotSettings", settings)
            .await
    }

    pub async fn upload_profile(&self, profile: &serde_json::Value) -> Result<(), Error> {
        self.post_no_response("/api/v1/machine/profile", profile)
            .await
    }

    pub async fn water_levels(&self) -> Result<types::WaterLevelsDto, Error> {
        self.get("/api/v1/machine/waterLevels").await
    }

    pub async fn machine_settings(&self) -> Result<types::MachineSettingsDto, Error> {
        self.get("/api/v1/machine/settings").await
    }

    pub async fn set_machine_settings(
        &self,
        settings: &types::MachineSettingsDto,
    ) -> Result<(), Error> {
        self.post_no_response("/api/v1/machine/settings", settings)
            .await
    }

    // ── Scale ────────────────────────────────────────────────────────

    pub async fn scale_tare(&self) -> Result<(), Error> {
        self.put_no_response("/api/v1/scale/tare").await
    }

    pub async fn scale_disconnect(&self) -> Result<(), Error> {
        self.put_no_response("/api/v1/scale/disconnect").await
    }
}

// ── Response handling ────────────────────────────────────────────────

async fn handle_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
    let status = resp.status();
    let body = resp.text().await?;

    if !status.is_success() {
        return Err(Error::Api {
            status: status.as_u16(),
            body,
        });
    }

    // An empty success body is an empty result, not a parse failure.
    if body.trim().is_empty() {
        return serde_json::from_value(serde_json::Value::Null).map_err(|e| {
            Error::Deserialization {
                message: format!("empty body: {e}"),
                body,
            }
        });
    }

    serde_json::from_str(&body).map_err(|e| {
        let preview = body_preview(&body);
        Error::Deserialization {
            message: format!("{e} (body preview: {preview:?})"),
            body: body.clone(),
        }
    })
}

/// First 200 characters of the body, truncated on a char boundary so a
/// multi-byte UTF-8 sequence near the cut cannot split.
fn body_preview(body: &str) -> &str {
    match body.char_indices().nth(200) {
        Some((index, _)) => &body[..index],
        None => body,
    }
}

async fn handle_empty(resp: reqwest::Response) -> Result<(), Error> {
    let status = resp.status();
    if status.is_success() {
        Ok(())
    } else {
        let body = resp.text().await.unwrap_or_default();
        Err(Error::Api {
            status: status.as_u16(),
            body,
        })
    }
}
