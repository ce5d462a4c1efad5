use thiserror::Error;

/// Top-level error type for the `brewlink-api` crate.
///
/// Covers every failure mode of the transport layer: REST calls, URL
/// handling, and WebSocket channel establishment. `brewlink-core` maps
/// these into domain-level errors -- consumers of the core crate never
/// see raw HTTP plumbing.
///
/// Note that channel *frame* failures are not represented here: a frame
/// that fails to parse is logged and dropped inside the channel task,
/// and never surfaces as an error.
#[derive(Debug, Error)]
pub enum Error {
    // ── REST ────────────────────────────────────────────────────────
    /// The gateway answered with a failure status (>= 400).
    #[error("Gateway error (HTTP {status}): {body}")]
    Api { status: u16, body: String },

    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── WebSocket ───────────────────────────────────────────────────
    /// WebSocket connection failed. Recovered internally via backoff;
    /// only surfaced when a channel cannot even be described (bad URL).
    #[error("WebSocket connection failed: {0}")]
    WebSocketConnect(String),

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::WebSocketConnect(_) => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// The HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
