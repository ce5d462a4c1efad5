use thiserror::Error;

/// Errors surfaced by coordination, discovery and the device adapters.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A device adapter could not complete its connect sequence.
    #[error("connection to {device} failed: {reason}")]
    ConnectionFailed { device: String, reason: String },

    /// A command or query against the gateway failed.
    #[error(transparent)]
    Gateway(#[from] brewlink_api::Error),

    /// mDNS browsing could not be started or polled.
    #[error("discovery failed: {0}")]
    Discovery(String),

    /// An endpoint produced an unparsable URL (bad host from TXT records).
    #[error(transparent)]
    InvalidEndpoint(#[from] url::ParseError),
}

impl CoreError {
    /// True when retrying against the same endpoint may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Gateway(err) => err.is_transient(),
            Self::ConnectionFailed { .. } | Self::Discovery(_) => true,
            Self::InvalidEndpoint(_) => false,
        }
    }
}
