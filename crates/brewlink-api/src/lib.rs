// brewlink-api: Async Rust client for the brewgate espresso gateway (REST + streaming)

pub mod channel;
pub mod client;
pub mod error;
pub mod transport;
pub mod types;

pub use channel::{BackoffSchedule, ChannelHandle, ChannelState};
pub use client::{GatewayClient, paths};
pub use error::Error;
pub use transport::TransportConfig;
