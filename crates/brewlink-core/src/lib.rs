//! Domain layer between `brewlink-api` and UI consumers (CLI for now).
//!
//! This crate owns the business logic, domain model, and reactive data
//! infrastructure for the brewlink workspace:
//!
//! - **[`DiscoveryCoordinator`]** — Locates the gateway (mDNS browse with a
//!   wall-clock budget, or a manual override), vets candidates with a
//!   liveness probe, enumerates attached devices and builds one adapter per
//!   device.
//!
//! - **Device adapters** ([`device`]) — [`MachineAdapter`] / [`ScaleAdapter`]
//!   behind the [`Device`] / [`Machine`] / [`Scale`] capability traits.
//!   `connect()` fetches the device's primary descriptor and opens its
//!   streaming channels; frames are republished as domain values.
//!
//! - **[`ValueStream<T>`]** — Replay-last subscription handle: late
//!   subscribers immediately observe the most recent value and then every
//!   change.
//!
//! - **Vocabulary** ([`vocab`]) — Total wire→domain state mapping (unknown
//!   strings default to Idle) and the stable reverse command table.
//!
//! - **Domain model** ([`model`]) — Immutable value objects (`Endpoint`,
//!   `DeviceEntry`, `MachineSnapshot`, `ScaleSnapshot`, ...), one instance
//!   per update.

pub mod convert;
pub mod device;
pub mod discovery;
pub mod error;
pub mod model;
pub mod stream;
pub mod vocab;

// ── Primary re-exports ──────────────────────────────────────────────
pub use device::{Device, Machine, MachineAdapter, Scale, ScaleAdapter};
pub use discovery::{DiscoveryConfig, DiscoveryCoordinator, DiscoveryEvent, SERVICE_TYPE};
pub use error::CoreError;
pub use stream::ValueStream;
pub use vocab::MachineState;

// Re-export model types at the crate root for ergonomics.
pub use model::{
    ConnectionState, DeviceEntry, DeviceKind, Endpoint, MachineInfo, MachineSettings,
    MachineSnapshot, ScaleSnapshot, ShotSettings, WaterLevels,
};

// The transport configuration travels with the coordinator constructor.
pub use brewlink_api::TransportConfig;
