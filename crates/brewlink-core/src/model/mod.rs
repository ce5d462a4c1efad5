// ── Domain model ──
//
// Canonical value types exposed to UI-side consumers. Everything here is
// an immutable snapshot: a new instance per update, never mutated in place.

mod device;
mod machine;
mod scale;

pub use device::{ConnectionState, DeviceEntry, DeviceKind, Endpoint};
pub use machine::{MachineInfo, MachineSettings, MachineSnapshot, ShotSettings, WaterLevels};
pub use scale::ScaleSnapshot;
