// ── Machine domain types ──

use serde::{Deserialize, Serialize};

use crate::vocab::MachineState;

/// The machine's primary descriptor, fetched once during `connect()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineInfo {
    pub model: Option<String>,
    pub serial: Option<String>,
    pub firmware_version: Option<String>,
    pub api_version: Option<String>,
}

/// Point-in-time machine telemetry delivered over the snapshot channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineSnapshot {
    pub state: MachineState,
    /// Gateway substate string, passed through untranslated (the substate
    /// vocabulary is open-ended and only displayed, never dispatched on).
    pub substate: Option<String>,
    /// Gateway-side millisecond timestamp of the sample.
    pub timestamp: Option<u64>,

    pub group_temperature: Option<f64>,
    pub target_group_temperature: Option<f64>,
    pub mix_temperature: Option<f64>,
    pub target_mix_temperature: Option<f64>,
    pub pressure: Option<f64>,
    pub target_pressure: Option<f64>,
    pub flow: Option<f64>,
    pub target_flow: Option<f64>,
    pub steam_temperature: Option<f64>,
}

impl MachineSnapshot {
    /// True while the machine is actively extracting.
    pub fn is_pouring(&self) -> bool {
        matches!(self.state, MachineState::Espresso)
            && self.substate.as_deref() == Some("pouring")
    }
}

/// Steam / hot-water / volume targets for the next shot.
///
/// `steam_flow` is a client-side setting the gateway does not yet expose;
/// the machine adapter caches it locally and merges it into every
/// outbound `ShotSettings` so observers see one consistent view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShotSettings {
    pub steam_setting: Option<u8>,
    pub target_steam_temp: Option<f64>,
    pub target_steam_duration: Option<f64>,
    pub target_hot_water_temp: Option<f64>,
    pub target_hot_water_volume: Option<f64>,
    pub target_hot_water_duration: Option<f64>,
    pub target_shot_volume: Option<f64>,
    pub group_temp: Option<f64>,
    /// Locally cached -- not on the wire.
    pub steam_flow: Option<f64>,
}

/// Water tank levels, polled once at connect and streamed afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WaterLevels {
    pub current_percentage: Option<f64>,
    pub warning_threshold_percentage: Option<f64>,
}

impl WaterLevels {
    /// True when the tank is at or below the warning threshold.
    pub fn is_low(&self) -> bool {
        match (self.current_percentage, self.warning_threshold_percentage) {
            (Some(current), Some(threshold)) => current <= threshold,
            _ => false,
        }
    }
}

/// Miscellaneous machine settings (fan, USB charger, ...).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MachineSettings {
    pub fan_threshold: Option<u32>,
    pub usb_charger_mode: Option<String>,
    /// Settings the gateway knows about but this client doesn't;
    /// preserved across read-modify-write cycles.
    pub extra: serde_json::Map<String, serde_json::Value>,
}
