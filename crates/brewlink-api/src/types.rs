// Wire DTOs for the gateway's JSON bodies (REST and streaming frames).
//
// Field names mirror the gateway's camelCase vocabulary exactly; the
// domain layer in brewlink-core owns the normalized representations.
// Every field the gateway might omit is `#[serde(default)]` so a sparse
// payload never becomes a parse failure.

use serde::{Deserialize, Serialize};

/// One row of the `/api/v1/devices` enumeration response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDto {
    /// Server-assigned id, unique per session.
    pub id: String,

    #[serde(default)]
    pub name: Option<String>,

    /// Device role: `"machine"` or `"scale"`.
    #[serde(rename = "type")]
    pub device_type: String,

    /// Connection state as the gateway sees it (informational).
    #[serde(default)]
    pub state: Option<String>,
}

/// `GET /api/v1/machine/info` -- the machine's primary descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineInfoDto {
    #[serde(default)]
    pub model: Option<String>,

    #[serde(default)]
    pub serial: Option<String>,

    #[serde(default)]
    pub firmware_version: Option<String>,

    #[serde(default)]
    pub api_version: Option<String>,
}

/// One frame of `/ws/v1/machine/snapshot`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineSnapshotDto {
    /// Wire state string, e.g. `"espresso"`, `"sleep"`. Normalized by
    /// the core vocabulary tables.
    #[serde(default)]
    pub state: String,

    #[serde(default)]
    pub substate: Option<String>,

    /// Gateway-side millisecond timestamp of the sample.
    #[serde(default)]
    pub timestamp: Option<u64>,

    #[serde(default)]
    pub group_temperature: Option<f64>,
    #[serde(default)]
    pub target_group_temperature: Option<f64>,

    #[serde(default)]
    pub mix_temperature: Option<f64>,
    #[serde(default)]
    pub target_mix_temperature: Option<f64>,

    #[serde(default)]
    pub pressure: Option<f64>,
    #[serde(default)]
    pub target_pressure: Option<f64>,

    #[serde(default)]
    pub flow: Option<f64>,
    #[serde(default)]
    pub target_flow: Option<f64>,

    #[serde(default)]
    pub steam_temperature: Option<f64>,
}

/// `GET/POST /api/v1/machine/shotSettings` body and
/// `/ws/v1/machine/shotSettings` frame.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShotSettingsDto {
    #[serde(default)]
    pub steam_setting: Option<u8>,
    #[serde(default)]
    pub target_steam_temp: Option<f64>,
    #[serde(default)]
    pub target_steam_duration: Option<f64>,

    #[serde(default)]
    pub target_hot_water_temp: Option<f64>,
    #[serde(default)]
    pub target_hot_water_volume: Option<f64>,
    #[serde(default)]
    pub target_hot_water_duration: Option<f64>,

    #[serde(default)]
    pub target_shot_volume: Option<f64>,
    #[serde(default)]
    pub group_temp: Option<f64>,
}

/// `GET /api/v1/machine/waterLevels` body and
/// `/ws/v1/machine/waterLevels` frame.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaterLevelsDto {
    #[serde(default)]
    pub current_percentage: Option<f64>,

    #[serde(default)]
    pub warning_threshold_percentage: Option<f64>,
}

/// `GET/POST /api/v1/machine/settings` body.
///
/// `extra` captures settings the gateway adds before this client learns
/// about them, so a round-trip POST doesn't silently drop them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineSettingsDto {
    #[serde(default)]
    pub fan_threshold: Option<u32>,

    #[serde(default)]
    pub usb_charger_mode: Option<String>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// One frame of `/ws/v1/scale/snapshot`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaleSnapshotDto {
    /// Weight in grams.
    #[serde(default)]
    pub weight: f64,

    /// Weight flow rate in grams per second, if the scale computes one.
    #[serde(default)]
    pub flow: Option<f64>,

    #[serde(default)]
    pub battery_level: Option<f64>,

    #[serde(default)]
    pub timestamp: Option<u64>,
}
