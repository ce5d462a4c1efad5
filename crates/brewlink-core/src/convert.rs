// ── API-to-domain type conversions ──
//
// Bridges raw `brewlink_api` response types into canonical
// `brewlink_core::model` domain types. Each `From` impl translates wire
// vocabulary into strong types and fills sensible defaults for missing
// optional data.

use brewlink_api::types::{
    DeviceDto, MachineInfoDto, MachineSettingsDto, MachineSnapshotDto, ScaleSnapshotDto,
    ShotSettingsDto, WaterLevelsDto,
};

use crate::model::{
    ConnectionState, DeviceEntry, DeviceKind, MachineInfo, MachineSettings, MachineSnapshot,
    ScaleSnapshot, ShotSettings, WaterLevels,
};
use crate::vocab::MachineState;

/// Convert a gateway device row, or `None` if the device type is one this
/// client has no adapter for.
pub fn device_entry(dto: DeviceDto) -> Option<DeviceEntry> {
    let kind = DeviceKind::from_wire(&dto.device_type)?;
    Some(DeviceEntry {
        id: dto.id,
        name: dto.name,
        kind,
        connection_state: ConnectionState::Disconnected,
    })
}

impl From<MachineInfoDto> for MachineInfo {
    fn from(dto: MachineInfoDto) -> Self {
        Self {
            model: dto.model,
            serial: dto.serial,
            firmware_version: dto.firmware_version,
            api_version: dto.api_version,
        }
    }
}

impl From<MachineSnapshotDto> for MachineSnapshot {
    fn from(dto: MachineSnapshotDto) -> Self {
        Self {
            state: MachineState::from_wire(&dto.state),
            substate: dto.substate,
            timestamp: dto.timestamp,
            group_temperature: dto.group_temperature,
            target_group_temperature: dto.target_group_temperature,
            mix_temperature: dto.mix_temperature,
            target_mix_temperature: dto.target_mix_temperature,
            pressure: dto.pressure,
            target_pressure: dto.target_pressure,
            flow: dto.flow,
            target_flow: dto.target_flow,
            steam_temperature: dto.steam_temperature,
        }
    }
}

impl From<ShotSettingsDto> for ShotSettings {
    fn from(dto: ShotSettingsDto) -> Self {
        Self {
            steam_setting: dto.steam_setting,
            target_steam_temp: dto.target_steam_temp,
            target_steam_duration: dto.target_steam_duration,
            target_hot_water_temp: dto.target_hot_water_temp,
            target_hot_water_volume: dto.target_hot_water_volume,
            target_hot_water_duration: dto.target_hot_water_duration,
            target_shot_volume: dto.target_shot_volume,
            group_temp: dto.group_temp,
            // Not carried by the gateway; the adapter overlays its cache.
            steam_flow: None,
        }
    }
}

impl From<&ShotSettings> for ShotSettingsDto {
    fn from(settings: &ShotSettings) -> Self {
        Self {
            steam_setting: settings.steam_setting,
            target_steam_temp: settings.target_steam_temp,
            target_steam_duration: settings.target_steam_duration,
            target_hot_water_temp: settings.target_hot_water_temp,
            target_hot_water_volume: settings.target_hot_water_volume,
            target_hot_water_duration: settings.target_hot_water_duration,
            target_shot_volume: settings.target_shot_volume,
            group_temp: settings.group_temp,
        }
    }
}

impl From<WaterLevelsDto> for WaterLevels {
    fn from(dto: WaterLevelsDto) -> Self {
        Self {
            current_percentage: dto.current_percentage,
            warning_threshold_percentage: dto.warning_threshold_percentage,
        }
    }
}

impl From<MachineSettingsDto> for MachineSettings {
    fn from(dto: MachineSettingsDto) -> Self {
        Self {
            fan_threshold: dto.fan_threshold,
            usb_charger_mode: dto.usb_charger_mode,
            extra: dto.extra,
        }
    }
}

impl From<&MachineSettings> for MachineSettingsDto {
    fn from(settings: &MachineSettings) -> Self {
        Self {
            fan_threshold: settings.fan_threshold,
            usb_charger_mode: settings.usb_charger_mode.clone(),
            extra: settings.extra.clone(),
        }
    }
}

impl From<ScaleSnapshotDto> for ScaleSnapshot {
    fn from(dto: ScaleSnapshotDto) -> Self {
        Self {
            weight_grams: dto.weight,
            flow_grams_per_sec: dto.flow,
            battery_percent: dto.battery_level,
            timestamp: dto.timestamp,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn unknown_device_type_is_skipped() {
        let dto = DeviceDto {
            id: "d1".into(),
            name: Some("grinder".into()),
            device_type: "grinder".into(),
            state: None,
        };
        assert!(device_entry(dto).is_none());
    }

    #[test]
    fn snapshot_state_defaults_when_missing() {
        let snapshot = MachineSnapshot::from(MachineSnapshotDto::default());
        assert_eq!(snapshot.state, MachineState::Idle);
    }

    #[test]
    fn outbound_shot_settings_omit_cached_field() {
        let settings = ShotSettings {
            target_shot_volume: Some(36.0),
            steam_flow: Some(0.8),
            ..ShotSettings::default()
        };
        let dto = ShotSettingsDto::from(&settings);
        let body = serde_json::to_value(&dto).unwrap();
        assert!(body.get("steamFlow").is_none());
        assert_eq!(body["targetShotVolume"], 36.0);
    }
}
