// ── Devices ──
//
// Every physical device shares one record. Channel 0 carries the
// maintenance state (reachability, battery, radio), the remaining
// channels carry the type-specific state captured in `DeviceKind`.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::common::epoch_millis;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Device {
    pub id: String,
    pub home_id: Option<String>,
    pub label: Option<String>,
    /// Raw type discriminator, kept even when the kind is `Generic`.
    pub device_type: String,
    pub last_status_update: Option<DateTime<Utc>>,
    pub update_state: Option<String>,
    pub firmware_version: Option<String>,
    pub available_firmware_version: Option<String>,
    pub model_type: Option<String>,
    pub model_id: Option<i64>,
    pub oem: Option<String>,
    pub manufacturer_code: Option<i64>,
    pub serialized_global_trade_item_number: Option<String>,
    pub permanently_reachable: bool,
    pub live_update_state: Option<String>,

    // Maintenance channel
    pub unreach: Option<bool>,
    pub low_bat: Option<bool>,
    pub rssi_device_value: Option<i32>,
    pub rssi_peer_value: Option<i32>,
    pub duty_cycle: Option<bool>,
    pub config_pending: Option<bool>,
    pub router_module_enabled: Option<bool>,
    pub sabotage: Option<bool>,

    pub kind: DeviceKind,
}

/// Type-specific device state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DeviceKind {
    HeatingThermostat(HeatingThermostat),
    ShutterContact(ShutterContact),
    WallMountedThermostat(WallMountedThermostat),
    TemperatureHumiditySensor(TemperatureHumiditySensor),
    SmokeDetector(SmokeDetector),
    Switch(Switch),
    SwitchMeasuring(SwitchMeasuring),
    MotionDetector(MotionDetector),
    Shutter(Shutter),
    FloorTerminalBlock(FloorTerminalBlock),
    WaterSensor(WaterSensor),
    AlarmSiren,
    /// Push buttons and remotes: no state beyond maintenance.
    Remote,
    /// Fallback for types without a registered kind.
    Generic,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HeatingThermostat {
    pub temperature_offset: Option<f64>,
    pub valve_position: Option<f64>,
    pub valve_state: Option<String>,
    pub set_point_temperature: Option<f64>,
    pub operation_lock_active: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShutterContact {
    pub window_state: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WallMountedThermostat {
    pub actual_temperature: Option<f64>,
    pub set_point_temperature: Option<f64>,
    pub humidity: Option<i64>,
    pub temperature_offset: Option<f64>,
    pub display: Option<String>,
    pub operation_lock_active: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TemperatureHumiditySensor {
    pub actual_temperature: Option<f64>,
    pub humidity: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SmokeDetector {
    pub smoke_detector_alarm_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Switch {
    pub on: Option<bool>,
    pub profile_mode: Option<String>,
    pub user_desired_profile_mode: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SwitchMeasuring {
    pub on: Option<bool>,
    pub energy_counter: Option<f64>,
    pub current_power_consumption: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MotionDetector {
    pub motion_detected: Option<bool>,
    pub presence_detected: Option<bool>,
    pub illumination: Option<f64>,
    pub current_illumination: Option<f64>,
    pub motion_buffer_active: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Shutter {
    pub shutter_level: Option<f64>,
    pub slats_level: Option<f64>,
    pub bottom_to_top_reference_time: Option<f64>,
    pub top_to_bottom_reference_time: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FloorTerminalBlock {
    pub frost_protection_temperature: Option<f64>,
    pub heating_emergency_value: Option<f64>,
    pub cooling_emergency_value: Option<f64>,
    pub global_pump_control: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WaterSensor {
    pub moisture_detected: Option<bool>,
    pub water_level_detected: Option<bool>,
}

// ── Parsing ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawDevice {
    id: String,
    #[serde(rename = "type")]
    device_type: String,
    #[serde(default)]
    home_id: Option<String>,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    last_status_update: Option<i64>,
    #[serde(default)]
    update_state: Option<String>,
    #[serde(default)]
    firmware_version: Option<String>,
    #[serde(default)]
    available_firmware_version: Option<String>,
    #[serde(default)]
    model_type: Option<String>,
    #[serde(default)]
    model_id: Option<i64>,
    #[serde(default)]
    oem: Option<String>,
    #[serde(default)]
    manufacturer_code: Option<i64>,
    #[serde(default)]
    serialized_global_trade_item_number: Option<String>,
    #[serde(default)]
    permanently_reachable: bool,
    #[serde(default)]
    live_update_state: Option<String>,
    #[serde(default)]
    functional_channels: Map<String, Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct MaintenanceChannel {
    unreach: Option<bool>,
    low_bat: Option<bool>,
    rssi_device_value: Option<i32>,
    rssi_peer_value: Option<i32>,
    duty_cycle: Option<bool>,
    config_pending: Option<bool>,
    router_module_enabled: Option<bool>,
    sabotage: Option<bool>,
}

impl RawDevice {
    /// Decode functional channel `index`; an absent channel decodes to defaults.
    fn channel<T: DeserializeOwned + Default>(&self, index: &str) -> Result<T, serde_json::Error> {
        match self.functional_channels.get(index) {
            Some(channel) if !channel.is_null() => T::deserialize(channel),
            _ => Ok(T::default()),
        }
    }
}

impl Device {
    fn parse(
        record: &Value,
        kind: impl FnOnce(&RawDevice) -> Result<DeviceKind, serde_json::Error>,
    ) -> Result<Self, serde_json::Error> {
        let raw = RawDevice::deserialize(record)?;
        let kind = kind(&raw)?;
        let maintenance: MaintenanceChannel = raw.channel("0")?;

        Ok(Self {
            id: raw.id,
            home_id: raw.home_id,
            label: raw.label,
            device_type: raw.device_type,
            last_status_update: epoch_millis(raw.last_status_update),
            update_state: raw.update_state,
            firmware_version: raw.firmware_version,
            available_firmware_version: raw.available_firmware_version,
            model_type: raw.model_type,
            model_id: raw.model_id,
            oem: raw.oem,
            manufacturer_code: raw.manufacturer_code,
            serialized_global_trade_item_number: raw.serialized_global_trade_item_number,
            permanently_reachable: raw.permanently_reachable,
            live_update_state: raw.live_update_state,
            unreach: maintenance.unreach,
            low_bat: maintenance.low_bat,
            rssi_device_value: maintenance.rssi_device_value,
            rssi_peer_value: maintenance.rssi_peer_value,
            duty_cycle: maintenance.duty_cycle,
            config_pending: maintenance.config_pending,
            router_module_enabled: maintenance.router_module_enabled,
            sabotage: maintenance.sabotage,
            kind,
        })
    }

    pub fn is_generic(&self) -> bool {
        matches!(self.kind, DeviceKind::Generic)
    }
}

// ── Constructors (registered in `registry`) ──────────────────────────

pub(crate) fn generic(record: &Value) -> Result<Device, serde_json::Error> {
    Device::parse(record, |_| Ok(DeviceKind::Generic))
}

pub(crate) fn heating_thermostat(record: &Value) -> Result<Device, serde_json::Error> {
    Device::parse(record, |raw| raw.channel("1").map(DeviceKind::HeatingThermostat))
}

pub(crate) fn shutter_contact(record: &Value) -> Result<Device, serde_json::Error> {
    Device::parse(record, |raw| raw.channel("1").map(DeviceKind::ShutterContact))
}

pub(crate) fn wall_mounted_thermostat(record: &Value) -> Result<Device, serde_json::Error> {
    Device::parse(record, |raw| raw.channel("1").map(DeviceKind::WallMountedThermostat))
}

pub(crate) fn temperature_humidity_sensor(record: &Value) -> Result<Device, serde_json::Error> {
    Device::parse(record, |raw| {
        raw.channel("1").map(DeviceKind::TemperatureHumiditySensor)
    })
}

pub(crate) fn smoke_detector(record: &Value) -> Result<Device, serde_json::Error> {
    Device::parse(record, |raw| raw.channel("1").map(DeviceKind::SmokeDetector))
}

pub(crate) fn switch(record: &Value) -> Result<Device, serde_json::Error> {
    Device::parse(record, |raw| raw.channel("1").map(DeviceKind::Switch))
}

pub(crate) fn switch_measuring(record: &Value) -> Result<Device, serde_json::Error> {
    Device::parse(record, |raw| raw.channel("1").map(DeviceKind::SwitchMeasuring))
}

pub(crate) fn motion_detector(record: &Value) -> Result<Device, serde_json::Error> {
    Device::parse(record, |raw| raw.channel("1").map(DeviceKind::MotionDetector))
}

pub(crate) fn shutter(record: &Value) -> Result<Device, serde_json::Error> {
    Device::parse(record, |raw| raw.channel("1").map(DeviceKind::Shutter))
}

/// Pump and emergency settings live on the maintenance channel.
pub(crate) fn floor_terminal_block(record: &Value) -> Result<Device, serde_json::Error> {
    Device::parse(record, |raw| raw.channel("0").map(DeviceKind::FloorTerminalBlock))
}

pub(crate) fn water_sensor(record: &Value) -> Result<Device, serde_json::Error> {
    Device::parse(record, |raw| raw.channel("1").map(DeviceKind::WaterSensor))
}

pub(crate) fn alarm_siren(record: &Value) -> Result<Device, serde_json::Error> {
    Device::parse(record, |_| Ok(DeviceKind::AlarmSiren))
}

pub(crate) fn remote(record: &Value) -> Result<Device, serde_json::Error> {
    Device::parse(record, |_| Ok(DeviceKind::Remote))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn thermostat_record() -> Value {
        json!({
            "id": "3014F7110000000000000001",
            "homeId": "home-1",
            "label": "Living room valve",
            "type": "HEATING_THERMOSTAT",
            "lastStatusUpdate": 1_524_516_526_498_i64,
            "firmwareVersion": "2.0.2",
            "modelType": "HMIP-eTRV",
            "permanentlyReachable": false,
            "functionalChannels": {
                "0": {
                    "functionalChannelType": "DEVICE_OPERATIONLOCK",
                    "unreach": false,
                    "lowBat": true,
                    "rssiDeviceValue": -65,
                    "rssiPeerValue": -66,
                    "dutyCycle": false,
                    "configPending": false
                },
                "1": {
                    "functionalChannelType": "HEATING_THERMOSTAT_CHANNEL",
                    "temperatureOffset": 0.0,
                    "valvePosition": 0.35,
                    "valveState": "ADAPTION_DONE",
                    "setPointTemperature": 21.0
                }
            }
        })
    }

    #[test]
    fn thermostat_reads_both_channels() {
        let device = heating_thermostat(&thermostat_record()).unwrap();

        assert_eq!(device.label.as_deref(), Some("Living room valve"));
        assert_eq!(device.low_bat, Some(true));
        assert_eq!(device.rssi_device_value, Some(-65));
        assert!(device.last_status_update.is_some());
        match device.kind {
            DeviceKind::HeatingThermostat(ref t) => {
                assert_eq!(t.valve_position, Some(0.35));
                assert_eq!(t.valve_state.as_deref(), Some("ADAPTION_DONE"));
            }
            ref other => panic!("unexpected kind {other:?}"),
        }
    }

    #[test]
    fn generic_keeps_raw_type() {
        let mut record = thermostat_record();
        record["type"] = json!("SOMETHING_NEW");
        let device = generic(&record).unwrap();
        assert!(device.is_generic());
        assert_eq!(device.device_type, "SOMETHING_NEW");
        assert_eq!(device.id, "3014F7110000000000000001");
    }

    #[test]
    fn missing_channels_default() {
        let device = shutter_contact(&json!({ "id": "d", "type": "SHUTTER_CONTACT" })).unwrap();
        assert_eq!(device.kind, DeviceKind::ShutterContact(ShutterContact::default()));
        assert!(device.unreach.is_none());
    }

    #[test]
    fn missing_id_is_an_error() {
        assert!(generic(&json!({ "type": "PLUGABLE_SWITCH" })).is_err());
    }
}
