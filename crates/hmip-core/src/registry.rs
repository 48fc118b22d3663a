// ── Type registry ──
//
// Maps the cloud's type discriminators onto constructors. The tag sets are
// closed enums, so adding a kind means adding a variant and its arm below.
// Unknown tags fall back to a generic constructor for their category and
// are logged, never rejected.

use std::str::FromStr;

use serde_json::Value;
use strum::{AsRefStr, Display, EnumIter, EnumString};
use tracing::warn;

use crate::model::{Device, Group, Members, SecurityEvent, device, group, security_event, type_tag};

pub type DeviceConstructor = fn(&Value) -> Result<Device, serde_json::Error>;
pub type GroupConstructor = fn(&Value, &Members<'_>) -> Result<Group, serde_json::Error>;
pub type SecurityEventConstructor = fn(&Value) -> Result<SecurityEvent, serde_json::Error>;

/// Outcome of a registry lookup.
#[derive(Debug, Clone, Copy)]
pub enum Resolution<C> {
    Registered(C),
    Fallback(C),
}

impl<C: Copy> Resolution<C> {
    pub fn constructor(&self) -> C {
        match self {
            Self::Registered(c) | Self::Fallback(c) => *c,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }
}

// ── Tag sets ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display, AsRefStr, EnumIter)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviceType {
    HeatingThermostat,
    ShutterContact,
    ShutterContactInvisible,
    RotaryHandleSensor,
    WallMountedThermostatPro,
    BrandWallMountedThermostat,
    TemperatureHumiditySensorDisplay,
    TemperatureHumiditySensor,
    TemperatureHumiditySensorOutdoor,
    SmokeDetector,
    PlugableSwitch,
    PlugableSwitchMeasuring,
    BrandSwitchMeasuring,
    FullFlushSwitchMeasuring,
    MotionDetectorIndoor,
    MotionDetectorOutdoor,
    MotionDetectorPushButton,
    PresenceDetectorIndoor,
    PushButton,
    BrandPushButton,
    KeyRemoteControlAlarm,
    AlarmSirenIndoor,
    FullFlushShutter,
    BrandShutter,
    #[strum(serialize = "FLOOR_TERMINAL_BLOCK_6")]
    FloorTerminalBlock6,
    #[strum(serialize = "FLOOR_TERMINAL_BLOCK_10")]
    FloorTerminalBlock10,
    WaterSensor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display, AsRefStr, EnumIter)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum GroupType {
    Meta,
    Security,
    SecurityZone,
    Switching,
    LinkedSwitching,
    ExtendedLinkedSwitching,
    SwitchingProfile,
    AlarmSwitching,
    SecurityBackupAlarmSwitching,
    Heating,
    Environment,
    HeatingHumidityLimiter,
    HeatingTemperatureLimiter,
    HeatingChangeover,
    HeatingDehumidifier,
    HeatingCoolingDemand,
    HeatingCoolingDemandBoiler,
    HeatingCoolingDemandPump,
    HeatingExternalClock,
    HeatingFailureAlertRuleGroup,
    HumidityWarningRuleGroup,
    OverHeatProtectionRule,
    SmokeAlarmDetectionRule,
    Inbox,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display, AsRefStr, EnumIter)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SecurityEventType {
    AccessPointConnected,
    AccessPointDisconnected,
    ActivationChanged,
    SilenceChanged,
    SensorEvent,
    Sabotage,
    MoistureDetectionEvent,
    SmokeAlarm,
    ExternalTriggered,
    OfflineAlarm,
    WaterDetectionEvent,
    MainsFailureEvent,
    OfflineWaterDetectionEvent,
}

// ── Resolution ───────────────────────────────────────────────────────

fn device_constructor(tag: DeviceType) -> DeviceConstructor {
    match tag {
        DeviceType::HeatingThermostat => device::heating_thermostat,
        DeviceType::ShutterContact
        | DeviceType::ShutterContactInvisible
        | DeviceType::RotaryHandleSensor => device::shutter_contact,
        DeviceType::WallMountedThermostatPro
        | DeviceType::BrandWallMountedThermostat
        | DeviceType::TemperatureHumiditySensorDisplay => device::wall_mounted_thermostat,
        DeviceType::TemperatureHumiditySensor | DeviceType::TemperatureHumiditySensorOutdoor => {
            device::temperature_humidity_sensor
        }
        DeviceType::SmokeDetector => device::smoke_detector,
        DeviceType::PlugableSwitch => device::switch,
        DeviceType::PlugableSwitchMeasuring
        | DeviceType::BrandSwitchMeasuring
        | DeviceType::FullFlushSwitchMeasuring => device::switch_measuring,
        DeviceType::MotionDetectorIndoor
        | DeviceType::MotionDetectorOutdoor
        | DeviceType::MotionDetectorPushButton
        | DeviceType::PresenceDetectorIndoor => device::motion_detector,
        DeviceType::PushButton | DeviceType::BrandPushButton | DeviceType::KeyRemoteControlAlarm => {
            device::remote
        }
        DeviceType::AlarmSirenIndoor => device::alarm_siren,
        DeviceType::FullFlushShutter | DeviceType::BrandShutter => device::shutter,
        DeviceType::FloorTerminalBlock6 | DeviceType::FloorTerminalBlock10 => {
            device::floor_terminal_block
        }
        DeviceType::WaterSensor => device::water_sensor,
    }
}

fn group_constructor(tag: GroupType) -> GroupConstructor {
    match tag {
        GroupType::Meta => group::meta,
        GroupType::Security => group::security,
        GroupType::SecurityZone => group::security_zone,
        GroupType::Switching | GroupType::LinkedSwitching | GroupType::ExtendedLinkedSwitching => {
            group::switching
        }
        GroupType::SwitchingProfile => group::switching_profile,
        GroupType::AlarmSwitching | GroupType::SecurityBackupAlarmSwitching => {
            group::alarm_switching
        }
        GroupType::Heating => group::heating,
        GroupType::Environment => group::environment,
        GroupType::HeatingHumidityLimiter
        | GroupType::HeatingTemperatureLimiter
        | GroupType::HeatingChangeover
        | GroupType::HeatingDehumidifier
        | GroupType::HeatingCoolingDemand
        | GroupType::HeatingCoolingDemandBoiler
        | GroupType::HeatingCoolingDemandPump
        | GroupType::HeatingExternalClock
        | GroupType::HeatingFailureAlertRuleGroup
        | GroupType::HumidityWarningRuleGroup
        | GroupType::OverHeatProtectionRule
        | GroupType::SmokeAlarmDetectionRule => group::rule,
        GroupType::Inbox => group::inbox,
    }
}

fn security_event_constructor(tag: SecurityEventType) -> SecurityEventConstructor {
    match tag {
        SecurityEventType::AccessPointConnected => security_event::access_point_connected,
        SecurityEventType::AccessPointDisconnected => security_event::access_point_disconnected,
        SecurityEventType::ActivationChanged => security_event::activation_changed,
        SecurityEventType::SilenceChanged => security_event::silence_changed,
        SecurityEventType::SensorEvent => security_event::sensor_event,
        SecurityEventType::Sabotage => security_event::sabotage,
        SecurityEventType::MoistureDetectionEvent => security_event::moisture_detection,
        SecurityEventType::SmokeAlarm => security_event::smoke_alarm,
        SecurityEventType::ExternalTriggered => security_event::external_triggered,
        SecurityEventType::OfflineAlarm => security_event::offline_alarm,
        SecurityEventType::WaterDetectionEvent => security_event::water_detection,
        SecurityEventType::MainsFailureEvent => security_event::mains_failure,
        SecurityEventType::OfflineWaterDetectionEvent => security_event::offline_water_detection,
    }
}

pub fn resolve_device(tag: &str) -> Resolution<DeviceConstructor> {
    match DeviceType::from_str(tag) {
        Ok(t) => Resolution::Registered(device_constructor(t)),
        Err(_) => Resolution::Fallback(device::generic),
    }
}

pub fn resolve_group(tag: &str) -> Resolution<GroupConstructor> {
    match GroupType::from_str(tag) {
        Ok(t) => Resolution::Registered(group_constructor(t)),
        Err(_) => Resolution::Fallback(group::generic),
    }
}

pub fn resolve_security_event(tag: &str) -> Resolution<SecurityEventConstructor> {
    match SecurityEventType::from_str(tag) {
        Ok(t) => Resolution::Registered(security_event_constructor(t)),
        Err(_) => Resolution::Fallback(security_event::generic),
    }
}

// ── Parse helpers ────────────────────────────────────────────────────

fn record_id(record: &Value) -> &str {
    record.get("id").and_then(Value::as_str).unwrap_or("<unknown>")
}

/// Whether `record` is a meta group, which must be resolved after its members.
pub(crate) fn is_meta_group(record: &Value) -> bool {
    type_tag(record) == Some(GroupType::Meta.as_ref())
}

pub fn parse_device(record: &Value) -> Result<Device, serde_json::Error> {
    let tag = type_tag(record).unwrap_or_default();
    let resolution = resolve_device(tag);
    if resolution.is_fallback() {
        warn!(device_type = tag, id = record_id(record), "no device kind registered for type, using generic device");
    }
    (resolution.constructor())(record)
}

pub fn parse_group(record: &Value, members: &Members<'_>) -> Result<Group, serde_json::Error> {
    let tag = type_tag(record).unwrap_or_default();
    let resolution = resolve_group(tag);
    if resolution.is_fallback() {
        warn!(group_type = tag, id = record_id(record), "no group kind registered for type, using generic group");
    }
    (resolution.constructor())(record, members)
}

pub fn parse_security_event(record: &Value) -> Result<SecurityEvent, serde_json::Error> {
    let tag = type_tag(record).unwrap_or_default();
    let resolution = resolve_security_event(tag);
    if resolution.is_fallback() {
        warn!(event_type = tag, "no journal entry kind registered for type, using generic entry");
    }
    (resolution.constructor())(record)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{DeviceKind, GroupKind, SecurityEventKind};
    use indexmap::IndexMap;
    use serde_json::json;
    use strum::IntoEnumIterator;

    #[test]
    fn every_device_tag_round_trips_through_strum() {
        for tag in DeviceType::iter() {
            assert_eq!(DeviceType::from_str(tag.as_ref()).unwrap(), tag);
            assert!(!resolve_device(tag.as_ref()).is_fallback());
        }
    }

    #[test]
    fn wire_tags_match_cloud_names() {
        assert_eq!(DeviceType::WallMountedThermostatPro.as_ref(), "WALL_MOUNTED_THERMOSTAT_PRO");
        assert_eq!(DeviceType::FloorTerminalBlock6.as_ref(), "FLOOR_TERMINAL_BLOCK_6");
        assert_eq!(GroupType::HeatingCoolingDemandBoiler.as_ref(), "HEATING_COOLING_DEMAND_BOILER");
        assert_eq!(SecurityEventType::MoistureDetectionEvent.as_ref(), "MOISTURE_DETECTION_EVENT");
    }

    #[test]
    fn unknown_device_tag_falls_back_to_generic() {
        assert!(resolve_device("NOT_A_DEVICE").is_fallback());

        let device = parse_device(&json!({ "id": "d9", "type": "NOT_A_DEVICE" })).unwrap();
        assert_eq!(device.kind, DeviceKind::Generic);
        assert_eq!(device.id, "d9");
    }

    #[test]
    fn registered_device_tag_picks_its_kind() {
        let device = parse_device(&json!({
            "id": "d1",
            "type": "PLUGABLE_SWITCH_MEASURING",
            "functionalChannels": { "1": { "on": true, "energyCounter": 1.5 } }
        }))
        .unwrap();
        assert!(matches!(device.kind, DeviceKind::SwitchMeasuring(ref s) if s.on == Some(true)));
    }

    #[test]
    fn unknown_group_tag_falls_back_to_generic() {
        let devices = IndexMap::new();
        let groups = IndexMap::new();
        let group = parse_group(
            &json!({ "id": "g9", "type": "BRAND_NEW_GROUP" }),
            &Members::new(&devices, &groups),
        )
        .unwrap();
        assert_eq!(group.kind, GroupKind::Generic);
    }

    #[test]
    fn meta_detection_uses_type_tag() {
        assert!(is_meta_group(&json!({ "type": "META" })));
        assert!(!is_meta_group(&json!({ "type": "HEATING" })));
    }

    #[test]
    fn unknown_journal_entry_is_generic() {
        let event = parse_security_event(&json!({ "eventType": "SOMETHING_ELSE" })).unwrap();
        assert_eq!(event.kind, SecurityEventKind::Generic);
        assert_eq!(event.event_type, "SOMETHING_ELSE");
    }
}
