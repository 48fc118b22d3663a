use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::common::epoch_millis;

/// One entry of the security journal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SecurityEvent {
    pub event_type: String,
    pub label: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub kind: SecurityEventKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SecurityEventKind {
    AccessPointConnected,
    AccessPointDisconnected,
    ActivationChanged(ZoneValues),
    SilenceChanged(ZoneValues),
    SensorEvent,
    Sabotage,
    MoistureDetection,
    SmokeAlarm,
    ExternalTriggered,
    OfflineAlarm,
    WaterDetection,
    MainsFailure,
    OfflineWaterDetection,
    Generic,
}

/// Per-zone flags carried by activation and silence changes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneValues {
    #[serde(rename = "EXTERNAL")]
    pub external: Option<bool>,
    #[serde(rename = "INTERNAL")]
    pub internal: Option<bool>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSecurityEvent {
    event_type: String,
    #[serde(default)]
    label: Option<String>,
    #[serde(default, rename = "eventTimestamp")]
    timestamp: Option<i64>,
    #[serde(default)]
    security_zone_values: Option<ZoneValues>,
}

fn parse(
    record: &Value,
    kind: impl FnOnce(Option<ZoneValues>) -> SecurityEventKind,
) -> Result<SecurityEvent, serde_json::Error> {
    let raw = RawSecurityEvent::deserialize(record)?;
    Ok(SecurityEvent {
        event_type: raw.event_type,
        label: raw.label,
        timestamp: epoch_millis(raw.timestamp),
        kind: kind(raw.security_zone_values),
    })
}

macro_rules! plain_event {
    ($($name:ident => $kind:ident),* $(,)?) => {
        $(
            pub(crate) fn $name(record: &Value) -> Result<SecurityEvent, serde_json::Error> {
                parse(record, |_| SecurityEventKind::$kind)
            }
        )*
    };
}

plain_event! {
    generic => Generic,
    access_point_connected => AccessPointConnected,
    access_point_disconnected => AccessPointDisconnected,
    sensor_event => SensorEvent,
    sabotage => Sabotage,
    moisture_detection => MoistureDetection,
    smoke_alarm => SmokeAlarm,
    external_triggered => ExternalTriggered,
    offline_alarm => OfflineAlarm,
    water_detection => WaterDetection,
    mains_failure => MainsFailure,
    offline_water_detection => OfflineWaterDetection,
}

pub(crate) fn activation_changed(record: &Value) -> Result<SecurityEvent, serde_json::Error> {
    parse(record, |zones| {
        SecurityEventKind::ActivationChanged(zones.unwrap_or_default())
    })
}

pub(crate) fn silence_changed(record: &Value) -> Result<SecurityEvent, serde_json::Error> {
    parse(record, |zones| {
        SecurityEventKind::SilenceChanged(zones.unwrap_or_default())
    })
}
