// ── Groups ──
//
// A group bundles devices (through their channels) or, for meta groups,
// other groups. Member references are stored as ids and only ever point at
// entities present in the graph the group was resolved against.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use super::common::epoch_millis;
use super::device::Device;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Group {
    pub id: String,
    pub home_id: Option<String>,
    pub label: Option<String>,
    pub group_type: String,
    pub last_status_update: Option<DateTime<Utc>>,
    pub unreach: Option<bool>,
    /// Member devices, in channel order, without duplicates.
    pub device_ids: Vec<String>,
    /// Member groups. Only meta groups have any.
    pub group_ids: Vec<String>,
    pub kind: GroupKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum GroupKind {
    Security(SecurityGroup),
    SecurityZone(SecurityZoneGroup),
    Switching(SwitchingGroup),
    SwitchingProfile(SwitchingProfileGroup),
    AlarmSwitching(AlarmSwitchingGroup),
    Heating(HeatingGroup),
    Environment(EnvironmentGroup),
    Rule(RuleGroup),
    Inbox,
    Meta(MetaGroup),
    Generic,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SecurityGroup {
    pub window_state: Option<String>,
    pub motion_detected: Option<bool>,
    pub presence_detected: Option<bool>,
    pub sabotage: Option<bool>,
    pub smoke_detector_alarm_type: Option<String>,
    pub moisture_detected: Option<bool>,
    pub water_level_detected: Option<bool>,
    pub power_main_failure: Option<bool>,
    pub low_bat: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SecurityZoneGroup {
    pub active: Option<bool>,
    pub silent: Option<bool>,
    pub zone_assignment_index: Option<String>,
    pub window_state: Option<String>,
    pub motion_detected: Option<bool>,
    pub presence_detected: Option<bool>,
    pub sabotage: Option<bool>,
    pub low_bat: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SwitchingGroup {
    pub on: Option<bool>,
    pub dim_level: Option<f64>,
    pub low_bat: Option<bool>,
    pub processing: Option<bool>,
    pub shutter_level: Option<f64>,
    pub slats_level: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SwitchingProfileGroup {
    pub on: Option<bool>,
    pub dim_level: Option<f64>,
    pub profile_id: Option<String>,
    pub profile_mode: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AlarmSwitchingGroup {
    pub on: Option<bool>,
    pub on_time: Option<f64>,
    pub signal_acoustic: Option<String>,
    pub signal_optical: Option<String>,
    pub smoke_detector_alarm_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HeatingGroup {
    pub actual_temperature: Option<f64>,
    pub set_point_temperature: Option<f64>,
    pub humidity: Option<i64>,
    pub window_open_temperature: Option<f64>,
    pub min_temperature: Option<f64>,
    pub max_temperature: Option<f64>,
    pub window_state: Option<String>,
    pub cooling: Option<bool>,
    pub party_mode: Option<bool>,
    pub control_mode: Option<String>,
    pub boost_mode: Option<bool>,
    pub boost_duration: Option<i64>,
    pub valve_position: Option<f64>,
    pub eco_allowed: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnvironmentGroup {
    pub actual_temperature: Option<f64>,
    pub humidity: Option<i64>,
    pub illumination: Option<f64>,
    pub raining: Option<bool>,
    pub wind_speed: Option<f64>,
}

/// Automation rule groups (limiters, changeover, alert rules).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RuleGroup {
    pub enabled: Option<bool>,
    pub on: Option<bool>,
    pub triggered: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MetaGroup {
    pub incorrect_position_reached: Option<bool>,
    pub low_bat: Option<bool>,
    pub sabotage: Option<bool>,
    pub config_pending: Option<bool>,
    pub duty_cycle: Option<bool>,
    pub moisture_detected: Option<bool>,
    pub water_level_detected: Option<bool>,
}

// ── Member resolution ────────────────────────────────────────────────

/// The entities a group may reference while it is being constructed.
pub struct Members<'a> {
    devices: &'a IndexMap<String, Arc<Device>>,
    groups: &'a IndexMap<String, Arc<Group>>,
}

impl<'a> Members<'a> {
    pub fn new(
        devices: &'a IndexMap<String, Arc<Device>>,
        groups: &'a IndexMap<String, Arc<Group>>,
    ) -> Self {
        Self { devices, groups }
    }

    fn resolve_devices(&self, group_id: &str, channels: &[ChannelRef]) -> Vec<String> {
        let mut ids: Vec<String> = Vec::with_capacity(channels.len());
        for channel in channels {
            if ids.iter().any(|id| *id == channel.device_id) {
                continue;
            }
            if self.devices.contains_key(&channel.device_id) {
                ids.push(channel.device_id.clone());
            } else {
                warn!(
                    group = group_id,
                    device = %channel.device_id,
                    "group references unknown device, dropping member"
                );
            }
        }
        ids
    }

    fn resolve_groups(&self, group_id: &str, referenced: &[String]) -> Vec<String> {
        let mut ids: Vec<String> = Vec::with_capacity(referenced.len());
        for id in referenced {
            if id == group_id || ids.contains(id) {
                continue;
            }
            if self.groups.contains_key(id) {
                ids.push(id.clone());
            } else {
                warn!(
                    group = group_id,
                    member = %id,
                    "meta group references unknown group, dropping member"
                );
            }
        }
        ids
    }
}

// ── Parsing ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelRef {
    device_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawGroup {
    id: String,
    #[serde(rename = "type")]
    group_type: String,
    #[serde(default)]
    home_id: Option<String>,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    last_status_update: Option<i64>,
    #[serde(default)]
    unreach: Option<bool>,
    #[serde(default)]
    channels: Vec<ChannelRef>,
    #[serde(default)]
    groups: Vec<String>,
}

fn state<T: DeserializeOwned>(record: &Value) -> Result<T, serde_json::Error> {
    T::deserialize(record)
}

impl Group {
    fn parse(
        record: &Value,
        members: &Members<'_>,
        kind: impl FnOnce(&Value) -> Result<GroupKind, serde_json::Error>,
    ) -> Result<Self, serde_json::Error> {
        let raw = RawGroup::deserialize(record)?;
        let kind = kind(record)?;
        let device_ids = members.resolve_devices(&raw.id, &raw.channels);
        let group_ids = if matches!(kind, GroupKind::Meta(_)) {
            members.resolve_groups(&raw.id, &raw.groups)
        } else {
            Vec::new()
        };

        Ok(Self {
            id: raw.id,
            home_id: raw.home_id,
            label: raw.label,
            group_type: raw.group_type,
            last_status_update: epoch_millis(raw.last_status_update),
            unreach: raw.unreach,
            device_ids,
            group_ids,
            kind,
        })
    }

    pub fn is_meta(&self) -> bool {
        matches!(self.kind, GroupKind::Meta(_))
    }
}

// ── Constructors (registered in `registry`) ──────────────────────────

pub(crate) fn generic(record: &Value, members: &Members<'_>) -> Result<Group, serde_json::Error> {
    Group::parse(record, members, |_| Ok(GroupKind::Generic))
}

pub(crate) fn security(record: &Value, members: &Members<'_>) -> Result<Group, serde_json::Error> {
    Group::parse(record, members, |r| state(r).map(GroupKind::Security))
}

pub(crate) fn security_zone(
    record: &Value,
    members: &Members<'_>,
) -> Result<Group, serde_json::Error> {
    Group::parse(record, members, |r| state(r).map(GroupKind::SecurityZone))
}

pub(crate) fn switching(record: &Value, members: &Members<'_>) -> Result<Group, serde_json::Error> {
    Group::parse(record, members, |r| state(r).map(GroupKind::Switching))
}

pub(crate) fn switching_profile(
    record: &Value,
    members: &Members<'_>,
) -> Result<Group, serde_json::Error> {
    Group::parse(record, members, |r| state(r).map(GroupKind::SwitchingProfile))
}

pub(crate) fn alarm_switching(
    record: &Value,
    members: &Members<'_>,
) -> Result<Group, serde_json::Error> {
    Group::parse(record, members, |r| state(r).map(GroupKind::AlarmSwitching))
}

pub(crate) fn heating(record: &Value, members: &Members<'_>) -> Result<Group, serde_json::Error> {
    Group::parse(record, members, |r| state(r).map(GroupKind::Heating))
}

pub(crate) fn environment(
    record: &Value,
    members: &Members<'_>,
) -> Result<Group, serde_json::Error> {
    Group::parse(record, members, |r| state(r).map(GroupKind::Environment))
}

pub(crate) fn rule(record: &Value, members: &Members<'_>) -> Result<Group, serde_json::Error> {
    Group::parse(record, members, |r| state(r).map(GroupKind::Rule))
}

pub(crate) fn inbox(record: &Value, members: &Members<'_>) -> Result<Group, serde_json::Error> {
    Group::parse(record, members, |_| Ok(GroupKind::Inbox))
}

pub(crate) fn meta(record: &Value, members: &Members<'_>) -> Result<Group, serde_json::Error> {
    Group::parse(record, members, |r| state(r).map(GroupKind::Meta))
}
