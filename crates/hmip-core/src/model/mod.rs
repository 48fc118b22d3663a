// ── Domain model ──
//
// Typed records for everything the cloud describes: the home itself, its
// devices, groups and clients, plus security journal entries. Devices and
// groups share a common record and carry their type-specific state in a
// `kind` enum chosen by the type registry.

mod client;
mod common;
pub(crate) mod device;
pub(crate) mod group;
mod home;
pub(crate) mod security_event;

pub use client::Client;
pub use device::{
    Device, DeviceKind, FloorTerminalBlock, HeatingThermostat, MotionDetector, Shutter,
    ShutterContact, SmokeDetector, Switch, SwitchMeasuring, TemperatureHumiditySensor,
    WallMountedThermostat, WaterSensor,
};
pub use group::{
    AlarmSwitchingGroup, EnvironmentGroup, Group, GroupKind, HeatingGroup, Members, MetaGroup,
    RuleGroup, SecurityGroup, SecurityZoneGroup, SwitchingGroup, SwitchingProfileGroup,
};
pub use home::{HomeState, Location, OAuthOtk, Weather};
pub use security_event::{SecurityEvent, SecurityEventKind, ZoneValues};

pub(crate) use common::type_tag;

use std::sync::Arc;

/// Any addressable entity of the home graph.
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    Home(Arc<HomeState>),
    Device(Arc<Device>),
    Group(Arc<Group>),
    Client(Arc<Client>),
}

impl Entity {
    pub fn id(&self) -> &str {
        match self {
            Self::Home(h) => &h.id,
            Self::Device(d) => &d.id,
            Self::Group(g) => &g.id,
            Self::Client(c) => &c.id,
        }
    }
}
