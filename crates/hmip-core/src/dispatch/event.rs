use std::sync::Arc;

use strum::{AsRefStr, Display, EnumString};
use thiserror::Error;

use crate::model::Entity;

/// The push-event kinds the dispatcher applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display, AsRefStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum PushEventType {
    HomeChanged,
    GroupAdded,
    GroupChanged,
    GroupRemoved,
    DeviceAdded,
    DeviceChanged,
    DeviceRemoved,
    ClientAdded,
    ClientChanged,
    ClientRemoved,
    SecurityJournalChanged,
}

/// One event that changed the graph (or, for the journal, signalled a change).
#[derive(Debug, Clone)]
pub struct AppliedEvent {
    pub event_type: PushEventType,
    /// The added, changed, or removed entity. `None` for journal changes.
    pub entity: Option<Entity>,
}

/// Why an event inside a message was not applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApplyError {
    #[error("unknown push event type")]
    UnknownType,

    #[error("no {kind} with id {id}")]
    LookupMiss { kind: &'static str, id: String },

    #[error("malformed payload: {reason}")]
    Malformed { reason: String },

    #[error("no snapshot loaded yet")]
    NoSnapshot,
}

impl ApplyError {
    pub(crate) fn malformed(reason: impl std::fmt::Display) -> Self {
        Self::Malformed {
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SkippedEvent {
    /// The raw `pushEventType`, kept even when it is not recognized.
    pub event_type: String,
    pub error: ApplyError,
}

/// Everything one push message did, in message order.
#[derive(Debug, Clone, Default)]
pub struct EventBatch {
    pub applied: Vec<AppliedEvent>,
    pub skipped: Vec<SkippedEvent>,
}

impl EventBatch {
    pub fn is_empty(&self) -> bool {
        self.applied.is_empty() && self.skipped.is_empty()
    }
}

pub type SharedBatch = Arc<EventBatch>;
