// hmip-core: Live mirror of a HomematicIP home between hmip-api and consumers.

pub mod command;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod home;
pub mod hook;
pub mod model;
pub mod registry;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::{Command, CommandResult};
pub use config::{HomeConfig, TlsVerification, normalize_access_point_id};
pub use dispatch::{
    AppliedEvent, ApplyError, Dispatcher, EventBatch, PushEventType, SharedBatch, SkippedEvent,
    StreamEnd,
};
pub use error::CoreError;
pub use home::{ConnectionState, Home};
pub use hook::{EventHook, HookError, SubscriptionId};
pub use store::{HomeGraph, HomeStore, build_graph};
pub use stream::{GraphStream, GraphWatchStream};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    // Entities
    Client, Device, DeviceKind, Entity, Group, GroupKind, HomeState,
    // Home details
    Location, OAuthOtk, Weather,
    // Security journal
    SecurityEvent, SecurityEventKind, ZoneValues,
};
