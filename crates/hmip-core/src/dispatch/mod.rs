// ── Push-event dispatcher ──
//
// Consumes raw push messages and applies them to the store. Each message
// is applied to a private copy of the graph and published in one swap;
// every event inside it either applies or is recorded as skipped, so one
// bad event never costs the others. After publication the batch is
// handed to the notification hook and the broadcast channel. Entity
// watchers are updated by the store as part of the publication.

mod event;

use std::sync::Arc;

use futures_core::Stream;
use futures_util::StreamExt;
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub use event::{AppliedEvent, ApplyError, EventBatch, PushEventType, SharedBatch, SkippedEvent};

use crate::error::CoreError;
use crate::hook::EventHook;
use crate::model::{Client, Entity, HomeState};
use crate::registry;
use crate::store::{HomeGraph, HomeStore};

/// How an event stream ended.
#[derive(Debug)]
pub enum StreamEnd {
    /// Stopped on request.
    Cancelled,
    /// The remote side closed the stream.
    Closed,
    /// The stream failed.
    Failed(CoreError),
}

#[derive(Deserialize)]
struct PushMessage {
    events: Map<String, Value>,
}

pub struct Dispatcher {
    store: Arc<HomeStore>,
    hook: Arc<EventHook>,
    batches: broadcast::Sender<SharedBatch>,
}

impl Dispatcher {
    pub fn new(
        store: Arc<HomeStore>,
        hook: Arc<EventHook>,
        batches: broadcast::Sender<SharedBatch>,
    ) -> Self {
        Self {
            store,
            hook,
            batches,
        }
    }

    /// Apply one raw push message, then fire the hook and broadcast.
    ///
    /// Only an undecodable message is an error; problems with individual
    /// events end up in [`EventBatch::skipped`].
    pub fn handle_message(&self, text: &str) -> Result<SharedBatch, CoreError> {
        let message: PushMessage =
            serde_json::from_str(text).map_err(|e| CoreError::malformed("push message", e))?;

        let batch = self.store.modify(|graph| apply_events(graph, &message.events));

        let batch = Arc::new(batch);
        self.hook.fire(&batch);
        // no receivers is fine
        let _ = self.batches.send(Arc::clone(&batch));
        Ok(batch)
    }

    /// Drive `events` until it ends or `cancel` fires.
    ///
    /// Cancellation is only observed between messages: a message that has
    /// been received is always fully applied and notified.
    pub async fn run<S>(&self, mut events: S, cancel: CancellationToken) -> StreamEnd
    where
        S: Stream<Item = Result<String, hmip_api::Error>> + Unpin,
    {
        loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => return StreamEnd::Cancelled,
                next = events.next() => next,
            };

            match next {
                Some(Ok(text)) => {
                    if let Err(e) = self.handle_message(&text) {
                        error!(error = %e, "dropping push message");
                    }
                }
                Some(Err(e)) => {
                    warn!(error = %e, "event stream failed");
                    return StreamEnd::Failed(e.into());
                }
                None => {
                    info!("event stream closed by remote");
                    return StreamEnd::Closed;
                }
            }
        }
    }
}

// ── Event application ────────────────────────────────────────────────

fn apply_events(graph: &mut HomeGraph, events: &Map<String, Value>) -> EventBatch {
    let mut batch = EventBatch::default();
    for record in events.values() {
        let raw_type = record
            .get("pushEventType")
            .and_then(Value::as_str)
            .unwrap_or_default();

        let outcome = raw_type
            .parse::<PushEventType>()
            .map_err(|_| ApplyError::UnknownType)
            .and_then(|event_type| {
                if graph.is_ready() {
                    apply_event(graph, event_type, record)
                } else {
                    Err(ApplyError::NoSnapshot)
                }
            });

        match outcome {
            Ok(applied) => {
                debug!(event_type = raw_type, id = applied.entity.as_ref().map(Entity::id), "applied push event");
                batch.applied.push(applied);
            }
            Err(error) => {
                warn!(event_type = raw_type, error = %error, "skipping push event");
                batch.skipped.push(SkippedEvent {
                    event_type: raw_type.to_owned(),
                    error,
                });
            }
        }
    }
    batch
}

fn payload<'a>(record: &'a Value, key: &str) -> Result<&'a Value, ApplyError> {
    record
        .get(key)
        .filter(|v| !v.is_null())
        .ok_or_else(|| ApplyError::malformed(format!("missing `{key}`")))
}

fn record_id<'a>(record: &'a Value, key: &str) -> Result<&'a str, ApplyError> {
    payload(record, key)?
        .as_str()
        .ok_or_else(|| ApplyError::malformed(format!("`{key}` is not a string")))
}

fn apply_event(
    graph: &mut HomeGraph,
    event_type: PushEventType,
    record: &Value,
) -> Result<AppliedEvent, ApplyError> {
    let entity = match event_type {
        PushEventType::HomeChanged => {
            let home: HomeState =
                serde_json::from_value(payload(record, "home")?.clone()).map_err(ApplyError::malformed)?;
            let home = Arc::new(home);
            graph.set_home(Arc::clone(&home));
            Some(Entity::Home(home))
        }

        PushEventType::GroupAdded | PushEventType::GroupChanged => {
            let data = payload(record, "group")?;
            let id = record_id(data, "id")?;
            if event_type == PushEventType::GroupChanged && graph.search_group_by_id(id).is_none() {
                return Err(ApplyError::LookupMiss { kind: "group", id: id.to_owned() });
            }
            let group = registry::parse_group(data, &graph.members()).map_err(ApplyError::malformed)?;
            let group = Arc::new(group);
            graph.upsert_group(Arc::clone(&group));
            Some(Entity::Group(group))
        }

        PushEventType::GroupRemoved => {
            let id = record_id(record, "id")?;
            let removed = graph
                .remove_group(id)
                .ok_or_else(|| ApplyError::LookupMiss { kind: "group", id: id.to_owned() })?;
            Some(Entity::Group(removed))
        }

        PushEventType::DeviceAdded | PushEventType::DeviceChanged => {
            let data = payload(record, "device")?;
            let device = registry::parse_device(data).map_err(ApplyError::malformed)?;
            let device = Arc::new(device);
            if graph.upsert_device(Arc::clone(&device)) && event_type == PushEventType::DeviceChanged {
                // the matching DEVICE_ADDED never reached us
                info!(id = %device.id, "change for unknown device, added it");
            }
            Some(Entity::Device(device))
        }

        PushEventType::DeviceRemoved => {
            let id = record_id(record, "id")?;
            let removed = graph
                .remove_device(id)
                .ok_or_else(|| ApplyError::LookupMiss { kind: "device", id: id.to_owned() })?;
            Some(Entity::Device(removed))
        }

        PushEventType::ClientAdded | PushEventType::ClientChanged => {
            let data = payload(record, "client")?;
            let client: Client = serde_json::from_value(data.clone()).map_err(ApplyError::malformed)?;
            if event_type == PushEventType::ClientChanged && graph.search_client_by_id(&client.id).is_none() {
                return Err(ApplyError::LookupMiss { kind: "client", id: client.id });
            }
            let client = Arc::new(client);
            graph.upsert_client(Arc::clone(&client));
            Some(Entity::Client(client))
        }

        PushEventType::ClientRemoved => {
            let id = record_id(record, "id")?;
            let removed = graph
                .remove_client(id)
                .ok_or_else(|| ApplyError::LookupMiss { kind: "client", id: id.to_owned() })?;
            Some(Entity::Client(removed))
        }

        PushEventType::SecurityJournalChanged => None,
    };

    Ok(AppliedEvent { event_type, entity })
}
