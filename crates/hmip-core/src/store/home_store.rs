// ── Central reactive home store ──
//
// Readers load the current graph wait-free through `ArcSwap`. Writers are
// serialized by a mutex and publish each finished graph with one atomic
// swap, so no reader ever sees half an update. Whole-graph and per-entity
// change notification go out through `watch` channels.

use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::watch;

use super::HomeGraph;
use crate::model::Entity;
use crate::stream::GraphStream;

pub struct HomeStore {
    current: ArcSwap<HomeGraph>,
    writer: Mutex<()>,
    snapshot: watch::Sender<Arc<HomeGraph>>,
    watchers: DashMap<String, watch::Sender<Option<Entity>>>,
    pub(crate) last_full_refresh: watch::Sender<Option<DateTime<Utc>>>,
    pub(crate) last_push_event: watch::Sender<Option<DateTime<Utc>>>,
}

impl HomeStore {
    pub fn new() -> Self {
        let empty = Arc::new(HomeGraph::default());
        let (snapshot, _) = watch::channel(Arc::clone(&empty));
        let (last_full_refresh, _) = watch::channel(None);
        let (last_push_event, _) = watch::channel(None);

        Self {
            current: ArcSwap::new(empty),
            writer: Mutex::new(()),
            snapshot,
            watchers: DashMap::new(),
            last_full_refresh,
            last_push_event,
        }
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// The current graph. Stays valid (and unchanged) however long it is held.
    pub fn graph(&self) -> Arc<HomeGraph> {
        self.current.load_full()
    }

    pub fn is_ready(&self) -> bool {
        self.current.load().is_ready()
    }

    pub fn last_full_refresh(&self) -> Option<DateTime<Utc>> {
        *self.last_full_refresh.borrow()
    }

    pub fn last_push_event(&self) -> Option<DateTime<Utc>> {
        *self.last_push_event.borrow()
    }

    // ── Subscriptions ────────────────────────────────────────────────

    /// Subscribe to whole-graph publications.
    pub fn subscribe(&self) -> GraphStream {
        GraphStream::new(self.snapshot.subscribe())
    }

    /// Watch one entity by id. The value follows every publication that
    /// changes it, including member pruning, and is `None` while absent.
    pub fn watch_entity(&self, id: &str) -> watch::Receiver<Option<Entity>> {
        self.watchers
            .entry(id.to_owned())
            .or_insert_with(|| watch::channel(self.graph().entity(id)).0)
            .subscribe()
    }

    // ── Writes ───────────────────────────────────────────────────────

    /// Replace the whole graph with a freshly built snapshot.
    pub(crate) fn replace(&self, graph: HomeGraph) {
        {
            let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
            self.publish(Arc::new(graph));
        }
        self.last_full_refresh.send_replace(Some(Utc::now()));
    }

    /// Apply `f` to a private copy of the current graph, then publish it.
    pub(crate) fn modify<R>(&self, f: impl FnOnce(&mut HomeGraph) -> R) -> R {
        let result = {
            let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
            let mut next = HomeGraph::clone(&self.current.load_full());
            let result = f(&mut next);
            self.publish(Arc::new(next));
            result
        };
        self.last_push_event.send_replace(Some(Utc::now()));
        result
    }

    /// Caller holds `writer`. Entity watchers are brought in line with
    /// `graph` before the lock is released, so a later writer always
    /// overwrites them last.
    fn publish(&self, graph: Arc<HomeGraph>) {
        self.current.store(Arc::clone(&graph));

        self.watchers.retain(|_, watcher| watcher.receiver_count() > 0);
        for watcher in &self.watchers {
            let next = graph.entity(watcher.key());
            watcher.value().send_if_modified(|current| {
                if same_entity(current.as_ref(), next.as_ref()) {
                    false
                } else {
                    *current = next;
                    true
                }
            });
        }

        self.snapshot.send_replace(graph);
    }
}

fn same_entity(a: Option<&Entity>, b: Option<&Entity>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(Entity::Home(a)), Some(Entity::Home(b))) => Arc::ptr_eq(a, b),
        (Some(Entity::Device(a)), Some(Entity::Device(b))) => Arc::ptr_eq(a, b),
        (Some(Entity::Group(a)), Some(Entity::Group(b))) => Arc::ptr_eq(a, b),
        (Some(Entity::Client(a)), Some(Entity::Client(b))) => Arc::ptr_eq(a, b),
        _ => false,
    }
}

impl Default for HomeStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::build_graph;
    use serde_json::json;

    fn snapshot(label: &str) -> HomeGraph {
        build_graph(&json!({
            "home": { "id": "home-1" },
            "devices": {
                "d1": { "id": "d1", "type": "PLUGABLE_SWITCH", "label": label }
            },
            "groups": {},
            "clients": {}
        }))
        .unwrap()
    }

    #[test]
    fn readers_keep_their_graph_across_writes() {
        let store = HomeStore::new();
        assert!(!store.is_ready());

        store.replace(snapshot("before"));
        let held = store.graph();

        store.modify(|g| {
            g.remove_device("d1");
        });

        assert_eq!(held.device_count(), 1);
        assert_eq!(store.graph().device_count(), 0);
        assert!(store.last_push_event().is_some());
    }

    #[test]
    fn entity_watch_sees_replacement_and_removal() {
        let store = HomeStore::new();
        store.replace(snapshot("before"));

        let rx = store.watch_entity("d1");
        assert!(matches!(*rx.borrow(), Some(Entity::Device(ref d)) if d.label.as_deref() == Some("before")));

        store.replace(snapshot("after"));
        assert!(matches!(*rx.borrow(), Some(Entity::Device(ref d)) if d.label.as_deref() == Some("after")));

        store.modify(|g| {
            g.remove_device("d1");
        });
        assert!(rx.borrow().is_none());
    }

    #[test]
    fn entity_watch_opened_before_the_entity_exists() {
        let store = HomeStore::new();
        let rx = store.watch_entity("d1");
        assert!(rx.borrow().is_none());

        store.replace(snapshot("late"));
        assert!(matches!(*rx.borrow(), Some(Entity::Device(ref d)) if d.label.as_deref() == Some("late")));
    }

    #[test]
    fn unchanged_entity_is_not_re_sent() {
        let store = HomeStore::new();
        store.replace(snapshot("same"));
        let rx = store.watch_entity("home-1");

        store.modify(|g| {
            g.remove_device("d1");
        });
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn dropped_watchers_are_pruned() {
        let store = HomeStore::new();
        store.replace(snapshot("x"));

        let kept = store.watch_entity("d1");
        drop(store.watch_entity("home-1"));
        assert_eq!(store.watchers.len(), 2);

        store.modify(|_| ());
        assert_eq!(store.watchers.len(), 1);
        assert!(store.watchers.contains_key("d1"));
        drop(kept);
    }

    #[test]
    fn concurrent_writers_leave_watchers_on_the_published_graph() {
        let store = HomeStore::new();
        store.replace(snapshot("start"));
        let rx = store.watch_entity("d1");

        std::thread::scope(|s| {
            s.spawn(|| {
                for i in 0..200 {
                    store.replace(snapshot(&format!("refresh {i}")));
                }
            });
            s.spawn(|| {
                for i in 0..200 {
                    store.modify(|g| {
                        let device = crate::registry::parse_device(&json!({
                            "id": "d1",
                            "type": "PLUGABLE_SWITCH",
                            "label": format!("push {i}")
                        }))
                        .unwrap();
                        g.upsert_device(Arc::new(device));
                    });
                }
            });
        });

        let published = store.graph().entity("d1");
        assert!(same_entity(rx.borrow().as_ref(), published.as_ref()));
    }

    #[tokio::test]
    async fn graph_subscribers_see_publications() {
        let store = HomeStore::new();
        let mut stream = store.subscribe();
        assert!(!stream.current().is_ready());

        store.replace(snapshot("x"));
        let next = stream.changed().await.unwrap();
        assert!(next.is_ready());
        assert_eq!(next.device_count(), 1);
    }
}
