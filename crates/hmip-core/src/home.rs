// ── Home facade ──
//
// Owns one mirrored home: the transport, the graph store, the dispatcher
// and the notification hook. Snapshot fetches, the push-event listener,
// commands and the security journal all go through here.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::Url;

use hmip_api::{ApiRequest, HmipClient, HostUrls, Transport};

use crate::command::{Command, CommandResult};
use crate::config::HomeConfig;
use crate::dispatch::{Dispatcher, SharedBatch, StreamEnd};
use crate::error::CoreError;
use crate::hook::{EventHook, HookError, SubscriptionId};
use crate::model::{Client, Device, Entity, Group, HomeState, OAuthOtk, SecurityEvent};
use crate::registry;
use crate::store::{HomeGraph, HomeStore, build_graph};
use crate::stream::GraphStream;

const BATCH_CHANNEL_SIZE: usize = 256;

const GET_CURRENT_STATE: &str = "home/getCurrentState";
const GET_SECURITY_JOURNAL: &str = "home/security/getSecurityJournal";
const GET_OAUTH_OTK: &str = "home/getOAuthOTK";

// ── ConnectionState ──────────────────────────────────────────────────

/// State of the push-event stream, observable by consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// The cloud closed the stream. Reconnecting is up to the caller.
    Closed,
    Failed { reason: String },
}

// ── Home ─────────────────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable. All clones share one graph, one hook and one
/// event listener.
pub struct Home<T: Transport> {
    inner: Arc<HomeInner<T>>,
}

impl<T: Transport> Clone for Home<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct HomeInner<T> {
    config: HomeConfig,
    transport: T,
    store: Arc<HomeStore>,
    hook: Arc<EventHook>,
    batches: broadcast::Sender<SharedBatch>,
    connection_state: watch::Sender<ConnectionState>,
    dispatcher: Dispatcher,
    listener: Mutex<Option<Listener>>,
}

struct Listener {
    cancel: CancellationToken,
    handle: JoinHandle<StreamEnd>,
}

impl Home<HmipClient> {
    /// Resolve the cloud hosts, load the first snapshot and, if
    /// configured, start listening for push events.
    pub async fn connect(config: HomeConfig) -> Result<Self, CoreError> {
        let credentials = config.credentials();
        let transport = config.transport();

        let client = if let (Some(rest), Some(websocket)) =
            (&config.rest_url, &config.websocket_url)
        {
            debug!(%rest, %websocket, "using configured hosts");
            let hosts = HostUrls {
                rest: rest.clone(),
                websocket: websocket.clone(),
            };
            HmipClient::new(hosts, credentials, &transport)?
        } else {
            let lookup_url = Url::parse(&config.lookup_url).map_err(|e| CoreError::Config {
                message: format!("invalid lookup URL {}: {e}", config.lookup_url),
            })?;
            HmipClient::discover(
                &lookup_url,
                &config.access_point_id,
                &config.characteristics,
                credentials,
                &transport,
            )
            .await?
        };

        let home = Self::new(config, client);
        home.get_current_state().await?;
        if home.inner.config.events_enabled {
            home.enable_events().await?;
        }
        info!(access_point = %home.inner.config.access_point_id, "home connected");
        Ok(home)
    }
}

impl<T: Transport> Home<T> {
    /// Wrap an existing transport. Nothing is fetched until
    /// [`get_current_state()`](Self::get_current_state) is called.
    pub fn new(config: HomeConfig, transport: T) -> Self {
        let store = Arc::new(HomeStore::new());
        let hook = Arc::new(EventHook::new());
        let (batches, _) = broadcast::channel(BATCH_CHANNEL_SIZE);
        let (connection_state, _) = watch::channel(ConnectionState::Disconnected);
        let dispatcher = Dispatcher::new(Arc::clone(&store), Arc::clone(&hook), batches.clone());

        Self {
            inner: Arc::new(HomeInner {
                config,
                transport,
                store,
                hook,
                batches,
                connection_state,
                dispatcher,
                listener: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &HomeConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<HomeStore> {
        &self.inner.store
    }

    pub fn transport(&self) -> &T {
        &self.inner.transport
    }

    // ── Snapshot ─────────────────────────────────────────────────────

    /// Fetch the full state and replace the graph with it.
    ///
    /// On a remote error code or malformed document the current graph
    /// stays in place.
    pub async fn get_current_state(&self) -> Result<(), CoreError> {
        let config = &self.inner.config;
        let body = config
            .characteristics
            .request_body(&config.access_point_id);
        let document = self
            .inner
            .transport
            .call(ApiRequest::new(GET_CURRENT_STATE).with_body(body))
            .await?;

        let graph = build_graph(&document)?;
        debug!(
            devices = graph.device_count(),
            groups = graph.group_count(),
            clients = graph.client_count(),
            "snapshot built"
        );
        self.inner.store.replace(graph);
        Ok(())
    }

    // ── Push events ──────────────────────────────────────────────────

    /// Open the event stream and apply incoming messages in the background.
    ///
    /// Does nothing if a listener is already running.
    pub async fn enable_events(&self) -> Result<(), CoreError> {
        let mut slot = self.inner.listener.lock().await;
        if slot.as_ref().is_some_and(|l| !l.handle.is_finished()) {
            debug!("event listener already running");
            return Ok(());
        }

        self.set_state(ConnectionState::Connecting);
        let events = match self.inner.transport.open_event_stream().await {
            Ok(events) => events,
            Err(e) => {
                let err = CoreError::from(e);
                self.set_state(ConnectionState::Failed {
                    reason: err.to_string(),
                });
                return Err(err);
            }
        };
        self.set_state(ConnectionState::Connected);
        info!("event stream open");

        let cancel = CancellationToken::new();
        let inner = Arc::clone(&self.inner);
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            let end = inner.dispatcher.run(events, token).await;
            let state = match &end {
                StreamEnd::Cancelled => ConnectionState::Disconnected,
                StreamEnd::Closed => ConnectionState::Closed,
                StreamEnd::Failed(e) => {
                    error!(error = %e, "event listener stopped");
                    ConnectionState::Failed {
                        reason: e.to_string(),
                    }
                }
            };
            inner.connection_state.send_replace(state);
            end
        });

        *slot = Some(Listener { cancel, handle });
        Ok(())
    }

    /// Stop the listener and report how its stream ended.
    ///
    /// A message already being applied is finished first. Returns `None`
    /// if no listener was started.
    pub async fn disable_events(&self) -> Option<StreamEnd> {
        let listener = self.inner.listener.lock().await.take()?;
        listener.cancel.cancel();
        match listener.handle.await {
            Ok(end) => Some(end),
            Err(e) => {
                warn!(error = %e, "event listener task did not finish cleanly");
                self.set_state(ConnectionState::Disconnected);
                Some(StreamEnd::Failed(CoreError::Internal(e.to_string())))
            }
        }
    }

    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.connection_state.subscribe()
    }

    fn set_state(&self, state: ConnectionState) {
        self.inner.connection_state.send_replace(state);
    }

    // ── Notification hook ────────────────────────────────────────────

    /// Register a callback that runs after each applied message.
    pub fn on_event<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&crate::dispatch::EventBatch) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.inner.hook.subscribe(callback)
    }

    pub fn remove_event_handler(&self, id: SubscriptionId) -> bool {
        self.inner.hook.unsubscribe(id)
    }

    /// Async alternative to [`on_event()`](Self::on_event).
    pub fn batches(&self) -> broadcast::Receiver<SharedBatch> {
        self.inner.batches.subscribe()
    }

    // ── Graph reads ──────────────────────────────────────────────────

    pub fn graph(&self) -> Arc<HomeGraph> {
        self.inner.store.graph()
    }

    pub fn home_state(&self) -> Option<Arc<HomeState>> {
        self.graph().home().cloned()
    }

    pub fn search_device_by_id(&self, id: &str) -> Option<Arc<Device>> {
        self.graph().search_device_by_id(id).cloned()
    }

    pub fn search_group_by_id(&self, id: &str) -> Option<Arc<Group>> {
        self.graph().search_group_by_id(id).cloned()
    }

    pub fn search_client_by_id(&self, id: &str) -> Option<Arc<Client>> {
        self.graph().search_client_by_id(id).cloned()
    }

    pub fn subscribe_graph(&self) -> GraphStream {
        self.inner.store.subscribe()
    }

    pub fn watch_entity(&self, id: &str) -> watch::Receiver<Option<Entity>> {
        self.inner.store.watch_entity(id)
    }

    // ── Requests ─────────────────────────────────────────────────────

    /// Send a command. A remote error code comes back as
    /// [`CommandResult::Rejected`]; the graph only changes once the
    /// cloud confirms through a push event.
    pub async fn execute(&self, command: Command) -> Result<CommandResult, CoreError> {
        let endpoint = command.endpoint();
        let response = self.inner.transport.call(command.request()?).await?;
        let result = CommandResult::from_response(&response);
        match &result {
            CommandResult::Ok => debug!(endpoint, "command accepted"),
            CommandResult::Rejected { error_code } => {
                warn!(endpoint, error_code = %error_code, "command rejected");
            }
        }
        Ok(result)
    }

    pub async fn get_security_journal(&self) -> Result<Vec<SecurityEvent>, CoreError> {
        let config = &self.inner.config;
        let body = config
            .characteristics
            .request_body(&config.access_point_id);
        let response = self
            .inner
            .transport
            .call(ApiRequest::new(GET_SECURITY_JOURNAL).with_body(body))
            .await?;
        reject_error_code(&response)?;

        let entries = response
            .get("entries")
            .and_then(Value::as_array)
            .ok_or_else(|| CoreError::malformed("security journal", "missing entries"))?;

        entries
            .iter()
            .map(|entry| {
                registry::parse_security_event(entry)
                    .map_err(|e| CoreError::malformed("security journal entry", e))
            })
            .collect()
    }

    pub async fn get_oauth_otk(&self) -> Result<OAuthOtk, CoreError> {
        let response = self
            .inner
            .transport
            .call(ApiRequest::new(GET_OAUTH_OTK))
            .await?;
        reject_error_code(&response)?;
        OAuthOtk::from_json(&response).map_err(|e| CoreError::malformed("OAuth OTK", e))
    }
}

fn reject_error_code(response: &Value) -> Result<(), CoreError> {
    match response.get("errorCode").filter(|c| !c.is_null()) {
        Some(code) => Err(CoreError::Api {
            code: code.as_str().map_or_else(|| code.to_string(), str::to_owned),
        }),
        None => Ok(()),
    }
}
