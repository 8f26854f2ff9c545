// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The event hub
//!
//! `dispatch` stamps the next sequence number and enqueues under one
//! mutex, so queue order is sequence order. A single router task drains the
//! queue: it settles pending responses first, then hands the event to every
//! container registered before the event was sequenced.

use crate::config::HubConfig;
use crate::container::Container;
use crate::error::HubError;
use crate::extension::{Extension, ExtensionApi};
use crate::history;
use crate::listener::ListenerTable;
use crate::response::{PendingResponses, ResponseFuture};
use crate::rules_extension::{self, RulesExtension, RULES_EXTENSION_NAME};
use serde_json::{json, Map, Value};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::Duration;
use sy_core::{
    event_source, event_type, Event, EventData, HistoryRequest, SharedStateKind,
    SharedStateResolution, SharedStateResult, SharedStateTable, EVENT_HUB_STATE_OWNER,
    STATE_OWNER_KEY,
};
use sy_rules::RulesEngine;
use sy_storage::{
    DataStore, EventHistoryStore, FileEventHistory, HistorySummary, MemoryEventHistory,
    NamedCollection,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Version reported in the hub's own shared state
pub const HUB_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application lifecycle signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Foreground,
    Background,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleState::Foreground => write!(f, "foreground"),
            LifecycleState::Background => write!(f, "background"),
        }
    }
}

struct Sequencer {
    last: u64,
    /// `None` once the hub has shut down
    queue: Option<mpsc::UnboundedSender<Arc<Event>>>,
}

type Containers = Arc<RwLock<Vec<Arc<Container>>>>;

pub(crate) struct HubInner {
    config: HubConfig,
    sequencer: Mutex<Sequencer>,
    containers: Containers,
    /// Serializes hub registry publication so its versions never regress
    registry: Mutex<()>,
    states: SharedStateTable,
    history: Arc<dyn EventHistoryStore>,
    responses: Arc<PendingResponses>,
    rules: Arc<RulesEngine>,
    rules_collection: Arc<dyn NamedCollection>,
    router: Mutex<Option<JoinHandle<()>>>,
}

/// Handle to a running hub; clones share the same hub
#[derive(Clone)]
pub struct EventHub {
    inner: Arc<HubInner>,
}

impl EventHub {
    /// Start a hub with the history store named by `config`
    pub async fn start(config: HubConfig) -> Result<Self, HubError> {
        let history: Arc<dyn EventHistoryStore> = match &config.history.path {
            Some(path) => Arc::new(FileEventHistory::open(path)?),
            None => Arc::new(MemoryEventHistory::new()),
        };
        Self::start_with_history(config, history).await
    }

    /// Start a hub on an existing history store.
    ///
    /// Spawns the router task and registers the built-in rules extension.
    pub async fn start_with_history(
        config: HubConfig,
        history: Arc<dyn EventHistoryStore>,
    ) -> Result<Self, HubError> {
        let store = match &config.rules.collection_dir {
            Some(dir) => DataStore::at(dir),
            None => DataStore::in_memory(),
        };
        let rules_collection = store.collection(RULES_EXTENSION_NAME)?;
        let rules = Arc::new(RulesEngine::new(config.rules.engine_options()));

        let (queue, rx) = mpsc::unbounded_channel();
        let containers: Containers = Arc::new(RwLock::new(Vec::new()));
        let responses = Arc::new(PendingResponses::default());
        let router = tokio::spawn(route(rx, Arc::clone(&containers), Arc::clone(&responses)));

        let hub = Self {
            inner: Arc::new(HubInner {
                config,
                sequencer: Mutex::new(Sequencer {
                    last: 0,
                    queue: Some(queue),
                }),
                containers,
                registry: Mutex::new(()),
                states: SharedStateTable::new(),
                history,
                responses,
                rules: Arc::clone(&rules),
                rules_collection: Arc::clone(&rules_collection),
                router: Mutex::new(Some(router)),
            }),
        };
        hub.register_extension(Arc::new(RulesExtension::new(rules, rules_collection)))
            .await?;
        tracing::info!(version = HUB_VERSION, "event hub started");
        Ok(hub)
    }

    pub(crate) fn from_inner(inner: Arc<HubInner>) -> Self {
        Self { inner }
    }

    pub fn config(&self) -> &HubConfig {
        &self.inner.config
    }

    /// Sequence and enqueue `event`; returns its sequence number
    pub fn dispatch(&self, event: Event) -> Result<u64, HubError> {
        self.inner.dispatch(event)
    }

    /// Dispatch `event` and wait up to `timeout` for an event answering it
    pub fn dispatch_with_response(
        &self,
        event: Event,
        timeout: Duration,
    ) -> Result<ResponseFuture, HubError> {
        self.inner.dispatch_with_response(event, timeout)
    }

    /// [`dispatch_with_response`](Self::dispatch_with_response) with the
    /// configured `default_response_timeout`
    pub fn request(&self, event: Event) -> Result<ResponseFuture, HubError> {
        let timeout = self.inner.config.default_response_timeout;
        self.inner.dispatch_with_response(event, timeout)
    }

    /// Callback form of [`dispatch_with_response`](Self::dispatch_with_response).
    ///
    /// `callback` runs exactly once, on a spawned task.
    pub fn dispatch_with_response_callback<F>(
        &self,
        event: Event,
        timeout: Duration,
        callback: F,
    ) -> Result<(), HubError>
    where
        F: FnOnce(Result<Arc<Event>, HubError>) + Send + 'static,
    {
        let response = self.inner.dispatch_with_response(event, timeout)?;
        tokio::spawn(async move { callback(response.await) });
        Ok(())
    }

    /// Register `extension`; resolves once its `on_registered` hook finished
    pub async fn register_extension(
        &self,
        extension: Arc<dyn Extension>,
    ) -> Result<(), HubError> {
        let name = extension.name().to_string();
        if name.is_empty() {
            return Err(HubError::NullArgument("extension name"));
        }
        let listeners = Arc::new(ListenerTable::default());
        let api = ExtensionApi::new(&name, Arc::downgrade(&self.inner), Arc::clone(&listeners));
        let (registered_tx, registered_rx) = tokio::sync::oneshot::channel();

        let container = {
            let sequencer = self.inner.lock_sequencer();
            if sequencer.queue.is_none() {
                return Err(HubError::Shutdown);
            }
            let mut containers = self.inner.write_containers();
            if containers.iter().any(|c| c.name() == name) {
                return Err(HubError::DuplicateExtension(name));
            }
            let container = Arc::new(Container::spawn(
                extension,
                api,
                listeners,
                sequencer.last + 1,
                registered_tx,
            ));
            containers.push(Arc::clone(&container));
            container
        };

        let outcome = registered_rx
            .await
            .unwrap_or_else(|_| Err("registration task ended".to_string()));
        if let Err(reason) = outcome {
            self.inner
                .write_containers()
                .retain(|c| !Arc::ptr_eq(c, &container));
            container.join().await;
            tracing::error!(extension = %name, %reason, "registration failed");
            return Err(HubError::Registration { name, reason });
        }

        tracing::info!(
            extension = %name,
            version = container.version(),
            "extension registered"
        );
        self.inner.publish_registry();
        Ok(())
    }

    /// Run `on_unregistered`, drop the extension's container and shared state
    pub async fn unregister_extension(&self, name: &str) -> Result<(), HubError> {
        let container = {
            let mut containers = self.inner.write_containers();
            let index = containers
                .iter()
                .position(|c| c.name() == name)
                .ok_or_else(|| HubError::ExtensionNotFound(name.to_string()))?;
            containers.remove(index)
        };
        container.unregister().await;
        self.inner.states.remove_owner(name);
        tracing::info!(extension = %name, "extension unregistered");
        self.inner.publish_registry();
        Ok(())
    }

    /// Names of registered extensions in registration order
    pub fn extensions(&self) -> Vec<String> {
        self.inner
            .read_containers()
            .iter()
            .map(|c| c.name().to_string())
            .collect()
    }

    /// Read `owner`'s shared state as seen by `event` (latest when `None`)
    pub fn get_shared_state(
        &self,
        owner: &str,
        event: Option<&Event>,
        resolution: SharedStateResolution,
    ) -> Option<SharedStateResult> {
        self.inner
            .get_shared_state(owner, SharedStateKind::Standard, event, resolution)
    }

    pub fn get_xdm_shared_state(
        &self,
        owner: &str,
        event: Option<&Event>,
        resolution: SharedStateResolution,
    ) -> Option<SharedStateResult> {
        self.inner
            .get_shared_state(owner, SharedStateKind::Xdm, event, resolution)
    }

    /// Count recorded events matching each request.
    ///
    /// With `enforce_order`, each request only searches from the oldest
    /// match of the previous one, and a request after a miss counts zero.
    pub fn get_historical_events(
        &self,
        requests: &[HistoryRequest],
        enforce_order: bool,
    ) -> Result<Vec<HistorySummary>, HubError> {
        self.inner.historical_events(requests, enforce_order)
    }

    /// The history store events are recorded in
    pub fn history(&self) -> Arc<dyn EventHistoryStore> {
        Arc::clone(&self.inner.history)
    }

    /// Engine used by the built-in rules extension
    pub fn rules_engine(&self) -> Arc<RulesEngine> {
        Arc::clone(&self.inner.rules)
    }

    /// Parse and install a rules document, replacing the current rules.
    ///
    /// The document is persisted and reinstalled by the next hub started on
    /// the same collection directory. Returns the number of rules installed.
    pub fn load_rules(&self, document: &str) -> Result<usize, HubError> {
        rules_extension::install(
            &self.inner.rules,
            self.inner.rules_collection.as_ref(),
            document,
        )
    }

    /// Broadcast an application lifecycle change
    pub fn notify_lifecycle(&self, state: LifecycleState) -> Result<u64, HubError> {
        let event = Event::builder("Lifecycle state", event_type::LIFECYCLE, event_source::OS)
            .entry("state", state.to_string())
            .build();
        self.dispatch(event)
    }

    /// Last sequence number handed out
    pub fn current_sequence(&self) -> u64 {
        self.inner.current_sequence()
    }

    /// Stop sequencing, deliver what is already queued, then fail pending
    /// responses and unregister every extension in reverse order
    pub async fn shutdown(&self) {
        self.inner.lock_sequencer().queue = None;
        let router = self
            .inner
            .router
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(router) = router {
            if let Err(e) = router.await {
                tracing::error!(error = %e, "router task failed");
            }
        }
        self.inner.responses.fail_all();

        let names: Vec<String> = self.extensions().into_iter().rev().collect();
        for name in names {
            if let Err(e) = self.unregister_extension(&name).await {
                tracing::warn!(extension = %name, error = %e, "unregister on shutdown failed");
            }
        }
        tracing::info!(sequence = self.current_sequence(), "event hub stopped");
    }
}

impl HubInner {
    fn lock_sequencer(&self) -> MutexGuard<'_, Sequencer> {
        self.sequencer.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn read_containers(&self) -> std::sync::RwLockReadGuard<'_, Vec<Arc<Container>>> {
        self.containers.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_containers(&self) -> std::sync::RwLockWriteGuard<'_, Vec<Arc<Container>>> {
        self.containers.write().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn current_sequence(&self) -> u64 {
        self.lock_sequencer().last
    }

    pub(crate) fn dispatch(&self, event: Event) -> Result<u64, HubError> {
        if event.event_type().is_empty() {
            return Err(HubError::InvalidEvent("empty event type".to_string()));
        }
        if event.source().is_empty() {
            return Err(HubError::InvalidEvent("empty event source".to_string()));
        }

        let mut sequencer = self.lock_sequencer();
        let sequence = sequencer.last + 1;
        let queue = sequencer.queue.as_ref().ok_or(HubError::Shutdown)?;
        // Recorded before delivery so listeners can already see it
        if let Err(e) = self.history.insert(event.fingerprint()) {
            tracing::warn!(event = event.unique_id(), error = %e, "history insert failed");
        }
        let event = Arc::new(event.sequenced(sequence));
        queue.send(Arc::clone(&event)).map_err(|_| HubError::Shutdown)?;
        sequencer.last = sequence;
        drop(sequencer);

        tracing::debug!(
            sequence,
            name = event.name(),
            event_type = event.event_type(),
            source = event.source(),
            "dispatched"
        );
        Ok(sequence)
    }

    pub(crate) fn dispatch_with_response(
        &self,
        event: Event,
        timeout: Duration,
    ) -> Result<ResponseFuture, HubError> {
        let request_id = event.unique_id().to_string();
        let response = self.responses.register(&request_id, timeout);
        if let Err(e) = self.dispatch(event) {
            self.responses.cancel(&request_id);
            return Err(e);
        }
        Ok(response)
    }

    /// Version for a state write: the event's sequence, or the current one
    fn state_version(&self, event: Option<&Event>) -> Result<u64, HubError> {
        match event {
            Some(event) if event.sequence() == 0 => Err(HubError::InvalidEvent(format!(
                "event {} has not been dispatched",
                event.unique_id()
            ))),
            Some(event) => Ok(event.sequence()),
            None => Ok(self.current_sequence()),
        }
    }

    pub(crate) fn set_shared_state(
        &self,
        owner: &str,
        kind: SharedStateKind,
        data: EventData,
        event: Option<&Event>,
    ) -> Result<(), HubError> {
        let version = self.state_version(event)?;
        self.states.set(owner, kind, version, data)?;
        self.notify_state_change(owner, kind);
        Ok(())
    }

    pub(crate) fn reserve_shared_state(
        &self,
        owner: &str,
        kind: SharedStateKind,
        event: Option<&Event>,
    ) -> Result<u64, HubError> {
        let version = self.state_version(event)?;
        self.states.reserve(owner, kind, version)?;
        Ok(version)
    }

    pub(crate) fn resolve_shared_state(
        &self,
        owner: &str,
        kind: SharedStateKind,
        version: u64,
        data: EventData,
    ) -> Result<(), HubError> {
        self.states.resolve(owner, kind, version, data)?;
        self.notify_state_change(owner, kind);
        Ok(())
    }

    /// Events the hub has not sequenced read the latest state
    pub(crate) fn get_shared_state(
        &self,
        owner: &str,
        kind: SharedStateKind,
        event: Option<&Event>,
        resolution: SharedStateResolution,
    ) -> Option<SharedStateResult> {
        let version = event.map(Event::sequence).filter(|&s| s > 0);
        self.states.get(owner, kind, version, resolution)
    }

    pub(crate) fn historical_events(
        &self,
        requests: &[HistoryRequest],
        enforce_order: bool,
    ) -> Result<Vec<HistorySummary>, HubError> {
        Ok(history::query(self.history.as_ref(), requests, enforce_order)?)
    }

    fn notify_state_change(&self, owner: &str, kind: SharedStateKind) {
        let name = match kind {
            SharedStateKind::Standard => "Shared state change",
            SharedStateKind::Xdm => "Shared state change (XDM)",
        };
        let event = Event::builder(name, event_type::HUB, event_source::SHARED_STATE)
            .entry(STATE_OWNER_KEY, owner)
            .build();
        match self.dispatch(event) {
            Ok(_) | Err(HubError::Shutdown) => {}
            Err(e) => tracing::warn!(owner, error = %e, "shared state notification not dispatched"),
        }
    }

    /// Publish the registered extensions as the hub's own shared state
    fn publish_registry(&self) {
        let _registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
        let extensions: Map<String, Value> = self
            .read_containers()
            .iter()
            .map(|c| {
                (
                    c.name().to_string(),
                    json!({"version": c.version(), "friendlyName": c.friendly_name()}),
                )
            })
            .collect();
        let mut data = EventData::new();
        data.insert("version".to_string(), json!(HUB_VERSION));
        data.insert("extensions".to_string(), Value::Object(extensions));

        let version = self.current_sequence();
        match self
            .states
            .set(EVENT_HUB_STATE_OWNER, SharedStateKind::Standard, version, data)
        {
            Ok(()) => self.notify_state_change(EVENT_HUB_STATE_OWNER, SharedStateKind::Standard),
            Err(e) => tracing::warn!(error = %e, "hub shared state not published"),
        }
    }
}

/// Router loop: one consumer, so every container sees the same order
async fn route(
    mut queue: mpsc::UnboundedReceiver<Arc<Event>>,
    containers: Containers,
    responses: Arc<PendingResponses>,
) {
    while let Some(event) = queue.recv().await {
        route_one(&event, &containers, &responses);
    }
    tracing::debug!("router stopped");
}

fn route_one(event: &Arc<Event>, containers: &Containers, responses: &PendingResponses) {
    let span = tracing::debug_span!("hub.dispatch", sequence = event.sequence());
    let _guard = span.enter();

    if event.response_to_id().is_some() {
        responses.complete(event);
    }
    let targets: Vec<Arc<Container>> = containers
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .clone();
    for container in &targets {
        container.deliver(event);
    }
}

#[cfg(test)]
#[path = "hub_tests.rs"]
mod tests;
