// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Extension capability interface
//!
//! Extensions implement [`Extension`] and talk to the hub only through the
//! [`ExtensionApi`] handed to their hooks. The api is cheap to clone and can
//! be captured by listeners.

use crate::error::HubError;
use crate::hub::{EventHub, HubInner};
use crate::listener::{async_handler, sync_handler, ListenerTable};
use crate::response::ResponseFuture;
use async_trait::async_trait;
use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::Duration;
use sy_core::{
    Event, EventData, HistoryRequest, HistorySearch, SharedStateKind, SharedStateResolution,
    SharedStateResult,
};
use sy_rules::{HistoryReader, StateReader};
use sy_storage::HistorySummary;

/// Error type returned by extension hooks
pub type ExtensionError = Box<dyn std::error::Error + Send + Sync>;

/// A component registered with the hub
#[async_trait]
pub trait Extension: Send + Sync + 'static {
    /// Unique name, also the owner name of its shared state
    fn name(&self) -> &str;

    fn version(&self) -> &str;

    fn friendly_name(&self) -> &str {
        self.name()
    }

    /// Runs on the extension's own context before it sees any event.
    ///
    /// An error aborts the registration.
    async fn on_registered(&self, api: &ExtensionApi) -> Result<(), ExtensionError>;

    async fn on_unregistered(&self, _api: &ExtensionApi) {}
}

/// The hub as seen by one extension
#[derive(Clone)]
pub struct ExtensionApi {
    name: Arc<str>,
    hub: Weak<HubInner>,
    listeners: Arc<ListenerTable>,
}

impl ExtensionApi {
    pub(crate) fn new(name: &str, hub: Weak<HubInner>, listeners: Arc<ListenerTable>) -> Self {
        Self {
            name: Arc::from(name),
            hub,
            listeners,
        }
    }

    /// Name of the extension this api belongs to
    pub fn name(&self) -> &str {
        &self.name
    }

    fn hub(&self) -> Result<Arc<HubInner>, HubError> {
        self.hub.upgrade().ok_or(HubError::Shutdown)
    }

    /// Listen for events of `event_type` from `source`; either may be the wildcard
    pub fn register_listener<F>(
        &self,
        event_type: &str,
        source: &str,
        f: F,
    ) -> Result<(), HubError>
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        check_pair(event_type, source)?;
        self.listeners.register(event_type, source, sync_handler(f));
        Ok(())
    }

    /// Like [`register_listener`](Self::register_listener) for async handlers.
    ///
    /// The container awaits each handler before running the next one.
    pub fn register_async_listener<F, Fut>(
        &self,
        event_type: &str,
        source: &str,
        f: F,
    ) -> Result<(), HubError>
    where
        F: Fn(Arc<Event>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        check_pair(event_type, source)?;
        self.listeners.register(event_type, source, async_handler(f));
        Ok(())
    }

    pub fn dispatch(&self, event: Event) -> Result<u64, HubError> {
        self.hub()?.dispatch(event)
    }

    pub fn dispatch_with_response(
        &self,
        event: Event,
        timeout: Duration,
    ) -> Result<ResponseFuture, HubError> {
        self.hub()?.dispatch_with_response(event, timeout)
    }

    /// Publish state at `event`'s sequence number, or the current one
    pub fn create_shared_state(
        &self,
        data: EventData,
        event: Option<&Event>,
    ) -> Result<(), HubError> {
        self.hub()?
            .set_shared_state(&self.name, SharedStateKind::Standard, data, event)
    }

    pub fn create_xdm_shared_state(
        &self,
        data: EventData,
        event: Option<&Event>,
    ) -> Result<(), HubError> {
        self.hub()?
            .set_shared_state(&self.name, SharedStateKind::Xdm, data, event)
    }

    /// Reserve a version now and publish its data later
    pub fn create_pending_shared_state(
        &self,
        event: Option<&Event>,
    ) -> Result<SharedStateResolver, HubError> {
        self.pending(SharedStateKind::Standard, event)
    }

    pub fn create_pending_xdm_shared_state(
        &self,
        event: Option<&Event>,
    ) -> Result<SharedStateResolver, HubError> {
        self.pending(SharedStateKind::Xdm, event)
    }

    fn pending(
        &self,
        kind: SharedStateKind,
        event: Option<&Event>,
    ) -> Result<SharedStateResolver, HubError> {
        let hub = self.hub()?;
        let version = hub.reserve_shared_state(&self.name, kind, event)?;
        Ok(SharedStateResolver {
            owner: self.name.to_string(),
            kind,
            version,
            hub: self.hub.clone(),
        })
    }

    /// Read `extension`'s state as seen by `event` (latest when `None`).
    ///
    /// `Ok(None)` means the extension never published state.
    pub fn get_shared_state(
        &self,
        extension: &str,
        event: Option<&Event>,
        resolution: SharedStateResolution,
    ) -> Result<Option<SharedStateResult>, HubError> {
        self.read(extension, SharedStateKind::Standard, event, resolution)
    }

    pub fn get_xdm_shared_state(
        &self,
        extension: &str,
        event: Option<&Event>,
        resolution: SharedStateResolution,
    ) -> Result<Option<SharedStateResult>, HubError> {
        self.read(extension, SharedStateKind::Xdm, event, resolution)
    }

    fn read(
        &self,
        extension: &str,
        kind: SharedStateKind,
        event: Option<&Event>,
        resolution: SharedStateResolution,
    ) -> Result<Option<SharedStateResult>, HubError> {
        if extension.is_empty() {
            return Err(HubError::NullArgument("extension name"));
        }
        Ok(self.hub()?.get_shared_state(extension, kind, event, resolution))
    }

    /// Count history matches per request; see [`EventHub::get_historical_events`]
    pub fn get_historical_events(
        &self,
        requests: &[HistoryRequest],
        enforce_order: bool,
    ) -> Result<Vec<HistorySummary>, HubError> {
        self.hub()?.historical_events(requests, enforce_order)
    }

    /// Ask the hub to unregister this extension.
    ///
    /// Runs in the background: `on_unregistered` executes on this
    /// extension's context once the current listener returns.
    pub fn unregister(&self) {
        let Ok(hub) = self.hub() else {
            return;
        };
        let hub = EventHub::from_inner(hub);
        let name = self.name.to_string();
        tokio::spawn(async move {
            if let Err(e) = hub.unregister_extension(&name).await {
                tracing::warn!(extension = %name, error = %e, "unregister failed");
            }
        });
    }
}

fn check_pair(event_type: &str, source: &str) -> Result<(), HubError> {
    if event_type.is_empty() {
        return Err(HubError::NullArgument("event type"));
    }
    if source.is_empty() {
        return Err(HubError::NullArgument("event source"));
    }
    Ok(())
}

impl StateReader for ExtensionApi {
    fn state(&self, owner: &str, event: &Event) -> Option<Arc<EventData>> {
        self.get_shared_state(owner, Some(event), SharedStateResolution::LastSet)
            .ok()
            .flatten()
            .and_then(|result| result.value)
    }
}

impl HistoryReader for ExtensionApi {
    fn count(&self, requests: &[HistoryRequest], search: HistorySearch) -> Option<u64> {
        let enforce_order = search == HistorySearch::Ordered;
        match self.get_historical_events(requests, enforce_order) {
            Ok(results) => Some(crate::history::combined_count(&results, search)),
            Err(e) => {
                tracing::warn!(error = %e, "history query failed");
                None
            }
        }
    }
}

/// Fills a pending shared-state version; consumed by [`resolve`](Self::resolve)
pub struct SharedStateResolver {
    owner: String,
    kind: SharedStateKind,
    version: u64,
    hub: Weak<HubInner>,
}

impl SharedStateResolver {
    /// Version this resolver fills
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Publish `data` at the reserved version
    pub fn resolve(self, data: EventData) -> Result<(), HubError> {
        let hub = self.hub.upgrade().ok_or(HubError::Shutdown)?;
        hub.resolve_shared_state(&self.owner, self.kind, self.version, data)
    }
}
