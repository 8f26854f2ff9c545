// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake extension for hub tests

use crate::extension::{Extension, ExtensionApi, ExtensionError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use sy_core::Event;
use tokio::sync::mpsc;

type Setup = Box<dyn Fn(&ExtensionApi) -> Result<(), ExtensionError> + Send + Sync>;

/// Extension whose registration hook is supplied by the test
pub(crate) struct FakeExtension {
    name: String,
    setup: Setup,
    api: Mutex<Option<ExtensionApi>>,
    unregistered: AtomicBool,
}

impl FakeExtension {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            setup: Box::new(|_| Ok(())),
            api: Mutex::new(None),
            unregistered: AtomicBool::new(false),
        }
    }

    pub(crate) fn with_setup<F>(mut self, setup: F) -> Self
    where
        F: Fn(&ExtensionApi) -> Result<(), ExtensionError> + Send + Sync + 'static,
    {
        self.setup = Box::new(setup);
        self
    }

    /// Api captured during registration
    pub(crate) fn api(&self) -> ExtensionApi {
        self.api
            .lock()
            .unwrap()
            .clone()
            .expect("extension was never registered")
    }

    pub(crate) fn was_unregistered(&self) -> bool {
        self.unregistered.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Extension for FakeExtension {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &str {
        "0.0.1"
    }

    fn friendly_name(&self) -> &str {
        "Fake"
    }

    async fn on_registered(&self, api: &ExtensionApi) -> Result<(), ExtensionError> {
        *self.api.lock().unwrap() = Some(api.clone());
        (self.setup)(api)
    }

    async fn on_unregistered(&self, _api: &ExtensionApi) {
        self.unregistered.store(true, Ordering::SeqCst);
    }
}

/// Extension forwarding every `(event_type, source)` event to the receiver
pub(crate) fn recording(
    name: &str,
    event_type: &'static str,
    source: &'static str,
) -> (Arc<FakeExtension>, mpsc::UnboundedReceiver<Arc<Event>>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let ext = FakeExtension::new(name).with_setup(move |api| {
        let tx = tx.clone();
        api.register_listener(event_type, source, move |event| {
            let _ = tx.send(Arc::new(event.clone()));
        })?;
        Ok(())
    });
    (Arc::new(ext), rx)
}

/// Next received event, failing the test after five seconds
pub(crate) async fn next(rx: &mut mpsc::UnboundedReceiver<Arc<Event>>) -> Arc<Event> {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for an event")
        .expect("listener channel closed")
}
