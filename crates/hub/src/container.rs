// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Extension containers
//!
//! Each registered extension gets one tokio task fed by an unbounded
//! channel. Hooks and listeners of one extension run strictly one after
//! another on that task; different extensions never wait on each other.

use crate::extension::{Extension, ExtensionApi};
use crate::listener::ListenerTable;
use std::sync::{Arc, Mutex};
use sy_core::Event;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::Instrument;

enum Command {
    Deliver(Arc<Event>),
    Unregister(oneshot::Sender<()>),
}

/// One registered extension and its execution context
pub(crate) struct Container {
    name: String,
    version: String,
    friendly_name: String,
    /// Lowest sequence number this container observes
    first_sequence: u64,
    commands: mpsc::UnboundedSender<Command>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Container {
    /// Start the container task. `registered` receives the outcome of
    /// `on_registered`; on failure the task exits without reading events.
    pub(crate) fn spawn(
        extension: Arc<dyn Extension>,
        api: ExtensionApi,
        listeners: Arc<ListenerTable>,
        first_sequence: u64,
        registered: oneshot::Sender<Result<(), String>>,
    ) -> Self {
        let (commands, rx) = mpsc::unbounded_channel();
        let name = extension.name().to_string();
        let version = extension.version().to_string();
        let friendly_name = extension.friendly_name().to_string();
        let task = tokio::spawn(run(extension, api, listeners, rx, registered));
        Self {
            name,
            version,
            friendly_name,
            first_sequence,
            commands,
            task: Mutex::new(Some(task)),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn version(&self) -> &str {
        &self.version
    }

    pub(crate) fn friendly_name(&self) -> &str {
        &self.friendly_name
    }

    /// Queue `event` unless it predates the registration
    pub(crate) fn deliver(&self, event: &Arc<Event>) {
        if event.sequence() < self.first_sequence {
            return;
        }
        if self.commands.send(Command::Deliver(Arc::clone(event))).is_err() {
            tracing::debug!(extension = %self.name, "container stopped, event dropped");
        }
    }

    /// Run `on_unregistered` after queued events and wait for the task to end
    pub(crate) async fn unregister(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.commands.send(Command::Unregister(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
        self.join().await;
    }

    /// Wait for the task to exit
    pub(crate) async fn join(&self) {
        let task = self.task.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::error!(extension = %self.name, error = %e, "container task failed");
            }
        }
    }
}

async fn run(
    extension: Arc<dyn Extension>,
    api: ExtensionApi,
    listeners: Arc<ListenerTable>,
    mut commands: mpsc::UnboundedReceiver<Command>,
    registered: oneshot::Sender<Result<(), String>>,
) {
    let name = api.name().to_string();
    if let Err(e) = extension.on_registered(&api).await {
        listeners.clear();
        let _ = registered.send(Err(e.to_string()));
        return;
    }
    let _ = registered.send(Ok(()));

    while let Some(command) = commands.recv().await {
        match command {
            Command::Deliver(event) => {
                let handlers = listeners.matching(&event);
                if handlers.is_empty() {
                    continue;
                }
                let span = tracing::debug_span!(
                    "container.event",
                    extension = %name,
                    sequence = event.sequence(),
                    handlers = handlers.len()
                );
                for handler in handlers {
                    // A panicking listener must not take the container down
                    let run = tokio::spawn(handler(Arc::clone(&event)).instrument(span.clone()));
                    if let Err(e) = run.await {
                        tracing::error!(extension = %name, error = %e, "listener failed");
                    }
                }
            }
            Command::Unregister(done) => {
                extension.on_unregistered(&api).await;
                let _ = done.send(());
                break;
            }
        }
    }

    // Listeners may hold clones of the api; dropping them breaks the cycle
    listeners.clear();
    tracing::debug!(extension = %name, "container stopped");
}

#[cfg(test)]
#[path = "container_tests.rs"]
mod tests;
