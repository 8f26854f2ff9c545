// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-container listener table

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use sy_core::Event;

/// Boxed future returned by listener handlers
pub type HandlerFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Listener callback; receives the sequenced event
pub type Handler = Arc<dyn Fn(Arc<Event>) -> HandlerFuture + Send + Sync>;

/// One `(type, source)` registration
#[derive(Clone)]
struct Listener {
    event_type: String,
    source: String,
    handler: Handler,
}

/// Ordered `(type, source, handler)` registrations of one container
#[derive(Default)]
pub(crate) struct ListenerTable {
    listeners: Mutex<Vec<Listener>>,
}

impl ListenerTable {
    pub(crate) fn register(&self, event_type: &str, source: &str, handler: Handler) {
        let mut listeners = self.listeners.lock().unwrap_or_else(|e| e.into_inner());
        listeners.push(Listener {
            event_type: event_type.to_string(),
            source: source.to_string(),
            handler,
        });
        tracing::debug!(event_type, source, count = listeners.len(), "listener registered");
    }

    /// Handlers whose registration matches `event`, in registration order.
    ///
    /// Cloned out so no lock is held while they run.
    pub(crate) fn matching(&self, event: &Event) -> Vec<Handler> {
        self.listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|l| event.matches(&l.event_type, &l.source))
            .map(|l| Arc::clone(&l.handler))
            .collect()
    }

    pub(crate) fn clear(&self) {
        self.listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}

/// Wrap a synchronous closure as a [`Handler`]; it runs when the future is polled
pub(crate) fn sync_handler<F>(f: F) -> Handler
where
    F: Fn(&Event) + Send + Sync + 'static,
{
    let f = Arc::new(f);
    Arc::new(move |event: Arc<Event>| {
        let f = Arc::clone(&f);
        Box::pin(async move { f(&event) }) as HandlerFuture
    })
}

/// Wrap an async closure as a [`Handler`]
pub(crate) fn async_handler<F, Fut>(f: F) -> Handler
where
    F: Fn(Arc<Event>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move |event: Arc<Event>| Box::pin(f(event)) as HandlerFuture)
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
