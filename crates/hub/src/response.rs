// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request/response correlation
//!
//! A request registers under its unique id before it is dispatched. The
//! first of "response arrived" and "deadline passed" to claim the
//! registration delivers; the other side finds it claimed and does nothing.

use crate::error::HubError;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::task::{Context, Poll};
use std::time::Duration;
use sy_core::Event;
use tokio::sync::oneshot;
use tokio::task::AbortHandle;

type Outcome = Result<Arc<Event>, HubError>;

struct Pending {
    claimed: AtomicBool,
    completion: Mutex<Option<oneshot::Sender<Outcome>>>,
    timer: Mutex<Option<AbortHandle>>,
}

impl Pending {
    /// Single winner: only the first caller gets the sender
    fn claim(&self) -> Option<oneshot::Sender<Outcome>> {
        self.claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        self.completion
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
    }

    fn stop_timer(&self) {
        if let Some(timer) = self.timer.lock().unwrap_or_else(|e| e.into_inner()).take() {
            timer.abort();
        }
    }
}

/// Outstanding requests keyed by request id
#[derive(Default)]
pub(crate) struct PendingResponses {
    pending: Mutex<HashMap<String, Arc<Pending>>>,
}

impl PendingResponses {
    /// Register `request_id` and arm its deadline
    pub(crate) fn register(
        self: &Arc<Self>,
        request_id: &str,
        timeout: Duration,
    ) -> ResponseFuture {
        let (tx, rx) = oneshot::channel();
        let pending = Arc::new(Pending {
            claimed: AtomicBool::new(false),
            completion: Mutex::new(Some(tx)),
            timer: Mutex::new(None),
        });
        self.lock().insert(request_id.to_string(), Arc::clone(&pending));

        let registry: Weak<Self> = Arc::downgrade(self);
        let expiring = Arc::clone(&pending);
        let id = request_id.to_string();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if let Some(completion) = expiring.claim() {
                if let Some(registry) = registry.upgrade() {
                    registry.lock().remove(&id);
                }
                tracing::warn!(
                    request = %id,
                    timeout_ms = timeout.as_millis() as u64,
                    "response timed out"
                );
                let _ = completion.send(Err(HubError::Timeout(timeout)));
            }
        });
        *pending.timer.lock().unwrap_or_else(|e| e.into_inner()) = Some(timer.abort_handle());

        ResponseFuture { rx }
    }

    /// Drop a registration whose request never got dispatched
    pub(crate) fn cancel(&self, request_id: &str) {
        if let Some(pending) = self.lock().remove(request_id) {
            drop(pending.claim());
            pending.stop_timer();
        }
    }

    /// Deliver `response` to the request it answers. Returns true if a
    /// waiting caller received it.
    pub(crate) fn complete(&self, response: &Arc<Event>) -> bool {
        let Some(request_id) = response.response_to_id() else {
            return false;
        };
        let Some(pending) = self.lock().remove(request_id) else {
            return false;
        };
        let Some(completion) = pending.claim() else {
            return false;
        };
        pending.stop_timer();
        tracing::debug!(
            request = request_id,
            response = response.unique_id(),
            "response delivered"
        );
        completion.send(Ok(Arc::clone(response))).is_ok()
    }

    /// Fail every outstanding request with [`HubError::Shutdown`]
    pub(crate) fn fail_all(&self) {
        let drained: Vec<Arc<Pending>> = self.lock().drain().map(|(_, p)| p).collect();
        for pending in drained {
            if let Some(completion) = pending.claim() {
                pending.stop_timer();
                let _ = completion.send(Err(HubError::Shutdown));
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<Pending>>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Resolves exactly once with the response event or an error
#[must_use = "a response future does nothing unless awaited"]
pub struct ResponseFuture {
    rx: oneshot::Receiver<Outcome>,
}

impl Future for ResponseFuture {
    type Output = Outcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(HubError::Shutdown)))
    }
}

#[cfg(test)]
#[path = "response_tests.rs"]
mod tests;
