// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction for testable wall-clock time

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A clock that provides the current wall-clock time in epoch milliseconds
pub trait Clock: Clone + Send + Sync + 'static {
    fn now_ms(&self) -> i64;

    /// Current time as a UTC timestamp
    fn now_utc(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.now_ms()).unwrap_or_default()
    }
}

/// Real system clock
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Fake clock for testing with controllable time
#[derive(Clone, Debug)]
pub struct FakeClock {
    current: Arc<AtomicI64>,
}

impl FakeClock {
    /// Start the clock at the given epoch milliseconds
    pub fn at(epoch_ms: i64) -> Self {
        Self {
            current: Arc::new(AtomicI64::new(epoch_ms)),
        }
    }

    pub fn new() -> Self {
        Self::at(Utc::now().timestamp_millis())
    }

    /// Advance the clock by the given duration
    pub fn advance(&self, duration: Duration) {
        self.current
            .fetch_add(duration.as_millis() as i64, Ordering::SeqCst);
    }

    /// Set the clock to a specific epoch millisecond
    pub fn set(&self, epoch_ms: i64) {
        self.current.store(epoch_ms, Ordering::SeqCst);
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now_ms(&self) -> i64 {
        self.current.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
