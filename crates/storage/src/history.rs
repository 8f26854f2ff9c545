// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event history: append-only fingerprint log with range queries
//!
//! Records are `(fingerprint, timestamp_ms)` pairs. Identical pairs are
//! counted rather than stored twice, so the index stays compact when bursts
//! of the same event land in one millisecond.

use std::collections::BTreeMap;
use std::io;
use std::sync::Mutex;
use sy_core::{Clock, SystemClock};
use thiserror::Error;

/// Errors from history persistence
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid range: from {from} is after to {to}")]
    InvalidRange { from: i64, to: i64 },
}

/// Aggregate result of a range query
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HistorySummary {
    pub count: u64,
    pub oldest_ms: Option<i64>,
    pub newest_ms: Option<i64>,
}

/// Append-only store of event fingerprints
pub trait EventHistoryStore: Send + Sync {
    /// Record `fingerprint` at the current time
    fn insert(&self, fingerprint: u64) -> Result<(), HistoryError>;

    /// Count records for `fingerprint` with `from_ms <= timestamp <= to_ms`
    fn select(&self, fingerprint: u64, from_ms: i64, to_ms: i64)
        -> Result<HistorySummary, HistoryError>;

    /// Delete records in the same range, returning how many were removed
    fn delete(&self, fingerprint: u64, from_ms: i64, to_ms: i64) -> Result<u64, HistoryError>;
}

/// In-memory ordered index shared by the history implementations
#[derive(Debug, Default, Clone)]
pub(crate) struct HistoryIndex {
    rows: BTreeMap<(u64, i64), u64>,
}

impl HistoryIndex {
    pub(crate) fn insert(&mut self, fingerprint: u64, timestamp_ms: i64) {
        *self.rows.entry((fingerprint, timestamp_ms)).or_insert(0) += 1;
    }

    pub(crate) fn select(&self, fingerprint: u64, from_ms: i64, to_ms: i64) -> HistorySummary {
        let mut summary = HistorySummary::default();
        for (&(_, ts), &count) in self.rows.range((fingerprint, from_ms)..=(fingerprint, to_ms)) {
            summary.count += count;
            if summary.oldest_ms.is_none() {
                summary.oldest_ms = Some(ts);
            }
            summary.newest_ms = Some(ts);
        }
        summary
    }

    pub(crate) fn delete(&mut self, fingerprint: u64, from_ms: i64, to_ms: i64) -> u64 {
        let keys: Vec<(u64, i64)> = self
            .rows
            .range((fingerprint, from_ms)..=(fingerprint, to_ms))
            .map(|(key, _)| *key)
            .collect();
        keys.iter()
            .filter_map(|key| self.rows.remove(key))
            .sum()
    }

    pub(crate) fn rows(&self) -> impl Iterator<Item = (u64, i64, u64)> + '_ {
        self.rows.iter().map(|(&(fp, ts), &count)| (fp, ts, count))
    }

    pub(crate) fn len(&self) -> u64 {
        self.rows.values().sum()
    }
}

pub(crate) fn check_range(from_ms: i64, to_ms: i64) -> Result<(), HistoryError> {
    if from_ms > to_ms {
        return Err(HistoryError::InvalidRange {
            from: from_ms,
            to: to_ms,
        });
    }
    Ok(())
}

/// Volatile history store
pub struct MemoryEventHistory<C: Clock = SystemClock> {
    clock: C,
    index: Mutex<HistoryIndex>,
}

impl MemoryEventHistory<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for MemoryEventHistory<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> MemoryEventHistory<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            index: Mutex::new(HistoryIndex::default()),
        }
    }

    /// Total number of records held
    pub fn len(&self) -> u64 {
        self.index.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<C: Clock> EventHistoryStore for MemoryEventHistory<C> {
    fn insert(&self, fingerprint: u64) -> Result<(), HistoryError> {
        let now = self.clock.now_ms();
        self.index
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(fingerprint, now);
        Ok(())
    }

    fn select(
        &self,
        fingerprint: u64,
        from_ms: i64,
        to_ms: i64,
    ) -> Result<HistorySummary, HistoryError> {
        check_range(from_ms, to_ms)?;
        Ok(self
            .index
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .select(fingerprint, from_ms, to_ms))
    }

    fn delete(&self, fingerprint: u64, from_ms: i64, to_ms: i64) -> Result<u64, HistoryError> {
        check_range(from_ms, to_ms)?;
        Ok(self
            .index
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .delete(fingerprint, from_ms, to_ms))
    }
}

#[cfg(test)]
#[path = "history_tests.rs"]
mod tests;
