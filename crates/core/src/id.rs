// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Unique ids stamped on events when they are built

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Source of event unique ids
pub trait IdGen: Send + Sync {
    fn next(&self) -> String;
}

/// Random v4 UUIDs
#[derive(Clone, Copy, Debug, Default)]
pub struct UuidIdGen;

impl IdGen for UuidIdGen {
    fn next(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// `<prefix>-<n>` ids starting at 1.
///
/// Clones draw from one counter, so every builder in a test shares a
/// single sequence.
#[derive(Clone, Debug)]
pub struct SequentialIdGen {
    prefix: Arc<str>,
    issued: Arc<AtomicU64>,
}

impl SequentialIdGen {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: Arc::from(prefix),
            issued: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Number of ids handed out so far
    pub fn issued(&self) -> u64 {
        self.issued.load(Ordering::SeqCst)
    }
}

impl Default for SequentialIdGen {
    fn default() -> Self {
        Self::new("evt")
    }
}

impl IdGen for SequentialIdGen {
    fn next(&self) -> String {
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{}-{n}", self.prefix)
    }
}
