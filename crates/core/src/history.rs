// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queries against the event history

use crate::event::EventData;
use crate::fingerprint::fingerprint;
use serde::{Deserialize, Serialize};

/// One event shape to count within a time window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRequest {
    #[serde(rename = "type")]
    pub event_type: String,
    pub source: String,
    /// The data an event was masked down to when recorded
    #[serde(default)]
    pub data: EventData,
    #[serde(default)]
    pub from_ms: i64,
    #[serde(default = "HistoryRequest::open_end")]
    pub to_ms: i64,
}

impl HistoryRequest {
    pub fn new(event_type: impl Into<String>, source: impl Into<String>, data: EventData) -> Self {
        Self {
            event_type: event_type.into(),
            source: source.into(),
            data,
            from_ms: 0,
            to_ms: Self::open_end(),
        }
    }

    pub fn between(mut self, from_ms: i64, to_ms: i64) -> Self {
        self.from_ms = from_ms;
        self.to_ms = to_ms;
        self
    }

    fn open_end() -> i64 {
        i64::MAX
    }

    /// Fingerprint an event recorded with this shape would carry
    pub fn fingerprint(&self) -> u64 {
        fingerprint(&self.event_type, &self.source, &self.data, None)
    }
}

/// How several requests combine into one count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistorySearch {
    /// Sum of matches for every request
    #[default]
    Any,
    /// 1 if the requests occurred in order, else 0
    Ordered,
}
