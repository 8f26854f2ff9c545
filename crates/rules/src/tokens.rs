// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Token resolution against an event
//!
//! Keys starting with `~` name special tokens; anything else is a dotted
//! path into the event's data.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;
use sy_core::{flatten, Event, EventData, HistoryRequest, HistorySearch};

/// Source of values for condition keys and template tokens
pub trait TokenResolver {
    fn resolve(&self, key: &str) -> Option<Value>;

    /// Count history matches, `None` when history is unavailable
    fn historical(&self, _requests: &[HistoryRequest], _search: HistorySearch) -> Option<u64> {
        None
    }
}

/// Reads another component's last published state as seen by `event`
pub trait StateReader {
    fn state(&self, owner: &str, event: &Event) -> Option<Arc<EventData>>;
}

/// Counts history matches for historical conditions
pub trait HistoryReader {
    fn count(&self, requests: &[HistoryRequest], search: HistorySearch) -> Option<u64>;
}

/// [`TokenResolver`] over one event plus optional state and history access
pub struct EventTokens<'a> {
    event: &'a Event,
    state: Option<&'a dyn StateReader>,
    history: Option<&'a dyn HistoryReader>,
    sdk_version: &'a str,
}

impl<'a> EventTokens<'a> {
    pub fn new(event: &'a Event) -> Self {
        Self {
            event,
            state: None,
            history: None,
            sdk_version: "",
        }
    }

    pub fn with_state(mut self, state: &'a dyn StateReader) -> Self {
        self.state = Some(state);
        self
    }

    pub fn with_history(mut self, history: &'a dyn HistoryReader) -> Self {
        self.history = Some(history);
        self
    }

    pub fn with_sdk_version(mut self, version: &'a str) -> Self {
        self.sdk_version = version;
        self
    }

    fn timestamp(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.event.timestamp_ms())
    }

    /// `~state.<owner>/<key.path>`; without a path the whole state is returned
    fn shared_state(&self, reference: &str) -> Option<Value> {
        let (owner, path) = match reference.split_once('/') {
            Some((owner, path)) => (owner, Some(path)),
            None => (reference, None),
        };
        let state = self.state?.state(owner, self.event)?;
        match path {
            Some(path) => sy_core::value_at(&state, path).cloned(),
            None => Some(Value::Object(EventData::clone(&state))),
        }
    }
}

impl TokenResolver for EventTokens<'_> {
    fn resolve(&self, key: &str) -> Option<Value> {
        let Some(token) = key.strip_prefix('~') else {
            return self.event.value_at(key).cloned();
        };
        match token {
            "type" => Some(Value::from(self.event.event_type())),
            "source" => Some(Value::from(self.event.source())),
            "id" => Some(Value::from(self.event.unique_id())),
            "timestampu" => Some(Value::from(self.event.timestamp_ms().div_euclid(1000))),
            "timestampz" => self
                .timestamp()
                .map(|t| Value::from(t.format("%Y-%m-%dT%H:%M:%SZ").to_string())),
            "timestampp" => self
                .timestamp()
                .map(|t| Value::from(t.format("%Y-%m-%dT%H:%M:%S%:z").to_string())),
            "sdkver" => Some(Value::from(self.sdk_version)),
            "cachebust" => Some(Value::from(
                (uuid::Uuid::new_v4().as_u128() % 100_000_000) as u64,
            )),
            "all_url" => Some(Value::from(query_string(self.event.data()))),
            "all_json" => serde_json::to_string(self.event.data())
                .ok()
                .map(Value::from),
            other => other
                .strip_prefix("state.")
                .and_then(|reference| self.shared_state(reference)),
        }
    }

    fn historical(&self, requests: &[HistoryRequest], search: HistorySearch) -> Option<u64> {
        self.history?.count(requests, search)
    }
}

/// Plain-text rendering used for string matchers and template output
pub(crate) fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// Flattened data as `key=value` pairs joined with `&`, url-encoded
fn query_string(data: &EventData) -> String {
    flatten(data)
        .iter()
        .map(|(key, value)| {
            format!(
                "{}={}",
                urlencoding::encode(key),
                urlencoding::encode(&value_text(value))
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

#[cfg(test)]
#[path = "tokens_tests.rs"]
mod tests;
