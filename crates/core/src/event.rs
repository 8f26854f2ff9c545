// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event model shared by every component
//!
//! Events are immutable once built. The hub stamps a sequence number on
//! dispatch and from then on shares the event behind an `Arc`.

use crate::clock::{Clock, SystemClock};
use crate::id::{IdGen, UuidIdGen};
use crate::names::{event_source, event_type};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Ordered string-keyed payload carried by an event
pub type EventData = serde_json::Map<String, Value>;

/// An immutable, sequenced message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    name: String,
    #[serde(rename = "type")]
    event_type: String,
    source: String,
    #[serde(default)]
    data: EventData,
    timestamp_ms: i64,
    unique_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    response_to_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    mask: Option<Vec<String>>,
    /// Zero until the hub sequences the event
    #[serde(default)]
    sequence: u64,
}

impl Event {
    /// Start building an event
    pub fn builder(
        name: impl Into<String>,
        event_type: impl Into<String>,
        source: impl Into<String>,
    ) -> EventBuilder {
        EventBuilder {
            name: name.into(),
            event_type: event_type.into(),
            source: source.into(),
            data: EventData::new(),
            response_to_id: None,
            parent_id: None,
            mask: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn data(&self) -> &EventData {
        &self.data
    }

    pub fn timestamp_ms(&self) -> i64 {
        self.timestamp_ms
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn response_to_id(&self) -> Option<&str> {
        self.response_to_id.as_deref()
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.parent_id.as_deref()
    }

    pub fn mask(&self) -> Option<&[String]> {
        self.mask.as_deref()
    }

    /// Sequence number assigned by the hub, 0 if not yet dispatched
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Identity of the causal chain this event belongs to.
    ///
    /// Derived events carry the root of their chain in `parent_id`, so every
    /// event in one chain reports the same identity.
    pub fn chain_root(&self) -> &str {
        self.parent_id.as_deref().unwrap_or(&self.unique_id)
    }

    /// Stamp the hub-assigned sequence number
    pub fn sequenced(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }

    /// Look up a value by dotted key path (`"a.b.c"`)
    pub fn value_at(&self, path: &str) -> Option<&Value> {
        value_at(&self.data, path)
    }

    /// Check whether a listener registered for `(event_type, source)` receives this event
    pub fn matches(&self, event_type: &str, source: &str) -> bool {
        let type_ok = event_type == event_type::WILDCARD || event_type == self.event_type;
        let source_ok = source == event_source::WILDCARD || source == self.source;
        type_ok && source_ok
    }
}

/// Builder for [`Event`]
#[derive(Debug, Clone)]
pub struct EventBuilder {
    name: String,
    event_type: String,
    source: String,
    data: EventData,
    response_to_id: Option<String>,
    parent_id: Option<String>,
    mask: Option<Vec<String>>,
}

impl EventBuilder {
    pub fn data(mut self, data: EventData) -> Self {
        self.data = data;
        self
    }

    /// Insert a single data entry
    pub fn entry(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Restrict the history fingerprint to these key paths
    pub fn mask<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.mask = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    /// Mark this event as the response to `request`
    pub fn response_to(mut self, request: &Event) -> Self {
        self.response_to_id = Some(request.unique_id.clone());
        self
    }

    /// Mark this event as derived from `trigger`, inheriting its chain root
    pub fn chained_from(mut self, trigger: &Event) -> Self {
        self.parent_id = Some(trigger.chain_root().to_string());
        self
    }

    pub fn build(self) -> Event {
        self.build_with(&SystemClock, &UuidIdGen)
    }

    /// Build with explicit time and id sources
    pub fn build_with(self, clock: &impl Clock, id_gen: &impl IdGen) -> Event {
        Event {
            name: self.name,
            event_type: self.event_type,
            source: self.source,
            data: self.data,
            timestamp_ms: clock.now_ms(),
            unique_id: id_gen.next(),
            response_to_id: self.response_to_id,
            parent_id: self.parent_id,
            mask: self.mask,
            sequence: 0,
        }
    }
}

/// Look up a value in `data` by dotted key path
pub fn value_at<'a>(data: &'a EventData, path: &str) -> Option<&'a Value> {
    if let Some(value) = data.get(path) {
        return Some(value);
    }
    let mut parts = path.split('.');
    let mut current = data.get(parts.next()?)?;
    for part in parts {
        current = match current {
            Value::Object(map) => map.get(part)?,
            Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Flatten nested maps into dotted key paths, sorted by key.
///
/// Lists are kept as leaf values.
pub fn flatten(data: &EventData) -> BTreeMap<String, Value> {
    let mut out = BTreeMap::new();
    flatten_into("", data, &mut out);
    out
}

fn flatten_into(prefix: &str, data: &EventData, out: &mut BTreeMap<String, Value>) {
    for (key, value) in data {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        match value {
            Value::Object(nested) => flatten_into(&path, nested, out),
            other => {
                out.insert(path, other.clone());
            }
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
