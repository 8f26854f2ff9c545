// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deterministic event fingerprints for the history store
//!
//! A fingerprint covers the event type, source and the masked data. Nested
//! maps are flattened and sorted, so two payloads that differ only in field
//! order hash the same.

use crate::event::{flatten, Event, EventData};
use serde_json::Value;
use sha2::{Digest, Sha256};

impl Event {
    /// Fingerprint of this event for history records
    pub fn fingerprint(&self) -> u64 {
        fingerprint(self.event_type(), self.source(), self.data(), self.mask())
    }
}

/// Compute a fingerprint from its parts.
///
/// `mask` entries are dotted key paths; a path selects the key itself and
/// everything nested below it. `None` selects the whole payload.
pub fn fingerprint(event_type: &str, source: &str, data: &EventData, mask: Option<&[String]>) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(b"~type=");
    hasher.update(event_type.as_bytes());
    hasher.update(b";~source=");
    hasher.update(source.as_bytes());
    hasher.update(b";");

    for (key, value) in flatten(data) {
        if let Some(mask) = mask {
            if !mask.iter().any(|m| selects(m, &key)) {
                continue;
            }
        }
        hasher.update(key.as_bytes());
        hasher.update(b"=");
        hasher.update(canonical(&value).as_bytes());
        hasher.update(b";");
    }

    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(bytes)
}

fn selects(mask: &str, key: &str) -> bool {
    key == mask
        || key
            .strip_prefix(mask)
            .is_some_and(|rest| rest.starts_with('.'))
}

/// Render a value with object keys sorted at every depth
fn canonical(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let inner: Vec<String> = keys
                .into_iter()
                .map(|k| format!("{:?}:{}", k, canonical(&map[k])))
                .collect();
            format!("{{{}}}", inner.join(","))
        }
        Value::Array(items) => {
            let inner: Vec<String> = items.iter().map(canonical).collect();
            format!("[{}]", inner.join(","))
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
#[path = "fingerprint_tests.rs"]
mod tests;
