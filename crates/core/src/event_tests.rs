// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::clock::FakeClock;
use crate::id::SequentialIdGen;
use serde_json::json;

fn sample() -> Event {
    Event::builder("Track", "com.acme.analytics", "com.acme.request")
        .entry("action", "purchase")
        .entry("cart", json!({"total": 42, "items": ["a", "b"]}))
        .build_with(&FakeClock::at(1_000), &SequentialIdGen::new("e"))
}

#[test]
fn builder_populates_identity_and_time() {
    let event = sample();
    assert_eq!(event.name(), "Track");
    assert_eq!(event.unique_id(), "e-1");
    assert_eq!(event.timestamp_ms(), 1_000);
    assert_eq!(event.sequence(), 0);
    assert!(event.response_to_id().is_none());
}

#[test]
fn value_at_walks_nested_maps_and_lists() {
    let event = sample();
    assert_eq!(event.value_at("action"), Some(&json!("purchase")));
    assert_eq!(event.value_at("cart.total"), Some(&json!(42)));
    assert_eq!(event.value_at("cart.items.1"), Some(&json!("b")));
    assert_eq!(event.value_at("cart.missing"), None);
    assert_eq!(event.value_at("action.deeper"), None);
}

#[test]
fn value_at_prefers_literal_dotted_key() {
    let event = Event::builder("n", "t", "s")
        .entry("a.b", 1)
        .entry("a", json!({"b": 2}))
        .build();
    assert_eq!(event.value_at("a.b"), Some(&json!(1)));
}

#[test]
fn response_and_chain_links() {
    let ids = SequentialIdGen::new("e");
    let clock = FakeClock::at(0);
    let request = Event::builder("req", "t", "s").build_with(&clock, &ids);
    let response = Event::builder("resp", "t", "r")
        .response_to(&request)
        .build_with(&clock, &ids);
    assert_eq!(response.response_to_id(), Some("e-1"));

    let child = Event::builder("child", "t", "s")
        .chained_from(&request)
        .build_with(&clock, &ids);
    let grandchild = Event::builder("grandchild", "t", "s")
        .chained_from(&child)
        .build_with(&clock, &ids);
    assert_eq!(request.chain_root(), "e-1");
    assert_eq!(child.chain_root(), "e-1");
    assert_eq!(grandchild.chain_root(), "e-1");
}

#[test]
fn wildcard_matching() {
    let event = sample();
    assert!(event.matches("com.acme.analytics", "com.acme.request"));
    assert!(event.matches(event_type::WILDCARD, "com.acme.request"));
    assert!(event.matches("com.acme.analytics", event_source::WILDCARD));
    assert!(event.matches(event_type::WILDCARD, event_source::WILDCARD));
    assert!(!event.matches("com.acme.Analytics", "com.acme.request"));
    assert!(!event.matches("com.acme.analytics", "other"));
}

#[test]
fn flatten_produces_sorted_dotted_paths() {
    let event = sample();
    let flat = flatten(event.data());
    let keys: Vec<_> = flat.keys().cloned().collect();
    assert_eq!(keys, vec!["action", "cart.items", "cart.total"]);
}

#[test]
fn serde_roundtrip_keeps_sequence() {
    let event = sample().sequenced(7);
    let json = serde_json::to_string(&event).unwrap();
    let back: Event = serde_json::from_str(&json).unwrap();
    assert_eq!(back, event);
    assert_eq!(back.sequence(), 7);
}
