//! Rule ordering and the once-per-chain guard

use crate::prelude::*;
use serde_json::json;
use std::time::Duration;
use sy_core::{event_source, event_type, Event};
use sy_rules::{Condition, EngineOptions, EventTokens, MatcherOp, Rule, RulesEngine};
use sy_hub::TRIGGERED_CONSEQUENCE_KEY;

fn tier_is(tier: &str) -> Condition {
    Condition::matcher("tier", MatcherOp::Eq, vec![json!(tier)])
}

#[test]
fn added_rules_follow_replaced_rules() {
    let engine = RulesEngine::new(EngineOptions::default());
    engine.replace_rules(vec![
        Rule::new(tier_is("bronze"), vec![]).with_id("A"),
        Rule::new(tier_is("gold"), vec![]).with_id("B"),
    ]);
    engine.add_rules(vec![Rule::new(tier_is("gold"), vec![]).with_id("C")]);

    let event = Event::builder("login", X, Y).entry("tier", "gold").build();
    let matched: Vec<String> = engine
        .evaluate(&event, &EventTokens::new(&event))
        .iter()
        .map(|r| r.id.clone())
        .collect();

    assert_eq!(matched, vec!["B", "C"]);
}

#[test]
fn re_evaluable_rules_match_every_pass() {
    let engine = RulesEngine::new(EngineOptions::default());
    engine.replace_rules(vec![Rule::new(tier_is("gold"), vec![]).with_id("again")]);
    let event = Event::builder("login", X, Y).entry("tier", "gold").build();

    for _ in 0..3 {
        assert_eq!(engine.evaluate(&event, &EventTokens::new(&event)).len(), 1);
    }
}

/// The rule also matches its own consequence events
fn self_triggering_rules(re_evaluable: bool) -> String {
    json!({"version": 1, "rules": [{
        "id": "echo",
        "reEvaluable": re_evaluable,
        "condition": {"type": "matcher", "definition": {
            "key": "~type", "matcher": "eq", "values": [X, event_type::RULES_ENGINE]
        }},
        "consequences": [{"id": "c", "type": "add", "detail": {}}]
    }]})
    .to_string()
}

#[tokio::test]
async fn once_per_chain_rule_ignores_its_own_consequences() {
    let hub = hub().await;
    let (watcher, mut consequences) = recorder(
        "com.acme.watcher",
        event_type::RULES_ENGINE,
        event_source::RESPONSE_CONTENT,
    );
    hub.register_extension(watcher).await.unwrap();
    hub.load_rules(&self_triggering_rules(false)).unwrap();

    let trigger = Event::builder("start", X, Y).build();
    let root = trigger.unique_id().to_string();
    hub.dispatch(trigger).unwrap();

    let first = next(&mut consequences).await;
    assert_eq!(first.chain_root(), root);
    assert_eq!(first.data()[TRIGGERED_CONSEQUENCE_KEY]["id"], json!("c"));

    let more = tokio::time::timeout(Duration::from_millis(200), consequences.recv()).await;
    assert!(more.is_err(), "rule fired again for its own consequence");
}

#[tokio::test]
async fn re_evaluable_rule_fires_on_its_own_consequences() {
    let hub = hub().await;
    let (watcher, mut consequences) = recorder(
        "com.acme.watcher",
        event_type::RULES_ENGINE,
        event_source::RESPONSE_CONTENT,
    );
    hub.register_extension(watcher).await.unwrap();
    hub.load_rules(&self_triggering_rules(true)).unwrap();

    hub.dispatch(Event::builder("start", X, Y).build()).unwrap();

    for _ in 0..3 {
        next(&mut consequences).await;
    }
    hub.shutdown().await;
}
