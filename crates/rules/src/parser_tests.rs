// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

fn matcher(key: &str, op: &str, values: Value) -> Value {
    json!({"type": "matcher", "definition": {"key": key, "matcher": op, "values": values}})
}

fn document(rules: Value) -> String {
    json!({"version": 1, "rules": rules}).to_string()
}

#[test]
fn parses_group_of_matchers() {
    let json = document(json!([{
        "id": "launch",
        "condition": {"type": "group", "definition": {"logic": "and", "conditions": [
            matcher("~type", "eq", json!(["com.acme.lifecycle"])),
            matcher("launches", "ge", json!([1])),
        ]}},
        "consequences": [{"id": "c1", "type": "add", "detail": {"eventdata": {"x": 1}}}],
    }]));

    let rules = parse_rules(&json).unwrap();

    assert_eq!(rules.len(), 1);
    let rule = &rules[0];
    assert_eq!(rule.id, "launch");
    assert!(rule.re_evaluable);
    assert_eq!(
        rule.condition,
        Condition::and(vec![
            Condition::matcher("~type", MatcherOp::Eq, vec![json!("com.acme.lifecycle")]),
            Condition::matcher("launches", MatcherOp::Ge, vec![json!(1)]),
        ])
    );
    assert_eq!(rule.consequences.len(), 1);
    assert_eq!(rule.consequences[0].kind, "add");
    assert_eq!(rule.consequences[0].detail["eventdata"], json!({"x": 1}));
}

#[test]
fn missing_ids_are_generated_and_unique() {
    let json = document(json!([
        {"condition": matcher("a", "ex", json!([]))},
        {"condition": matcher("b", "ex", json!([]))},
    ]));
    let rules = parse_rules(&json).unwrap();
    assert_eq!(rules.len(), 2);
    assert!(!rules[0].id.is_empty());
    assert_ne!(rules[0].id, rules[1].id);
}

#[test]
fn reads_re_evaluable_flag() {
    let json = document(json!([
        {"reEvaluable": false, "condition": matcher("a", "ex", json!([]))},
    ]));
    assert!(!parse_rules(&json).unwrap()[0].re_evaluable);
}

#[test]
fn parses_not_and_or() {
    let json = document(json!([{
        "condition": {"type": "group", "definition": {"logic": "not", "conditions": [
            {"type": "group", "definition": {"logic": "or", "conditions": [
                matcher("a", "eq", json!(["x"])),
            ]}},
        ]}},
    }]));
    let rules = parse_rules(&json).unwrap();
    assert_eq!(
        rules[0].condition,
        Condition::not(Condition::or(vec![Condition::matcher(
            "a",
            MatcherOp::Eq,
            vec![json!("x")]
        )]))
    );
}

#[test]
fn parses_historical_condition() {
    let json = document(json!([{
        "condition": {"type": "historical", "definition": {
            "events": [{"type": "com.acme.commerce", "source": "com.acme.request", "data": {"sku": "A-1"}}],
            "from": 100,
            "to": 200,
            "matcher": "ge",
            "value": 2,
            "searchType": "ordered",
        }},
    }]));
    let rules = parse_rules(&json).unwrap();
    let Condition::Historical(historical) = &rules[0].condition else {
        panic!("expected historical condition");
    };
    assert_eq!(historical.search, HistorySearch::Ordered);
    assert_eq!(historical.op, MatcherOp::Ge);
    assert_eq!(historical.value, 2);
    assert_eq!(historical.requests.len(), 1);
    assert_eq!(historical.requests[0].from_ms, 100);
    assert_eq!(historical.requests[0].to_ms, 200);
    assert_eq!(historical.requests[0].data["sku"], json!("A-1"));
}

#[test]
fn bad_rules_are_skipped() {
    let json = document(json!([
        {"condition": matcher("a", "zz", json!([1]))},
        {"condition": {"type": "group", "definition": {"logic": "not", "conditions": []}}},
        {"condition": {"type": "mystery", "definition": {}}},
        {"condition": matcher("a", "rx", json!(["(unclosed"]))},
        {"id": "good", "condition": matcher("a", "ex", json!([]))},
    ]));
    let rules = parse_rules(&json).unwrap();
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].id, "good");
}

#[test]
fn empty_groups_survive_parsing() {
    let json = document(json!([
        {"condition": {"type": "group", "definition": {"logic": "and", "conditions": []}}},
    ]));
    assert_eq!(parse_rules(&json).unwrap()[0].condition, Condition::and(vec![]));
}

#[test]
fn unreadable_document_fails() {
    assert!(matches!(parse_rules("{not json"), Err(RuleError::Parse(_))));
    assert!(matches!(parse_rules("{\"rules\": []}"), Err(RuleError::Parse(_))));
}

#[test]
fn unsupported_version_fails() {
    let json = json!({"version": 2, "rules": []}).to_string();
    assert!(matches!(parse_rules(&json), Err(RuleError::Version(2))));
}

#[test]
fn valid_regex_rules_are_kept() {
    let json = document(json!([
        {"id": "rx", "condition": matcher("page", "rx", json!(["^check", "out$"]))},
    ]));
    let rules = parse_rules(&json).unwrap();
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].condition.compile_patterns().ok(), Some(()));
}
