// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rules document loading
//!
//! ```json
//! {"version": 1, "rules": [{
//!     "condition": {"type": "group", "definition": {"logic": "and", "conditions": [
//!         {"type": "matcher", "definition": {"key": "~type", "matcher": "eq", "values": ["..."]}}
//!     ]}},
//!     "consequences": [{"id": "c1", "type": "dispatch", "detail": {}}]
//! }]}
//! ```

use crate::condition::{Condition, HistoricalCondition, MatcherOp};
use crate::error::RuleError;
use crate::rule::{Consequence, Rule};
use serde::Deserialize;
use serde_json::Value;
use sy_core::{EventData, HistoryRequest, HistorySearch};

const SUPPORTED_VERSION: u64 = 1;

#[derive(Deserialize)]
struct RulesDocument {
    version: u64,
    #[serde(default)]
    rules: Vec<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRule {
    #[serde(default)]
    id: Option<String>,
    condition: RawCondition,
    #[serde(default)]
    consequences: Vec<Consequence>,
    #[serde(default = "default_re_evaluable")]
    re_evaluable: bool,
}

fn default_re_evaluable() -> bool {
    true
}

#[derive(Deserialize)]
#[serde(tag = "type", content = "definition", rename_all = "lowercase")]
enum RawCondition {
    Group(RawGroup),
    Matcher(RawMatcher),
    Historical(RawHistorical),
}

#[derive(Deserialize)]
#[serde(rename_all = "lowercase")]
enum Logic {
    And,
    Or,
    Not,
}

#[derive(Deserialize)]
struct RawGroup {
    logic: Logic,
    #[serde(default)]
    conditions: Vec<RawCondition>,
}

#[derive(Deserialize)]
struct RawMatcher {
    key: String,
    matcher: MatcherOp,
    #[serde(default)]
    values: Vec<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawHistorical {
    events: Vec<RawHistoryEvent>,
    #[serde(default)]
    from: Option<i64>,
    #[serde(default)]
    to: Option<i64>,
    matcher: MatcherOp,
    value: i64,
    #[serde(default)]
    search_type: HistorySearch,
}

#[derive(Deserialize)]
struct RawHistoryEvent {
    #[serde(rename = "type")]
    event_type: String,
    source: String,
    #[serde(default)]
    data: EventData,
}

impl TryFrom<RawCondition> for Condition {
    type Error = RuleError;

    fn try_from(raw: RawCondition) -> Result<Self, Self::Error> {
        match raw {
            RawCondition::Matcher(m) => Ok(Condition::matcher(m.key, m.matcher, m.values)),
            RawCondition::Group(group) => {
                let mut conditions = group
                    .conditions
                    .into_iter()
                    .map(Condition::try_from)
                    .collect::<Result<Vec<_>, _>>()?;
                match group.logic {
                    Logic::And => Ok(Condition::And(conditions)),
                    Logic::Or => Ok(Condition::Or(conditions)),
                    Logic::Not => match (conditions.pop(), conditions.is_empty()) {
                        (Some(only), true) => Ok(Condition::not(only)),
                        _ => Err(RuleError::Malformed(
                            "not group takes exactly one condition".to_string(),
                        )),
                    },
                }
            }
            RawCondition::Historical(h) => {
                let from_ms = h.from.unwrap_or(0);
                let to_ms = h.to.unwrap_or(i64::MAX);
                let requests = h
                    .events
                    .into_iter()
                    .map(|e| {
                        HistoryRequest::new(e.event_type, e.source, e.data).between(from_ms, to_ms)
                    })
                    .collect();
                Ok(Condition::Historical(HistoricalCondition {
                    requests,
                    search: h.search_type,
                    op: h.matcher,
                    value: h.value,
                }))
            }
        }
    }
}

fn parse_rule(index: usize, value: Value) -> Result<Rule, RuleError> {
    let raw: RawRule = serde_json::from_value(value)?;
    let condition = Condition::try_from(raw.condition)?;
    condition.compile_patterns()?;
    let mut rule = Rule::new(condition, raw.consequences);
    rule.re_evaluable = raw.re_evaluable;
    if let Some(id) = raw.id {
        rule.id = id;
    }
    tracing::trace!(index, rule = %rule.id, "parsed rule");
    Ok(rule)
}

/// Parse a rules document.
///
/// Fails only if the document itself is unreadable. A rule that cannot be
/// parsed is skipped with a warning and the rest are kept.
pub fn parse_rules(json: &str) -> Result<Vec<Rule>, RuleError> {
    let document: RulesDocument = serde_json::from_str(json)?;
    if document.version != SUPPORTED_VERSION {
        return Err(RuleError::Version(document.version));
    }
    let mut rules = Vec::with_capacity(document.rules.len());
    for (index, value) in document.rules.into_iter().enumerate() {
        match parse_rule(index, value) {
            Ok(rule) => rules.push(rule),
            Err(e) => tracing::warn!(index, error = %e, "skipping unparseable rule"),
        }
    }
    tracing::debug!(count = rules.len(), "rules parsed");
    Ok(rules)
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
