// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Condition trees and matchers

use crate::error::RuleError;
use crate::tokens::{value_text, TokenResolver};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::OnceLock;
use sy_core::{HistoryRequest, HistorySearch};

/// Comparison applied by a [`Matcher`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatcherOp {
    Eq,
    Ne,
    /// Contains
    Co,
    /// Does not contain
    Nc,
    /// Starts with
    Sw,
    /// Ends with
    Ew,
    Gt,
    Ge,
    Lt,
    Le,
    /// Exists
    Ex,
    /// Does not exist
    Nx,
    /// Regular expression
    Rx,
}

impl MatcherOp {
    pub fn code(self) -> &'static str {
        match self {
            MatcherOp::Eq => "eq",
            MatcherOp::Ne => "ne",
            MatcherOp::Co => "co",
            MatcherOp::Nc => "nc",
            MatcherOp::Sw => "sw",
            MatcherOp::Ew => "ew",
            MatcherOp::Gt => "gt",
            MatcherOp::Ge => "ge",
            MatcherOp::Lt => "lt",
            MatcherOp::Le => "le",
            MatcherOp::Ex => "ex",
            MatcherOp::Nx => "nx",
            MatcherOp::Rx => "rx",
        }
    }

    fn is_numeric(self) -> bool {
        matches!(
            self,
            MatcherOp::Gt | MatcherOp::Ge | MatcherOp::Lt | MatcherOp::Le
        )
    }

    /// Negative matchers hold only if no expected value hits
    fn is_negated(self) -> bool {
        matches!(self, MatcherOp::Ne | MatcherOp::Nc)
    }

    fn compare_numbers(self, actual: f64, expected: f64) -> bool {
        match self {
            MatcherOp::Eq => actual == expected,
            MatcherOp::Ne => actual != expected,
            MatcherOp::Gt => actual > expected,
            MatcherOp::Ge => actual >= expected,
            MatcherOp::Lt => actual < expected,
            MatcherOp::Le => actual <= expected,
            _ => false,
        }
    }
}

impl fmt::Display for MatcherOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Compares the value under `key` against a list of expected values
#[derive(Debug, Clone, PartialEq)]
pub struct Matcher {
    pub key: String,
    pub op: MatcherOp,
    pub values: Vec<Value>,
    patterns: CompiledPatterns,
}

/// `rx` operands compiled on first use, once per case mode
#[derive(Clone, Default)]
struct CompiledPatterns {
    sensitive: OnceLock<Result<Vec<Regex>, String>>,
    insensitive: OnceLock<Result<Vec<Regex>, String>>,
}

// Derived from `values`, so never part of equality
impl PartialEq for CompiledPatterns {
    fn eq(&self, _: &Self) -> bool {
        true
    }
}

impl fmt::Debug for CompiledPatterns {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledPatterns").finish_non_exhaustive()
    }
}

/// Compares a history count against `value`
#[derive(Debug, Clone, PartialEq)]
pub struct HistoricalCondition {
    pub requests: Vec<HistoryRequest>,
    pub search: HistorySearch,
    pub op: MatcherOp,
    pub value: i64,
}

/// Boolean condition tree
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Matcher(Matcher),
    And(Vec<Condition>),
    Or(Vec<Condition>),
    Not(Box<Condition>),
    Historical(HistoricalCondition),
}

impl Condition {
    pub fn matcher(key: impl Into<String>, op: MatcherOp, values: Vec<Value>) -> Self {
        Condition::Matcher(Matcher {
            key: key.into(),
            op,
            values,
            patterns: CompiledPatterns::default(),
        })
    }

    pub fn and(conditions: Vec<Condition>) -> Self {
        Condition::And(conditions)
    }

    pub fn or(conditions: Vec<Condition>) -> Self {
        Condition::Or(conditions)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(condition: Condition) -> Self {
        Condition::Not(Box::new(condition))
    }

    /// Compile every `rx` operand in the tree, failing on the first bad pattern
    pub fn compile_patterns(&self) -> Result<(), RuleError> {
        match self {
            Condition::Matcher(matcher) if matcher.op == MatcherOp::Rx => {
                matcher.patterns(false).map(|_| ())
            }
            Condition::And(conditions) | Condition::Or(conditions) => {
                conditions.iter().try_for_each(Condition::compile_patterns)
            }
            Condition::Not(condition) => condition.compile_patterns(),
            Condition::Matcher(_) | Condition::Historical(_) => Ok(()),
        }
    }

    /// Evaluate with short-circuiting `and`/`or`
    pub fn evaluate(
        &self,
        resolver: &dyn TokenResolver,
        case_insensitive: bool,
    ) -> Result<bool, RuleError> {
        match self {
            Condition::Matcher(matcher) => matcher.evaluate(resolver, case_insensitive),
            Condition::And(conditions) => {
                if conditions.is_empty() {
                    return Err(RuleError::Malformed("empty and group".to_string()));
                }
                for condition in conditions {
                    if !condition.evaluate(resolver, case_insensitive)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Condition::Or(conditions) => {
                if conditions.is_empty() {
                    return Err(RuleError::Malformed("empty or group".to_string()));
                }
                for condition in conditions {
                    if condition.evaluate(resolver, case_insensitive)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Condition::Not(condition) => Ok(!condition.evaluate(resolver, case_insensitive)?),
            Condition::Historical(historical) => historical.evaluate(resolver),
        }
    }
}

impl Matcher {
    fn malformed(&self, reason: &str) -> RuleError {
        RuleError::Malformed(format!("{} matcher on '{}': {}", self.op, self.key, reason))
    }

    fn patterns(&self, case_insensitive: bool) -> Result<&[Regex], RuleError> {
        let cell = if case_insensitive {
            &self.patterns.insensitive
        } else {
            &self.patterns.sensitive
        };
        cell.get_or_init(|| {
            self.values
                .iter()
                .map(|v| {
                    RegexBuilder::new(&value_text(v))
                        .case_insensitive(case_insensitive)
                        .build()
                        .map_err(|e| e.to_string())
                })
                .collect()
        })
        .as_deref()
        .map_err(|e| self.malformed(e))
    }

    /// Reject operands that can never be compared, independent of the event
    fn check_operands(&self) -> Result<(), RuleError> {
        if self.values.is_empty() {
            return Err(self.malformed("missing operand"));
        }
        if self.op.is_numeric() && self.values.iter().any(|v| number(v).is_none()) {
            return Err(self.malformed("non-numeric operand"));
        }
        Ok(())
    }

    fn evaluate(
        &self,
        resolver: &dyn TokenResolver,
        case_insensitive: bool,
    ) -> Result<bool, RuleError> {
        let actual = resolver.resolve(&self.key).filter(|v| !v.is_null());
        match self.op {
            MatcherOp::Ex => return Ok(actual.is_some()),
            MatcherOp::Nx => return Ok(actual.is_none()),
            _ => {}
        }
        self.check_operands()?;

        let negated = self.op.is_negated();
        let Some(actual) = actual else {
            return Ok(negated);
        };
        if self.op == MatcherOp::Rx {
            let text = value_text(&actual);
            let patterns = self.patterns(case_insensitive)?;
            return Ok(patterns.iter().any(|regex| regex.is_match(&text)));
        }
        for expected in &self.values {
            let hit = self.compare(&actual, expected, case_insensitive)?;
            if hit != negated {
                return Ok(!negated);
            }
        }
        Ok(negated)
    }

    fn compare(
        &self,
        actual: &Value,
        expected: &Value,
        case_insensitive: bool,
    ) -> Result<bool, RuleError> {
        let text = |v: &Value| fold(value_text(v), case_insensitive);
        let hit = match self.op {
            MatcherOp::Eq => equal(actual, expected, case_insensitive),
            MatcherOp::Ne => !equal(actual, expected, case_insensitive),
            MatcherOp::Co => text(actual).contains(&text(expected)),
            MatcherOp::Nc => !text(actual).contains(&text(expected)),
            MatcherOp::Sw => text(actual).starts_with(&text(expected)),
            MatcherOp::Ew => text(actual).ends_with(&text(expected)),
            MatcherOp::Gt | MatcherOp::Ge | MatcherOp::Lt | MatcherOp::Le => {
                match (number(actual), number(expected)) {
                    (Some(a), Some(b)) => self.op.compare_numbers(a, b),
                    (_, None) => return Err(self.malformed("non-numeric operand")),
                    (None, _) => false,
                }
            }
            // Handled in `evaluate` against the compiled patterns
            MatcherOp::Rx | MatcherOp::Ex | MatcherOp::Nx => false,
        };
        Ok(hit)
    }
}

impl HistoricalCondition {
    fn evaluate(&self, resolver: &dyn TokenResolver) -> Result<bool, RuleError> {
        if !(self.op.is_numeric() || matches!(self.op, MatcherOp::Eq | MatcherOp::Ne)) {
            return Err(RuleError::Malformed(format!(
                "{} matcher cannot compare history counts",
                self.op
            )));
        }
        if self.requests.is_empty() {
            return Err(RuleError::Malformed(
                "historical condition without events".to_string(),
            ));
        }
        let Some(count) = resolver.historical(&self.requests, self.search) else {
            tracing::debug!("history unavailable, historical condition is false");
            return Ok(false);
        };
        Ok(self.op.compare_numbers(count as f64, self.value as f64))
    }
}

fn fold(text: String, case_insensitive: bool) -> String {
    if case_insensitive {
        text.to_lowercase()
    } else {
        text
    }
}

/// Numbers and numeric strings; booleans are not numbers
fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn equal(actual: &Value, expected: &Value, case_insensitive: bool) -> bool {
    let numeric = matches!(actual, Value::Number(_)) || matches!(expected, Value::Number(_));
    match (actual, expected) {
        (Value::Bool(a), Value::Bool(b)) => a == b,
        _ if numeric => match (number(actual), number(expected)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
        _ => {
            fold(value_text(actual), case_insensitive)
                == fold(value_text(expected), case_insensitive)
        }
    }
}

#[cfg(test)]
#[path = "condition_tests.rs"]
mod tests;
