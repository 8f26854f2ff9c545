// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rule snapshot and evaluation
//!
//! The active rules live behind an [`ArcSwap`]. Every evaluation pass loads
//! the snapshot once, so a concurrent replace never shows a pass half of the
//! old set and half of the new one.

use crate::rule::Rule;
use crate::tokens::TokenResolver;
use arc_swap::ArcSwap;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use sy_core::Event;

/// Default number of event chains remembered for non re-evaluable rules
pub const DEFAULT_MATCHED_CAPACITY: usize = 1024;

/// Engine tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Compare strings (and regexes) ignoring case
    pub case_insensitive: bool,
    /// Chains remembered before the oldest is forgotten
    pub matched_capacity: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            case_insensitive: false,
            matched_capacity: DEFAULT_MATCHED_CAPACITY,
        }
    }
}

/// Which non re-evaluable rules already matched each chain, oldest chain first
struct MatchedChains {
    capacity: usize,
    order: VecDeque<String>,
    rules: HashMap<String, HashSet<String>>,
}

impl MatchedChains {
    fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            order: VecDeque::new(),
            rules: HashMap::new(),
        }
    }

    fn contains(&self, chain: &str, rule_id: &str) -> bool {
        self.rules
            .get(chain)
            .is_some_and(|rules| rules.contains(rule_id))
    }

    /// Record a match; false if it was already recorded
    fn claim(&mut self, chain: &str, rule_id: &str) -> bool {
        if let Some(rules) = self.rules.get_mut(chain) {
            return rules.insert(rule_id.to_string());
        }
        while self.order.len() >= self.capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.rules.remove(&oldest);
        }
        self.order.push_back(chain.to_string());
        self.rules
            .insert(chain.to_string(), HashSet::from([rule_id.to_string()]));
        true
    }
}

/// Holds the active rule set and evaluates events against it
pub struct RulesEngine {
    rules: ArcSwap<Vec<Arc<Rule>>>,
    options: EngineOptions,
    matched: Mutex<MatchedChains>,
}

impl Default for RulesEngine {
    fn default() -> Self {
        Self::new(EngineOptions::default())
    }
}

impl RulesEngine {
    pub fn new(options: EngineOptions) -> Self {
        Self {
            rules: ArcSwap::from_pointee(Vec::new()),
            options,
            matched: Mutex::new(MatchedChains::new(options.matched_capacity)),
        }
    }

    pub fn options(&self) -> EngineOptions {
        self.options
    }

    /// Current snapshot
    pub fn rules(&self) -> Arc<Vec<Arc<Rule>>> {
        self.rules.load_full()
    }

    /// Install `rules` as the whole rule set
    pub fn replace_rules(&self, rules: Vec<Rule>) {
        let next: Vec<Arc<Rule>> = rules.into_iter().map(Arc::new).collect();
        tracing::info!(count = next.len(), "rules replaced");
        self.rules.store(Arc::new(next));
    }

    /// Append `rules` after the current ones
    pub fn add_rules(&self, rules: Vec<Rule>) {
        let added: Vec<Arc<Rule>> = rules.into_iter().map(Arc::new).collect();
        let previous = self.rules.rcu(|current| {
            let mut next = Vec::with_capacity(current.len() + added.len());
            next.extend(current.iter().cloned());
            next.extend(added.iter().cloned());
            next
        });
        tracing::info!(
            added = added.len(),
            total = previous.len() + added.len(),
            "rules added"
        );
    }

    /// Evaluate `event` against the current snapshot.
    ///
    /// Returns matched rules in snapshot order. A malformed rule is skipped
    /// with a warning and does not stop the pass.
    pub fn evaluate(&self, event: &Event, resolver: &dyn TokenResolver) -> Vec<Arc<Rule>> {
        let span = tracing::debug_span!("rules.evaluate", event = event.unique_id());
        let _guard = span.enter();

        let snapshot = self.rules.load_full();
        let chain = event.chain_root();
        let mut matched = Vec::new();
        for rule in snapshot.iter() {
            if !rule.re_evaluable && self.lock_matched().contains(chain, &rule.id) {
                continue;
            }
            match rule.condition.evaluate(resolver, self.options.case_insensitive) {
                Ok(true) => {
                    if rule.re_evaluable || self.lock_matched().claim(chain, &rule.id) {
                        matched.push(Arc::clone(rule));
                    }
                }
                Ok(false) => {}
                Err(e) => tracing::warn!(rule = %rule.id, error = %e, "rule evaluation skipped"),
            }
        }
        tracing::debug!(rules = snapshot.len(), matched = matched.len(), "evaluated");
        matched
    }

    fn lock_matched(&self) -> std::sync::MutexGuard<'_, MatchedChains> {
        self.matched.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
