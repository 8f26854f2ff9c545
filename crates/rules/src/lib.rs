// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Rules engine for the Switchyard hub
//!
//! Rules pair a condition tree with consequences. The engine holds an
//! immutable snapshot of rules and evaluates one event at a time against it.

mod condition;
mod engine;
mod error;
mod parser;
mod rule;
mod template;
mod tokens;

pub use condition::{Condition, HistoricalCondition, Matcher, MatcherOp};
pub use engine::{EngineOptions, RulesEngine, DEFAULT_MATCHED_CAPACITY};
pub use error::RuleError;
pub use parser::parse_rules;
pub use rule::{Consequence, Rule};
pub use template::{render_detail, render_template};
pub use tokens::{EventTokens, HistoryReader, StateReader, TokenResolver};
