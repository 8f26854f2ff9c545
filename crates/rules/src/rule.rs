// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::condition::Condition;
use serde::{Deserialize, Serialize};
use sy_core::EventData;

/// Action attached to a rule, carried out by whoever consumes the match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Consequence {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub detail: EventData,
}

/// A condition plus the consequences that follow when it holds
#[derive(Debug, Clone)]
pub struct Rule {
    pub id: String,
    pub condition: Condition,
    pub consequences: Vec<Consequence>,
    /// When false, the rule matches at most once per event chain
    pub re_evaluable: bool,
}

impl Rule {
    /// Re-evaluable rule with a generated id
    pub fn new(condition: Condition, consequences: Vec<Consequence>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            condition,
            consequences,
            re_evaluable: true,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn once_per_chain(mut self) -> Self {
        self.re_evaluable = false;
        self
    }
}
