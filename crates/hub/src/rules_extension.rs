// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Built-in extension that runs the rules engine
//!
//! Every event is evaluated against the current rules. Each consequence of a
//! matched rule is dispatched as a `rulesEngine`/`responseContent` event
//! chained to the event that triggered it.

use crate::error::HubError;
use crate::extension::{Extension, ExtensionApi, ExtensionError};
use crate::hub::HUB_VERSION;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use sy_core::{event_source, event_type, Event};
use sy_rules::{parse_rules, render_detail, EventTokens, RulesEngine};
use sy_storage::NamedCollection;

/// Name the rules extension registers under
pub const RULES_EXTENSION_NAME: &str = "com.switchyard.rules";

/// Collection key holding the last installed rules document
const RULES_DOCUMENT_KEY: &str = "rules.document";

/// Data key of consequence events
pub const TRIGGERED_CONSEQUENCE_KEY: &str = "triggeredconsequence";

/// Data key carrying a rules document in a reset request
pub const RULES_KEY: &str = "rules";

pub(crate) struct RulesExtension {
    engine: Arc<RulesEngine>,
    collection: Arc<dyn NamedCollection>,
}

impl RulesExtension {
    pub(crate) fn new(engine: Arc<RulesEngine>, collection: Arc<dyn NamedCollection>) -> Self {
        Self { engine, collection }
    }

    /// Reinstall the persisted document, if any
    fn restore(&self) {
        let Some(document) = self.collection.get_string(RULES_DOCUMENT_KEY) else {
            return;
        };
        match parse_rules(&document) {
            Ok(rules) => {
                tracing::info!(count = rules.len(), "restored persisted rules");
                self.engine.replace_rules(rules);
            }
            Err(e) => tracing::warn!(error = %e, "persisted rules unreadable"),
        }
    }
}

#[async_trait]
impl Extension for RulesExtension {
    fn name(&self) -> &str {
        RULES_EXTENSION_NAME
    }

    fn version(&self) -> &str {
        HUB_VERSION
    }

    fn friendly_name(&self) -> &str {
        "Rules Engine"
    }

    async fn on_registered(&self, api: &ExtensionApi) -> Result<(), ExtensionError> {
        self.restore();

        let engine = Arc::clone(&self.engine);
        let collection = Arc::clone(&self.collection);
        api.register_listener(
            event_type::RULES_ENGINE,
            event_source::REQUEST_RESET,
            move |event| {
                let Some(document) = rules_document(event) else {
                    tracing::debug!(event = event.unique_id(), "reset request without rules");
                    return;
                };
                if let Err(e) = install(&engine, collection.as_ref(), &document) {
                    tracing::warn!(error = %e, "rules reset rejected");
                }
            },
        )?;

        let engine = Arc::clone(&self.engine);
        let evaluator = api.clone();
        api.register_listener(event_type::WILDCARD, event_source::WILDCARD, move |event| {
            process(&engine, &evaluator, event);
        })?;
        Ok(())
    }
}

/// Parse and persist `document`, then replace the engine's rules.
///
/// The running rules are left untouched if either step fails.
pub(crate) fn install(
    engine: &RulesEngine,
    collection: &dyn NamedCollection,
    document: &str,
) -> Result<usize, HubError> {
    let rules = parse_rules(document)?;
    let count = rules.len();
    collection.set_string(RULES_DOCUMENT_KEY, document)?;
    engine.replace_rules(rules);
    Ok(count)
}

/// The rules document in a reset request, as a string or inline object
fn rules_document(event: &Event) -> Option<String> {
    match event.data().get(RULES_KEY)? {
        Value::String(document) => Some(document.clone()),
        object @ Value::Object(_) => Some(object.to_string()),
        _ => None,
    }
}

fn process(engine: &RulesEngine, api: &ExtensionApi, event: &Event) {
    let tokens = EventTokens::new(event)
        .with_state(api)
        .with_history(api)
        .with_sdk_version(HUB_VERSION);
    for rule in engine.evaluate(event, &tokens) {
        for consequence in &rule.consequences {
            let detail = render_detail(&consequence.detail, &tokens);
            let triggered = Event::builder(
                "Rules Consequence Event",
                event_type::RULES_ENGINE,
                event_source::RESPONSE_CONTENT,
            )
            .entry(
                TRIGGERED_CONSEQUENCE_KEY,
                json!({
                    "id": consequence.id,
                    "type": consequence.kind,
                    "detail": detail,
                }),
            )
            .chained_from(event)
            .build();
            if let Err(e) = api.dispatch(triggered) {
                tracing::warn!(
                    rule = %rule.id,
                    consequence = %consequence.id,
                    error = %e,
                    "consequence not dispatched"
                );
            }
        }
    }
}

#[cfg(test)]
#[path = "rules_extension_tests.rs"]
mod tests;
