// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `{%token%}` substitution in consequence details

use crate::tokens::{value_text, TokenResolver};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use sy_core::EventData;

// Allow expect here as the regex is compile-time verified to be valid
#[allow(clippy::expect_used)]
static TOKEN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{%\s*(.+?)\s*%\}").expect("constant regex pattern is valid"));

// Regex pattern for transform(token)
#[allow(clippy::expect_used)]
static TRANSFORM_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([a-zA-Z_]+)\((.*)\)$").expect("constant regex pattern is valid")
});

/// Replace every `{%token%}` in `template` with its resolved value.
///
/// `{%urlenc(token)%}` url-encodes the value. Unresolved tokens render as
/// the empty string.
pub fn render_template(template: &str, resolver: &dyn TokenResolver) -> String {
    TOKEN_PATTERN
        .replace_all(template, |caps: &regex::Captures| {
            render_token(&caps[1], resolver)
        })
        .into_owned()
}

fn render_token(token: &str, resolver: &dyn TokenResolver) -> String {
    if let Some(caps) = TRANSFORM_PATTERN.captures(token) {
        let inner = caps[2].trim();
        match &caps[1] {
            "urlenc" => return urlencoding::encode(&lookup(inner, resolver)).into_owned(),
            other => tracing::debug!(transform = other, "unknown token transform"),
        }
    }
    lookup(token, resolver)
}

fn lookup(key: &str, resolver: &dyn TokenResolver) -> String {
    resolver
        .resolve(key)
        .map(|value| value_text(&value))
        .unwrap_or_default()
}

/// Render every string inside `detail`, recursing into maps and lists
pub fn render_detail(detail: &EventData, resolver: &dyn TokenResolver) -> EventData {
    detail
        .iter()
        .map(|(key, value)| (key.clone(), render_value(value, resolver)))
        .collect()
}

fn render_value(value: &Value, resolver: &dyn TokenResolver) -> Value {
    match value {
        Value::String(s) => Value::String(render_template(s, resolver)),
        Value::Object(map) => Value::Object(render_detail(map, resolver)),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| render_value(item, resolver))
                .collect(),
        ),
        other => other.clone(),
    }
}

#[cfg(test)]
#[path = "template_tests.rs"]
mod tests;
