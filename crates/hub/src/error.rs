// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::config::ConfigError;
use std::time::Duration;
use sy_core::SharedStateError;
use sy_rules::RuleError;
use sy_storage::{CollectionError, HistoryError};
use thiserror::Error;

/// Errors surfaced by the event hub and its extension API
#[derive(Debug, Error)]
pub enum HubError {
    #[error("invalid event: {0}")]
    InvalidEvent(String),
    #[error("missing required argument: {0}")]
    NullArgument(&'static str),
    #[error("extension {name} failed to register: {reason}")]
    Registration { name: String, reason: String },
    #[error("extension already registered: {0}")]
    DuplicateExtension(String),
    #[error("extension not found: {0}")]
    ExtensionNotFound(String),
    #[error("no response within {0:?}")]
    Timeout(Duration),
    #[error("event hub is shut down")]
    Shutdown,
    #[error(transparent)]
    SharedState(#[from] SharedStateError),
    #[error(transparent)]
    History(#[from] HistoryError),
    #[error(transparent)]
    Rules(#[from] RuleError),
    #[error(transparent)]
    Collection(#[from] CollectionError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
