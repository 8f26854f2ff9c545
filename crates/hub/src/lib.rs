// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Switchyard event hub
//!
//! The hub sequences events from any producer, records their fingerprints,
//! and routes them to extensions. Each extension runs on its own container
//! task and reaches the hub through an [`ExtensionApi`].

pub mod config;
mod container;
mod error;
mod extension;
mod history;
mod hub;
mod listener;
pub mod logging;
#[cfg(test)]
mod fake;
mod response;
mod rules_extension;

pub use config::{ConfigError, HistoryConfig, HubConfig, LoggingConfig, RulesConfig};
pub use error::HubError;
pub use extension::{Extension, ExtensionApi, ExtensionError, SharedStateResolver};
pub use hub::{EventHub, LifecycleState, HUB_VERSION};
pub use response::ResponseFuture;
pub use rules_extension::{RULES_EXTENSION_NAME, RULES_KEY, TRIGGERED_CONSEQUENCE_KEY};

// Re-exported so extensions can depend on the hub alone
pub use async_trait::async_trait;
