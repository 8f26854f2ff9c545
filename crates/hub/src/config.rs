// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hub configuration, read from TOML
//!
//! ```toml
//! default_response_timeout = "5s"
//!
//! [history]
//! path = "/var/lib/switchyard/history.log"
//!
//! [rules]
//! case_insensitive = true
//! collection_dir = "/var/lib/switchyard/collections"
//!
//! [logging]
//! filter = "sy_hub=debug,info"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use sy_rules::{EngineOptions, DEFAULT_MATCHED_CAPACITY};
use thiserror::Error;

/// Errors from loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Top-level hub configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HubConfig {
    /// Deadline used by `dispatch_with_response` when none is given
    #[serde(with = "humantime_serde")]
    pub default_response_timeout: Duration,
    pub history: HistoryConfig,
    pub rules: RulesConfig,
    pub logging: LoggingConfig,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            default_response_timeout: Duration::from_secs(5),
            history: HistoryConfig::default(),
            rules: RulesConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Event history storage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HistoryConfig {
    /// Operation log location; history stays in memory when unset
    pub path: Option<PathBuf>,
}

/// Built-in rules extension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RulesConfig {
    pub case_insensitive: bool,
    pub matched_capacity: usize,
    /// Where the installed rules document is persisted; memory when unset
    pub collection_dir: Option<PathBuf>,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            case_insensitive: false,
            matched_capacity: DEFAULT_MATCHED_CAPACITY,
            collection_dir: None,
        }
    }
}

impl RulesConfig {
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            case_insensitive: self.case_insensitive,
            matched_capacity: self.matched_capacity,
        }
    }
}

/// Log output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Filter directives used when `RUST_LOG` is not set
    pub filter: String,
    /// Log file; stderr when unset
    pub path: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            path: None,
        }
    }
}

impl HubConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
