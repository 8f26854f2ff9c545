// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// Errors from loading or evaluating rules
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("invalid rules document: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("unsupported rules document version {0}")]
    Version(u64),
    #[error("malformed condition: {0}")]
    Malformed(String),
}
