// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Versioned shared-state table
//!
//! Every component owns an append-only list of snapshots per state kind.
//! Versions are event sequence numbers, so a reader holding an event with
//! sequence N sees exactly the state that existed as of N.

use crate::event::EventData;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// Errors from shared-state mutation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SharedStateError {
    #[error("shared state for {owner} at version {version} is older than latest version {latest}")]
    VersionRegression {
        owner: String,
        version: u64,
        latest: u64,
    },
    #[error("shared state for {owner} at version {version} is not pending")]
    NotPending { owner: String, version: u64 },
}

/// Regular state or the schema-constrained XDM variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SharedStateKind {
    Standard,
    Xdm,
}

impl fmt::Display for SharedStateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SharedStateKind::Standard => write!(f, "standard"),
            SharedStateKind::Xdm => write!(f, "xdm"),
        }
    }
}

/// Status of a resolved shared-state read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SharedStateStatus {
    /// Version reserved, data not yet published
    Pending,
    Set,
    /// No entry at or below the requested version
    None,
}

/// How a reader picks among versioned entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SharedStateResolution {
    /// Greatest version at or below the query, whatever its status
    Any,
    /// Greatest SET version at or below the query
    #[default]
    LastSet,
}

/// Result of a shared-state read
#[derive(Debug, Clone, PartialEq)]
pub struct SharedStateResult {
    pub status: SharedStateStatus,
    pub version: Option<u64>,
    pub value: Option<Arc<EventData>>,
}

impl SharedStateResult {
    fn none() -> Self {
        Self {
            status: SharedStateStatus::None,
            version: None,
            value: None,
        }
    }
}

#[derive(Debug, Clone)]
enum Entry {
    Pending,
    Set(Arc<EventData>),
}

#[derive(Debug, Default)]
struct VersionedStates {
    entries: BTreeMap<u64, Entry>,
}

impl VersionedStates {
    fn check_version(&self, owner: &str, version: u64) -> Result<(), SharedStateError> {
        match self.entries.keys().next_back() {
            Some(&latest) if version < latest => Err(SharedStateError::VersionRegression {
                owner: owner.to_string(),
                version,
                latest,
            }),
            _ => Ok(()),
        }
    }

    fn read(&self, version: u64, resolution: SharedStateResolution) -> SharedStateResult {
        let mut candidates = self.entries.range(..=version).rev();
        let found = match resolution {
            SharedStateResolution::Any => candidates.next(),
            SharedStateResolution::LastSet => {
                candidates.find(|(_, entry)| matches!(entry, Entry::Set(_)))
            }
        };
        match found {
            Some((&v, Entry::Set(data))) => SharedStateResult {
                status: SharedStateStatus::Set,
                version: Some(v),
                value: Some(Arc::clone(data)),
            },
            Some((&v, Entry::Pending)) => SharedStateResult {
                status: SharedStateStatus::Pending,
                version: Some(v),
                value: None,
            },
            None => SharedStateResult::none(),
        }
    }
}

type OwnerKey = (String, SharedStateKind);

/// Per-component versioned snapshots, shared by every container of a hub
#[derive(Default)]
pub struct SharedStateTable {
    owners: RwLock<HashMap<OwnerKey, Arc<RwLock<VersionedStates>>>>,
}

impl SharedStateTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, owner: &str, kind: SharedStateKind) -> Arc<RwLock<VersionedStates>> {
        let key = (owner.to_string(), kind);
        if let Some(slot) = self
            .owners
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&key)
        {
            return Arc::clone(slot);
        }
        let mut owners = self.owners.write().unwrap_or_else(|e| e.into_inner());
        Arc::clone(owners.entry(key).or_default())
    }

    fn existing(&self, owner: &str, kind: SharedStateKind) -> Option<Arc<RwLock<VersionedStates>>> {
        self.owners
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&(owner.to_string(), kind))
            .cloned()
    }

    /// Publish `data` at `version`; the last write at a version wins
    pub fn set(
        &self,
        owner: &str,
        kind: SharedStateKind,
        version: u64,
        data: EventData,
    ) -> Result<(), SharedStateError> {
        let slot = self.slot(owner, kind);
        let mut states = slot.write().unwrap_or_else(|e| e.into_inner());
        states.check_version(owner, version)?;
        states.entries.insert(version, Entry::Set(Arc::new(data)));
        tracing::debug!(owner, %kind, version, "shared state set");
        Ok(())
    }

    /// Reserve `version` as pending
    pub fn reserve(
        &self,
        owner: &str,
        kind: SharedStateKind,
        version: u64,
    ) -> Result<(), SharedStateError> {
        let slot = self.slot(owner, kind);
        let mut states = slot.write().unwrap_or_else(|e| e.into_inner());
        states.check_version(owner, version)?;
        states.entries.insert(version, Entry::Pending);
        tracing::debug!(owner, %kind, version, "shared state pending");
        Ok(())
    }

    /// Fill a pending reservation, which may sit below newer versions
    pub fn resolve(
        &self,
        owner: &str,
        kind: SharedStateKind,
        version: u64,
        data: EventData,
    ) -> Result<(), SharedStateError> {
        let not_pending = || SharedStateError::NotPending {
            owner: owner.to_string(),
            version,
        };
        let slot = self.existing(owner, kind).ok_or_else(not_pending)?;
        let mut states = slot.write().unwrap_or_else(|e| e.into_inner());
        match states.entries.get_mut(&version) {
            Some(entry) if matches!(entry, Entry::Pending) => {
                *entry = Entry::Set(Arc::new(data));
                tracing::debug!(owner, %kind, version, "pending shared state resolved");
                Ok(())
            }
            _ => Err(not_pending()),
        }
    }

    /// Read `owner`'s state as of `version` (`None` reads the latest).
    ///
    /// Returns `None` when the owner never published state of this kind.
    pub fn get(
        &self,
        owner: &str,
        kind: SharedStateKind,
        version: Option<u64>,
        resolution: SharedStateResolution,
    ) -> Option<SharedStateResult> {
        let slot = self.existing(owner, kind)?;
        let states = slot.read().unwrap_or_else(|e| e.into_inner());
        Some(states.read(version.unwrap_or(u64::MAX), resolution))
    }

    /// Latest version recorded for `owner`, if any
    pub fn latest_version(&self, owner: &str, kind: SharedStateKind) -> Option<u64> {
        let slot = self.existing(owner, kind)?;
        let states = slot.read().unwrap_or_else(|e| e.into_inner());
        states.entries.keys().next_back().copied()
    }

    /// Drop every entry for `owner`
    pub fn remove_owner(&self, owner: &str) {
        let mut owners = self.owners.write().unwrap_or_else(|e| e.into_inner());
        owners.retain(|(name, _), _| name != owner);
    }

    /// Names of components that have published state
    pub fn owners(&self) -> Vec<String> {
        let owners = self.owners.read().unwrap_or_else(|e| e.into_inner());
        let mut names: Vec<String> = owners.keys().map(|(name, _)| name.clone()).collect();
        names.sort();
        names.dedup();
        names
    }

    /// Drop everything
    pub fn clear(&self) {
        self.owners
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

#[cfg(test)]
#[path = "shared_state_tests.rs"]
mod tests;
