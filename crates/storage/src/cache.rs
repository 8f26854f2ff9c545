// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Expiring cache for byte payloads plus string metadata
//!
//! Expired entries are treated as absent and evicted when read; `sweep`
//! removes them eagerly.

use crate::collection::write_atomic;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use sy_core::{Clock, SystemClock};
use thiserror::Error;

/// Errors from cache persistence
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid cache name: {0:?}")]
    InvalidName(String),
}

/// When an entry stops being served
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CacheExpiry {
    /// Relative to the time of `set`
    After(Duration),
    /// Absolute epoch milliseconds
    At(i64),
    Never,
}

impl CacheExpiry {
    fn deadline(self, now_ms: i64) -> Option<i64> {
        match self {
            CacheExpiry::After(duration) => {
                Some(now_ms.saturating_add(duration.as_millis() as i64))
            }
            CacheExpiry::At(at) => Some(at),
            CacheExpiry::Never => None,
        }
    }
}

/// An entry handed to `set`
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub data: Vec<u8>,
    pub expiry: CacheExpiry,
    pub metadata: HashMap<String, String>,
}

impl CacheEntry {
    pub fn new(data: impl Into<Vec<u8>>, expiry: CacheExpiry) -> Self {
        Self {
            data: data.into(),
            expiry,
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: HashMap<String, String>) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Expiring key-value cache, partitioned by cache name
pub trait CacheService: Send + Sync {
    /// Store or overwrite `key`; `Ok(false)` if the entry is already expired,
    /// in which case any previous value under `key` is dropped
    fn set(&self, cache_name: &str, key: &str, entry: CacheEntry) -> Result<bool, CacheError>;
    fn get(&self, cache_name: &str, key: &str) -> Option<CacheEntry>;
    /// True only if an entry existed and was removed
    fn remove(&self, cache_name: &str, key: &str) -> bool;
    /// Evict every expired entry, returning how many were dropped
    fn sweep(&self) -> usize;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Stored {
    /// Absolute deadline in epoch millis, none for entries that never expire
    expires_at: Option<i64>,
    metadata: HashMap<String, String>,
}

impl Stored {
    fn expired(&self, now_ms: i64) -> bool {
        self.expires_at.is_some_and(|at| at <= now_ms)
    }

    fn to_entry(&self, data: Vec<u8>) -> CacheEntry {
        CacheEntry {
            data,
            expiry: self.expires_at.map_or(CacheExpiry::Never, CacheExpiry::At),
            metadata: self.metadata.clone(),
        }
    }
}

/// Volatile cache service
pub struct MemoryCacheService<C: Clock = SystemClock> {
    clock: C,
    entries: Mutex<HashMap<(String, String), (Stored, Vec<u8>)>>,
}

impl MemoryCacheService<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for MemoryCacheService<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> MemoryCacheService<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<C: Clock> CacheService for MemoryCacheService<C> {
    fn set(&self, cache_name: &str, key: &str, entry: CacheEntry) -> Result<bool, CacheError> {
        let now = self.clock.now_ms();
        let stored = Stored {
            expires_at: entry.expiry.deadline(now),
            metadata: entry.metadata,
        };
        let map_key = (cache_name.to_string(), key.to_string());
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if stored.expired(now) {
            entries.remove(&map_key);
            return Ok(false);
        }
        entries.insert(map_key, (stored, entry.data));
        Ok(true)
    }

    fn get(&self, cache_name: &str, key: &str) -> Option<CacheEntry> {
        let now = self.clock.now_ms();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let map_key = (cache_name.to_string(), key.to_string());
        if entries.get(&map_key)?.0.expired(now) {
            entries.remove(&map_key);
            return None;
        }
        let (stored, data) = entries.get(&map_key)?;
        Some(stored.to_entry(data.clone()))
    }

    fn remove(&self, cache_name: &str, key: &str) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&(cache_name.to_string(), key.to_string()))
            .is_some()
    }

    fn sweep(&self) -> usize {
        let now = self.clock.now_ms();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let before = entries.len();
        entries.retain(|_, (stored, _)| !stored.expired(now));
        before - entries.len()
    }
}

/// Cache service storing each entry as `<root>/<cache>/<key>.data` plus a
/// `<key>.meta.json` sidecar
pub struct FileCacheService<C: Clock = SystemClock> {
    root: PathBuf,
    clock: C,
    lock: Mutex<()>,
}

impl FileCacheService<SystemClock> {
    pub fn open(root: &Path) -> Result<Self, CacheError> {
        Self::open_with_clock(root, SystemClock)
    }
}

impl<C: Clock> FileCacheService<C> {
    pub fn open_with_clock(root: &Path, clock: C) -> Result<Self, CacheError> {
        fs::create_dir_all(root)?;
        Ok(Self {
            root: root.to_path_buf(),
            clock,
            lock: Mutex::new(()),
        })
    }

    fn paths(&self, cache_name: &str, key: &str) -> Result<(PathBuf, PathBuf), CacheError> {
        if cache_name.is_empty() || cache_name.contains(['/', '\\']) || cache_name.starts_with('.') {
            return Err(CacheError::InvalidName(cache_name.to_string()));
        }
        let dir = self.root.join(cache_name);
        let file = encode_key(key);
        Ok((
            dir.join(format!("{}.data", file)),
            dir.join(format!("{}.meta.json", file)),
        ))
    }

    fn read(&self, data_path: &Path, meta_path: &Path) -> Result<(Stored, Vec<u8>), CacheError> {
        let stored: Stored = serde_json::from_slice(&fs::read(meta_path)?)?;
        let data = fs::read(data_path)?;
        Ok((stored, data))
    }

    fn delete_files(data_path: &Path, meta_path: &Path) -> bool {
        let meta = fs::remove_file(meta_path).is_ok();
        let data = fs::remove_file(data_path).is_ok();
        meta || data
    }
}

impl<C: Clock> CacheService for FileCacheService<C> {
    fn set(&self, cache_name: &str, key: &str, entry: CacheEntry) -> Result<bool, CacheError> {
        let (data_path, meta_path) = self.paths(cache_name, key)?;
        let now = self.clock.now_ms();
        let stored = Stored {
            expires_at: entry.expiry.deadline(now),
            metadata: entry.metadata,
        };
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        if stored.expired(now) {
            Self::delete_files(&data_path, &meta_path);
            return Ok(false);
        }
        write_atomic(&data_path, &entry.data)?;
        write_atomic(&meta_path, &serde_json::to_vec(&stored)?)?;
        Ok(true)
    }

    fn get(&self, cache_name: &str, key: &str) -> Option<CacheEntry> {
        let (data_path, meta_path) = self.paths(cache_name, key).ok()?;
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let (stored, data) = match self.read(&data_path, &meta_path) {
            Ok(found) => found,
            Err(CacheError::Io(e)) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(cache_name, key, error = %e, "unreadable cache entry, evicting");
                Self::delete_files(&data_path, &meta_path);
                return None;
            }
        };
        if stored.expired(self.clock.now_ms()) {
            Self::delete_files(&data_path, &meta_path);
            return None;
        }
        Some(stored.to_entry(data))
    }

    fn remove(&self, cache_name: &str, key: &str) -> bool {
        let Ok((data_path, meta_path)) = self.paths(cache_name, key) else {
            return false;
        };
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        Self::delete_files(&data_path, &meta_path)
    }

    fn sweep(&self) -> usize {
        let now = self.clock.now_ms();
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut removed = 0;
        let Ok(caches) = fs::read_dir(&self.root) else {
            return 0;
        };
        for cache in caches.flatten() {
            let Ok(files) = fs::read_dir(cache.path()) else {
                continue;
            };
            for file in files.flatten() {
                let meta_path = file.path();
                let Some(stem) = meta_path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .and_then(|n| n.strip_suffix(".meta.json"))
                else {
                    continue;
                };
                let expired = fs::read(&meta_path)
                    .ok()
                    .and_then(|bytes| serde_json::from_slice::<Stored>(&bytes).ok())
                    .map_or(true, |stored| stored.expired(now));
                if expired {
                    let data_path = cache.path().join(format!("{}.data", stem));
                    Self::delete_files(&data_path, &meta_path);
                    removed += 1;
                }
            }
        }
        removed
    }
}

/// Map an arbitrary key onto a safe file stem
fn encode_key(key: &str) -> String {
    let encoded = urlencoding::encode(key);
    // `.` is left unreserved; a leading one would hide the file or climb
    match encoded.strip_prefix('.') {
        Some(rest) => format!("%2E{}", rest),
        None => encoded.into_owned(),
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
