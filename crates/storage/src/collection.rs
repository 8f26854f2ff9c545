// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Named key-value collections
//!
//! A collection stores typed scalars and string maps under string keys. The
//! core only relies on these semantics; the backing technology is pluggable.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors from collection persistence
#[derive(Debug, Error)]
pub enum CollectionError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid collection name: {0:?}")]
    InvalidName(String),
}

/// A typed value held in a collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum StoredValue {
    Int(i32),
    Long(i64),
    Double(f64),
    Float(f32),
    Bool(bool),
    String(String),
    Map(HashMap<String, String>),
}

/// Typed key-value storage under one name
pub trait NamedCollection: Send + Sync {
    fn get(&self, key: &str) -> Option<StoredValue>;
    fn set(&self, key: &str, value: StoredValue) -> Result<(), CollectionError>;
    fn contains(&self, key: &str) -> bool;
    fn remove(&self, key: &str) -> Result<(), CollectionError>;
    fn remove_all(&self) -> Result<(), CollectionError>;

    fn get_int(&self, key: &str) -> Option<i32> {
        match self.get(key)? {
            StoredValue::Int(v) => Some(v),
            _ => None,
        }
    }

    fn set_int(&self, key: &str, value: i32) -> Result<(), CollectionError> {
        self.set(key, StoredValue::Int(value))
    }

    /// Ints widen to longs
    fn get_long(&self, key: &str) -> Option<i64> {
        match self.get(key)? {
            StoredValue::Long(v) => Some(v),
            StoredValue::Int(v) => Some(i64::from(v)),
            _ => None,
        }
    }

    fn set_long(&self, key: &str, value: i64) -> Result<(), CollectionError> {
        self.set(key, StoredValue::Long(value))
    }

    /// Floats widen to doubles
    fn get_double(&self, key: &str) -> Option<f64> {
        match self.get(key)? {
            StoredValue::Double(v) => Some(v),
            StoredValue::Float(v) => Some(f64::from(v)),
            _ => None,
        }
    }

    fn set_double(&self, key: &str, value: f64) -> Result<(), CollectionError> {
        self.set(key, StoredValue::Double(value))
    }

    fn get_float(&self, key: &str) -> Option<f32> {
        match self.get(key)? {
            StoredValue::Float(v) => Some(v),
            _ => None,
        }
    }

    fn set_float(&self, key: &str, value: f32) -> Result<(), CollectionError> {
        self.set(key, StoredValue::Float(value))
    }

    fn get_bool(&self, key: &str) -> Option<bool> {
        match self.get(key)? {
            StoredValue::Bool(v) => Some(v),
            _ => None,
        }
    }

    fn set_bool(&self, key: &str, value: bool) -> Result<(), CollectionError> {
        self.set(key, StoredValue::Bool(value))
    }

    fn get_string(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            StoredValue::String(v) => Some(v),
            _ => None,
        }
    }

    fn set_string(&self, key: &str, value: &str) -> Result<(), CollectionError> {
        self.set(key, StoredValue::String(value.to_string()))
    }

    fn get_map(&self, key: &str) -> Option<HashMap<String, String>> {
        match self.get(key)? {
            StoredValue::Map(v) => Some(v),
            _ => None,
        }
    }

    fn set_map(&self, key: &str, value: HashMap<String, String>) -> Result<(), CollectionError> {
        self.set(key, StoredValue::Map(value))
    }
}

/// Volatile collection
#[derive(Debug, Default)]
pub struct MemoryCollection {
    values: Mutex<HashMap<String, StoredValue>>,
}

impl MemoryCollection {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NamedCollection for MemoryCollection {
    fn get(&self, key: &str) -> Option<StoredValue> {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: StoredValue) -> Result<(), CollectionError> {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value);
        Ok(())
    }

    fn contains(&self, key: &str) -> bool {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(key)
    }

    fn remove(&self, key: &str) -> Result<(), CollectionError> {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
        Ok(())
    }

    fn remove_all(&self) -> Result<(), CollectionError> {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
        Ok(())
    }
}

/// Collection persisted as one JSON file, rewritten on every mutation
#[derive(Debug)]
pub struct JsonFileCollection {
    path: PathBuf,
    values: Mutex<HashMap<String, StoredValue>>,
}

impl JsonFileCollection {
    /// Open or create the collection file at `path`
    pub fn open(path: &Path) -> Result<Self, CollectionError> {
        let values = match fs::read_to_string(path) {
            Ok(json) if json.trim().is_empty() => HashMap::new(),
            Ok(json) => serde_json::from_str(&json)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path: path.to_path_buf(),
            values: Mutex::new(values),
        })
    }

    fn mutate<F>(&self, f: F) -> Result<(), CollectionError>
    where
        F: FnOnce(&mut HashMap<String, StoredValue>),
    {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        let mut next = values.clone();
        f(&mut next);
        write_atomic(&self.path, &serde_json::to_vec_pretty(&next)?)?;
        *values = next;
        Ok(())
    }
}

impl NamedCollection for JsonFileCollection {
    fn get(&self, key: &str) -> Option<StoredValue> {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: StoredValue) -> Result<(), CollectionError> {
        self.mutate(|values| {
            values.insert(key.to_string(), value);
        })
    }

    fn contains(&self, key: &str) -> bool {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(key)
    }

    fn remove(&self, key: &str) -> Result<(), CollectionError> {
        self.mutate(|values| {
            values.remove(key);
        })
    }

    fn remove_all(&self) -> Result<(), CollectionError> {
        self.mutate(HashMap::clear)
    }
}

/// Write via a temp file and rename so readers never see a partial file
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)
}

/// Hands out collections by name, in memory or under a directory
#[derive(Clone)]
pub struct DataStore {
    root: Option<PathBuf>,
    open: Arc<Mutex<HashMap<String, Arc<dyn NamedCollection>>>>,
}

impl DataStore {
    /// Collections that live only as long as the process
    pub fn in_memory() -> Self {
        Self {
            root: None,
            open: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Collections stored as `<root>/<name>.json`
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
            open: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Get or open the collection called `name`
    pub fn collection(&self, name: &str) -> Result<Arc<dyn NamedCollection>, CollectionError> {
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(CollectionError::InvalidName(name.to_string()));
        }
        let mut open = self.open.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(existing) = open.get(name) {
            return Ok(Arc::clone(existing));
        }
        let collection: Arc<dyn NamedCollection> = match &self.root {
            Some(root) => Arc::new(JsonFileCollection::open(&root.join(format!("{}.json", name)))?),
            None => Arc::new(MemoryCollection::new()),
        };
        open.insert(name.to_string(), Arc::clone(&collection));
        Ok(collection)
    }
}

#[cfg(test)]
#[path = "collection_tests.rs"]
mod tests;
