// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Persistence services for the Switchyard hub: event history, named
//! collections, and the expiring cache.

mod cache;
mod collection;
mod history;
mod history_log;
pub mod metadata;

pub use cache::{CacheEntry, CacheError, CacheExpiry, CacheService, FileCacheService, MemoryCacheService};
pub use collection::{
    CollectionError, DataStore, JsonFileCollection, MemoryCollection, NamedCollection, StoredValue,
};
pub use history::{EventHistoryStore, HistoryError, HistorySummary, MemoryEventHistory};
pub use history_log::FileEventHistory;
pub use metadata::{
    conditional_fetch_headers, metadata_from_response_headers, CacheMetadataProvider,
    MetadataProvider,
};
