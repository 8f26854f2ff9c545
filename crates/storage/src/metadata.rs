// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Conditional-fetch metadata for cached downloads
//!
//! A downloader records `Last-Modified` and `ETag` from a response alongside
//! the cached bytes, then turns them back into `If-Modified-Since`,
//! `If-Range` and `Range` request headers on the next fetch.

use crate::cache::CacheService;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;

pub const LAST_MODIFIED: &str = "Last-Modified";
pub const ETAG: &str = "ETag";
pub const IF_MODIFIED_SINCE: &str = "If-Modified-Since";
pub const IF_RANGE: &str = "If-Range";
pub const RANGE: &str = "Range";

/// Metadata key holding `Last-Modified` as epoch millis
const LAST_MODIFIED_EPOCH: &str = "Last-Modified-Epoch";

const HTTP_DATE: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Source of metadata for previously downloaded files
pub trait MetadataProvider: Send + Sync {
    /// `None` if the file is unknown, an empty map if it has no metadata
    fn get_metadata(&self, file: &str) -> Option<HashMap<String, String>>;
}

/// Reads metadata stored next to entries of one cache
pub struct CacheMetadataProvider {
    cache: Arc<dyn CacheService>,
    cache_name: String,
}

impl CacheMetadataProvider {
    pub fn new(cache: Arc<dyn CacheService>, cache_name: impl Into<String>) -> Self {
        Self {
            cache,
            cache_name: cache_name.into(),
        }
    }
}

impl MetadataProvider for CacheMetadataProvider {
    fn get_metadata(&self, file: &str) -> Option<HashMap<String, String>> {
        self.cache
            .get(&self.cache_name, file)
            .map(|entry| entry.metadata)
    }
}

/// Build request headers for a conditional fetch of a cached file.
///
/// `cached_len` is the number of bytes already held; when non-zero a `Range`
/// request resumes after them and `If-Range` guards it with the ETag.
pub fn conditional_fetch_headers(
    metadata: &HashMap<String, String>,
    cached_len: u64,
) -> HashMap<String, String> {
    let mut headers = HashMap::new();

    if let Some(date) = metadata
        .get(LAST_MODIFIED_EPOCH)
        .and_then(|ms| ms.parse::<i64>().ok())
        .and_then(DateTime::<Utc>::from_timestamp_millis)
    {
        headers.insert(IF_MODIFIED_SINCE.to_string(), date.format(HTTP_DATE).to_string());
    } else if let Some(raw) = metadata.get(LAST_MODIFIED) {
        headers.insert(IF_MODIFIED_SINCE.to_string(), raw.clone());
    }

    if cached_len > 0 {
        if let Some(etag) = metadata.get(ETAG) {
            headers.insert(IF_RANGE.to_string(), etag.clone());
        }
        headers.insert(RANGE.to_string(), format!("bytes={}-", cached_len));
    }

    headers
}

/// Extract the metadata worth keeping from response headers
pub fn metadata_from_response_headers(headers: &HashMap<String, String>) -> HashMap<String, String> {
    let mut metadata = HashMap::new();
    for (name, value) in headers {
        if name.eq_ignore_ascii_case(ETAG) {
            metadata.insert(ETAG.to_string(), value.clone());
        } else if name.eq_ignore_ascii_case(LAST_MODIFIED) {
            metadata.insert(LAST_MODIFIED.to_string(), value.clone());
            if let Ok(date) = DateTime::parse_from_rfc2822(value) {
                metadata.insert(
                    LAST_MODIFIED_EPOCH.to_string(),
                    date.timestamp_millis().to_string(),
                );
            }
        }
    }
    metadata
}
