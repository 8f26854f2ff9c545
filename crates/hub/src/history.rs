// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Historical event queries over the hub's history store

use sy_core::{HistoryRequest, HistorySearch};
use sy_storage::{EventHistoryStore, HistoryError, HistorySummary};

/// Count matches for each request.
///
/// With `enforce_order`, a request only searches from the oldest match of
/// the request before it; once a request finds nothing, every later one
/// reports zero.
pub(crate) fn query(
    store: &dyn EventHistoryStore,
    requests: &[HistoryRequest],
    enforce_order: bool,
) -> Result<Vec<HistorySummary>, HistoryError> {
    let mut results = Vec::with_capacity(requests.len());
    let mut previous: Option<HistorySummary> = None;
    for request in requests {
        let from_ms = match (&previous, enforce_order) {
            (Some(prev), true) => match prev.oldest_ms {
                Some(oldest) if prev.count > 0 => request.from_ms.max(oldest),
                _ => {
                    results.push(HistorySummary::default());
                    continue;
                }
            },
            _ => request.from_ms,
        };
        let summary = if from_ms > request.to_ms {
            HistorySummary::default()
        } else {
            store.select(request.fingerprint(), from_ms, request.to_ms)?
        };
        tracing::trace!(
            fingerprint = request.fingerprint(),
            count = summary.count,
            "history request"
        );
        results.push(summary);
        previous = Some(summary);
    }
    Ok(results)
}

/// Fold per-request counts the way `search` asks for
pub(crate) fn combined_count(results: &[HistorySummary], search: HistorySearch) -> u64 {
    match search {
        HistorySearch::Any => results.iter().map(|r| r.count).sum(),
        HistorySearch::Ordered => {
            u64::from(!results.is_empty() && results.iter().all(|r| r.count > 0))
        }
    }
}

#[cfg(test)]
#[path = "history_tests.rs"]
mod tests;
