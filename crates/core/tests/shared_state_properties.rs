// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

//! Property tests for versioned shared-state reads
//!
//! Writes arrive with non-decreasing versions; some reserve a pending slot
//! that may be resolved later. Reads at any version must stay within it.

use proptest::prelude::*;
use serde_json::json;
use sy_core::{
    EventData, SharedStateKind, SharedStateResolution, SharedStateStatus, SharedStateTable,
};

const OWNER: &str = "com.acme.props";

#[derive(Debug, Clone)]
enum Write {
    Set(u64),
    Pending(u64),
}

fn arb_writes() -> impl Strategy<Value = Vec<Write>> {
    proptest::collection::vec((1u64..4, any::<bool>()), 0..30).prop_map(|steps| {
        let mut version = 0;
        steps
            .into_iter()
            .map(|(gap, pending)| {
                version += gap;
                if pending {
                    Write::Pending(version)
                } else {
                    Write::Set(version)
                }
            })
            .collect()
    })
}

fn payload(version: u64) -> EventData {
    let mut data = EventData::new();
    data.insert("v".to_string(), json!(version));
    data
}

fn apply(table: &SharedStateTable, writes: &[Write]) {
    for write in writes {
        match *write {
            Write::Set(v) => table
                .set(OWNER, SharedStateKind::Standard, v, payload(v))
                .unwrap(),
            Write::Pending(v) => table.reserve(OWNER, SharedStateKind::Standard, v).unwrap(),
        }
    }
}

proptest! {
    #[test]
    fn any_stays_at_or_below_the_query(writes in arb_writes(), query in 0u64..100) {
        let table = SharedStateTable::new();
        apply(&table, &writes);

        if let Some(result) = table.get(OWNER, SharedStateKind::Standard, Some(query), SharedStateResolution::Any) {
            if let Some(version) = result.version {
                prop_assert!(version <= query);
            }
        }
    }

    #[test]
    fn last_set_never_reports_pending(writes in arb_writes(), query in 0u64..100) {
        let table = SharedStateTable::new();
        apply(&table, &writes);

        if let Some(result) = table.get(OWNER, SharedStateKind::Standard, Some(query), SharedStateResolution::LastSet) {
            prop_assert_ne!(result.status, SharedStateStatus::Pending);
            if let Some(version) = result.version {
                prop_assert!(version <= query);
                let value = result.value.unwrap();
                prop_assert_eq!(&value["v"], &json!(version));
            }
        }
    }

    #[test]
    fn resolving_every_pending_slot_leaves_only_set_entries(writes in arb_writes()) {
        let table = SharedStateTable::new();
        apply(&table, &writes);
        for write in &writes {
            if let Write::Pending(v) = *write {
                table.resolve(OWNER, SharedStateKind::Standard, v, payload(v)).unwrap();
            }
        }

        for write in &writes {
            let (Write::Set(v) | Write::Pending(v)) = *write;
            let result = table
                .get(OWNER, SharedStateKind::Standard, Some(v), SharedStateResolution::Any)
                .unwrap();
            prop_assert_eq!(result.status, SharedStateStatus::Set);
            prop_assert_eq!(result.version, Some(v));
        }
    }
}
