//! Versioned shared-state reads

use crate::prelude::*;
use serde_json::json;
use sy_core::{Event, SharedStateResolution, SharedStateStatus};

fn at(sequence: u64) -> Event {
    Event::builder("check", X, Y).build().sequenced(sequence)
}

#[tokio::test]
async fn reads_never_look_past_the_querying_event() {
    let hub = hub().await;
    let owner = Component::new("com.acme.owner", |_| Ok(()));
    hub.register_extension(owner.clone()).await.unwrap();
    let api = owner.api();

    // Set at multiples of 3, pending at 10 and 20
    let mut pending = Vec::new();
    for version in 1..=24u64 {
        if version == 10 || version == 20 {
            pending.push(api.create_pending_shared_state(Some(&at(version))).unwrap());
        } else if version % 3 == 0 {
            api.create_shared_state(data(json!({"v": version})), Some(&at(version)))
                .unwrap();
        }
    }

    for sequence in 1..=30u64 {
        let any = hub
            .get_shared_state("com.acme.owner", Some(&at(sequence)), SharedStateResolution::Any)
            .unwrap();
        if let Some(version) = any.version {
            assert!(version <= sequence, "ANY returned {version} for {sequence}");
        }

        let last_set = hub
            .get_shared_state(
                "com.acme.owner",
                Some(&at(sequence)),
                SharedStateResolution::LastSet,
            )
            .unwrap();
        assert_ne!(last_set.status, SharedStateStatus::Pending);
        if let Some(version) = last_set.version {
            assert_eq!(version % 3, 0);
            assert!(version <= sequence);
        }
    }

    let any = hub
        .get_shared_state("com.acme.owner", Some(&at(11)), SharedStateResolution::Any)
        .unwrap();
    assert_eq!(any.status, SharedStateStatus::Pending);
    assert_eq!(any.version, Some(10));

    for resolver in pending {
        resolver.resolve(data(json!({"late": true}))).unwrap();
    }
    let resolved = hub
        .get_shared_state("com.acme.owner", Some(&at(11)), SharedStateResolution::LastSet)
        .unwrap();
    assert_eq!(resolved.version, Some(10));
}
