//! Event history counting and deletion

use crate::prelude::*;
use std::time::Duration;
use sy_core::{Clock, Event, FakeClock, SystemClock};
use sy_storage::{EventHistoryStore, MemoryEventHistory};

#[tokio::test]
async fn dispatched_events_are_counted_by_fingerprint() {
    let hub = hub().await;
    let f = || Event::builder("f", X, Y).entry("kind", "F").build();
    let g = || Event::builder("g", X, Y).entry("kind", "G").build();
    let (fp_f, fp_g) = (f().fingerprint(), g().fingerprint());

    for _ in 0..10 {
        hub.dispatch(f()).unwrap();
    }
    for _ in 0..15 {
        hub.dispatch(g()).unwrap();
    }

    let history = hub.history();
    let now = SystemClock.now_ms();
    assert_eq!(history.select(fp_g, 0, now).unwrap().count, 15);
    assert_eq!(history.delete(fp_f, 0, now).unwrap(), 10);
    assert_eq!(history.select(fp_f, 0, now).unwrap().count, 0);
    assert_eq!(history.select(fp_g, 0, now).unwrap().count, 15);
}

#[test]
fn single_insert_round_trips() {
    let clock = FakeClock::at(1_000_000);
    let store = MemoryEventHistory::with_clock(clock.clone());

    store.insert(42).unwrap();
    clock.advance(Duration::from_millis(5));

    let summary = store.select(42, 999_999, 1_000_001).unwrap();
    assert_eq!(summary.count, 1);
    assert_eq!(summary.oldest_ms, Some(1_000_000));
    assert_eq!(summary.newest_ms, Some(1_000_000));

    store.delete(42, 999_999, 1_000_001).unwrap();
    assert_eq!(store.select(42, 999_999, 1_000_001).unwrap().count, 0);
}
