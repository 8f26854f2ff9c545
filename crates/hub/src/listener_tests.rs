// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use sy_core::{event_source, event_type};

fn event(event_type: &str, source: &str) -> Event {
    Event::builder("test", event_type, source).build()
}

fn counting(counter: &Arc<AtomicUsize>) -> Handler {
    let counter = Arc::clone(counter);
    sync_handler(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    })
}

async fn run_all(table: &ListenerTable, event: Event) {
    let event = Arc::new(event);
    for handler in table.matching(&event) {
        handler(Arc::clone(&event)).await;
    }
}

#[tokio::test]
async fn exact_match_only() {
    let table = ListenerTable::default();
    let hits = Arc::new(AtomicUsize::new(0));
    table.register("X", "Y", counting(&hits));

    run_all(&table, event("X", "Y")).await;
    run_all(&table, event("X", "Z")).await;
    run_all(&table, event("x", "Y")).await;

    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn wildcards_match_either_side() {
    let table = ListenerTable::default();
    let any_type = Arc::new(AtomicUsize::new(0));
    let any_source = Arc::new(AtomicUsize::new(0));
    let everything = Arc::new(AtomicUsize::new(0));
    table.register(event_type::WILDCARD, "Y", counting(&any_type));
    table.register("X", event_source::WILDCARD, counting(&any_source));
    table.register(
        event_type::WILDCARD,
        event_source::WILDCARD,
        counting(&everything),
    );

    run_all(&table, event("X", "Y")).await;
    run_all(&table, event("Q", "Y")).await;
    run_all(&table, event("X", "Q")).await;
    run_all(&table, event("Q", "Q")).await;

    assert_eq!(any_type.load(Ordering::SeqCst), 2);
    assert_eq!(any_source.load(Ordering::SeqCst), 2);
    assert_eq!(everything.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn handlers_run_in_registration_order() {
    let table = ListenerTable::default();
    let order = Arc::new(Mutex::new(Vec::new()));
    for i in 0..3 {
        let order = Arc::clone(&order);
        table.register(
            "X",
            "Y",
            async_handler(move |_| {
                let order = Arc::clone(&order);
                async move {
                    tokio::task::yield_now().await;
                    order.lock().unwrap().push(i);
                }
            }),
        );
    }

    run_all(&table, event("X", "Y")).await;

    assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    assert_eq!(table.len(), 3);
}
