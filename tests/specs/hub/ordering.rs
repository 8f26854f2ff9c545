//! Every listener observes the same events in the same order

use crate::prelude::*;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use sy_core::Event;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_producers_yield_one_order_for_all_listeners() {
    let hub = hub().await;
    let (first, mut first_rx) = recorder("com.acme.first", X, Y);
    let (second, mut second_rx) = recorder("com.acme.second", X, Y);
    hub.register_extension(first).await.unwrap();
    hub.register_extension(second).await.unwrap();

    let producers: Vec<_> = (0..4)
        .map(|p| {
            let hub = hub.clone();
            tokio::spawn(async move {
                for i in 0..25 {
                    hub.dispatch(Event::builder(format!("p{p}-{i}"), X, Y).build())
                        .unwrap();
                }
            })
        })
        .collect();
    for producer in producers {
        producer.await.unwrap();
    }

    let mut seen_first = Vec::new();
    let mut seen_second = Vec::new();
    for _ in 0..100 {
        seen_first.push(next(&mut first_rx).await.sequence());
        seen_second.push(next(&mut second_rx).await.sequence());
    }
    assert_eq!(seen_first, seen_second);
    assert!(seen_first.windows(2).all(|w| w[0] < w[1]));
}

/// Listener that records its label and fails loudly on re-entry
fn guarded(
    label: &'static str,
    busy: Arc<AtomicBool>,
    overlaps: Arc<AtomicUsize>,
    log: Arc<Mutex<Vec<&'static str>>>,
) -> impl Fn(&Event) + Send + Sync + 'static {
    move |_event| {
        if busy.swap(true, Ordering::SeqCst) {
            overlaps.fetch_add(1, Ordering::SeqCst);
        }
        log.lock().unwrap().push(label);
        std::thread::sleep(Duration::from_millis(2));
        busy.store(false, Ordering::SeqCst);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn overlapping_listeners_run_in_registration_order_per_component() {
    let hub = hub().await;
    let overlaps = Arc::new(AtomicUsize::new(0));
    let logs: Vec<Arc<Mutex<Vec<&'static str>>>> =
        (0..2).map(|_| Arc::new(Mutex::new(Vec::new()))).collect();

    for (index, name) in ["com.acme.a", "com.acme.b"].into_iter().enumerate() {
        let busy = Arc::new(AtomicBool::new(false));
        let overlaps = Arc::clone(&overlaps);
        let log = Arc::clone(&logs[index]);
        let component = Component::new(name, move |api| {
            api.register_listener(
                X,
                Y,
                guarded("first", busy.clone(), overlaps.clone(), log.clone()),
            )?;
            api.register_listener(
                X,
                Y,
                guarded("second", busy.clone(), overlaps.clone(), log.clone()),
            )?;
            Ok(())
        });
        hub.register_extension(component).await.unwrap();
    }

    for i in 0..5 {
        hub.dispatch(Event::builder(format!("e{i}"), X, Y).build())
            .unwrap();
    }
    // Shutdown delivers everything already dispatched before unregistering
    hub.shutdown().await;

    for log in &logs {
        let expected: Vec<&str> = (0..5).flat_map(|_| ["first", "second"]).collect();
        assert_eq!(*log.lock().unwrap(), expected);
    }
    assert_eq!(overlaps.load(Ordering::SeqCst), 0);
}
