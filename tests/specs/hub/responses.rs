//! Response correlation with deadlines

use crate::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use sy_core::{event_source, Event};
use sy_hub::HubError;
use tokio::sync::mpsc;

/// Answers every request only after `delay`
fn slow_responder(delay: Duration) -> Arc<Component> {
    Component::new("com.acme.slow", move |api| {
        let replies = api.clone();
        api.register_async_listener(X, event_source::REQUEST_CONTENT, move |request| {
            let replies = replies.clone();
            async move {
                tokio::time::sleep(delay).await;
                let answer = Event::builder("answer", X, event_source::RESPONSE_CONTENT)
                    .response_to(&request)
                    .build();
                let _ = replies.dispatch(answer);
            }
        })?;
        Ok(())
    })
}

#[tokio::test(start_paused = true)]
async fn late_response_after_timeout_invokes_nothing() {
    let hub = hub().await;
    hub.register_extension(slow_responder(Duration::from_millis(1001)))
        .await
        .unwrap();
    let (watcher, mut answers) = recorder("com.acme.watcher", X, event_source::RESPONSE_CONTENT);
    hub.register_extension(watcher).await.unwrap();

    let (tx, mut outcomes) = mpsc::unbounded_channel();
    let request = Event::builder("ping", X, event_source::REQUEST_CONTENT).build();
    hub.dispatch_with_response_callback(request, Duration::from_millis(1000), move |outcome| {
        let _ = tx.send(outcome);
    })
    .unwrap();

    let first = outcomes.recv().await.unwrap();
    assert!(matches!(first, Err(HubError::Timeout(d)) if d == Duration::from_millis(1000)));

    // The answer still travels the hub, but nobody is waiting for it
    let answer = next(&mut answers).await;
    assert!(answer.response_to_id().is_some());
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(outcomes.recv().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn response_inside_deadline_wins() {
    let hub = hub().await;
    hub.register_extension(slow_responder(Duration::from_millis(999)))
        .await
        .unwrap();

    let request = Event::builder("ping", X, event_source::REQUEST_CONTENT).build();
    let id = request.unique_id().to_string();
    let response = hub
        .dispatch_with_response(request, Duration::from_millis(1000))
        .unwrap()
        .await
        .unwrap();

    assert_eq!(response.response_to_id(), Some(id.as_str()));
}
