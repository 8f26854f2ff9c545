//! Shared helpers for the scenario suite

use std::sync::{Arc, Mutex};
use std::time::Duration;
use sy_core::{Event, EventData};
use sy_hub::{async_trait, EventHub, Extension, ExtensionApi, ExtensionError, HubConfig};
use tokio::sync::mpsc;

pub const X: &str = "com.acme.eventType.x";
pub const Y: &str = "com.acme.eventSource.y";

type Setup = Box<dyn Fn(&ExtensionApi) -> Result<(), ExtensionError> + Send + Sync>;

/// Extension whose registration is a closure; keeps its api for the test
pub struct Component {
    name: String,
    setup: Setup,
    api: Mutex<Option<ExtensionApi>>,
}

impl Component {
    pub fn new<F>(name: &str, setup: F) -> Arc<Self>
    where
        F: Fn(&ExtensionApi) -> Result<(), ExtensionError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            name: name.to_string(),
            setup: Box::new(setup),
            api: Mutex::new(None),
        })
    }

    pub fn api(&self) -> ExtensionApi {
        self.api.lock().unwrap().clone().expect("component not registered")
    }
}

#[async_trait]
impl Extension for Component {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    async fn on_registered(&self, api: &ExtensionApi) -> Result<(), ExtensionError> {
        *self.api.lock().unwrap() = Some(api.clone());
        (self.setup)(api)
    }
}

/// Component forwarding every `(event_type, source)` event to the receiver
pub fn recorder(
    name: &str,
    event_type: &'static str,
    source: &'static str,
) -> (Arc<Component>, mpsc::UnboundedReceiver<Arc<Event>>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let component = Component::new(name, move |api| {
        let tx = tx.clone();
        api.register_listener(event_type, source, move |event| {
            let _ = tx.send(Arc::new(event.clone()));
        })?;
        Ok(())
    });
    (component, rx)
}

pub async fn hub() -> EventHub {
    EventHub::start(HubConfig::default()).await.unwrap()
}

pub async fn next(rx: &mut mpsc::UnboundedReceiver<Arc<Event>>) -> Arc<Event> {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for an event")
        .expect("recorder channel closed")
}

pub fn data(value: serde_json::Value) -> EventData {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}
