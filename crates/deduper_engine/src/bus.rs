//! Runtime messaging between the control surface and the content script.
//!
//! [`RuntimeChannel`] plays the extension runtime: anything sent on it reaches
//! every registered [`Listener`]. The control surface reaches the content
//! script through a [`TabMessenger`]; the content script answers with
//! progress and result messages on the runtime channel.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use deduper_core::DiscoveredItem;
use deduper_logging::{deduper_debug, deduper_error, deduper_info, deduper_trace};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::deletion::{delete_item, DeletionReceipt};
use crate::discovery::{discover_items, DiscoverySettings};
use crate::page::Page;
use crate::protocol::{
    DeletePhoto, DeletePhotoResult, DiscoverPhotosResult, HealthCheckResult, Message, Operation,
};
use crate::wait::DEFAULT_WAIT_TIMEOUT;
use crate::{EngineEvent, ProgressSink};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    #[error("Could not establish connection. Receiving end does not exist.")]
    NoReceiver,
    #[error("a {0:?} request is already in flight")]
    AlreadyInFlight(Operation),
    #[error("runtime channel closed before a result arrived")]
    Disconnected,
    #[error("{0}")]
    Failed(String),
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Broadcast medium shared by every execution context.
#[derive(Debug, Clone, Default)]
pub struct RuntimeChannel {
    listeners: Arc<Mutex<Vec<mpsc::UnboundedSender<Value>>>>,
}

impl RuntimeChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener; dropping it unregisters.
    pub fn add_listener(&self) -> Listener {
        let (tx, rx) = mpsc::unbounded_channel();
        lock(&self.listeners).push(tx);
        Listener { rx }
    }

    pub fn send_message(&self, message: &Message) {
        match message.to_wire() {
            Ok(wire) => self.broadcast(wire),
            Err(err) => deduper_error!("Failed to encode {:?}: {}", message.operation(), err),
        }
    }

    /// Delivers a raw value to every live listener, tagged or not.
    pub fn broadcast(&self, raw: Value) {
        lock(&self.listeners).retain(|tx| tx.send(raw.clone()).is_ok());
    }

    pub fn listener_count(&self) -> usize {
        let mut listeners = lock(&self.listeners);
        listeners.retain(|tx| !tx.is_closed());
        listeners.len()
    }
}

#[derive(Debug)]
pub struct Listener {
    rx: mpsc::UnboundedReceiver<Value>,
}

impl Listener {
    /// Next message carrying our origin tag; foreign traffic is skipped.
    pub async fn next_message(&mut self) -> Option<Message> {
        loop {
            let raw = self.rx.recv().await?;
            if let Some(message) = Message::from_wire(&raw) {
                return Some(message);
            }
            deduper_trace!("listener skipped foreign message");
        }
    }
}

/// Delivery of a request to the content script of the active tab.
pub trait TabMessenger: Send + Sync {
    fn send_to_tab(&self, message: &Message) -> Result<(), BusError>;

    /// URL of the active tab, if there is one.
    fn active_url(&self) -> Option<String>;
}

#[derive(Debug, Clone)]
pub struct ContentSettings {
    pub discovery: DiscoverySettings,
    pub wait_timeout: Duration,
    pub version: String,
}

impl Default for ContentSettings {
    fn default() -> Self {
        Self {
            discovery: DiscoverySettings::default(),
            wait_timeout: DEFAULT_WAIT_TIMEOUT,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Content-script side: runs operations against its page and reports on the runtime channel.
pub struct ContentScript {
    page: Arc<dyn Page>,
    runtime: RuntimeChannel,
    settings: ContentSettings,
}

impl ContentScript {
    pub fn new(page: Arc<dyn Page>, runtime: RuntimeChannel, settings: ContentSettings) -> Arc<Self> {
        Arc::new(Self {
            page,
            runtime,
            settings,
        })
    }

    pub fn page(&self) -> &dyn Page {
        self.page.as_ref()
    }

    /// Message entry point. Long operations are spawned on the current runtime;
    /// returns whether the message was one this script handles.
    pub fn on_message(self: &Arc<Self>, raw: &Value) -> bool {
        let Some(message) = Message::from_wire(raw) else {
            return false;
        };
        match message {
            Message::HealthCheck => {
                self.runtime
                    .send_message(&Message::HealthCheckResult(HealthCheckResult {
                        success: true,
                        version: self.settings.version.clone(),
                    }));
            }
            Message::DiscoverPhotos => {
                let script = Arc::clone(self);
                tokio::spawn(async move { script.handle_discover().await });
            }
            Message::DeletePhoto(DeletePhoto { media_item_id }) => {
                let script = Arc::clone(self);
                tokio::spawn(async move { script.handle_delete(media_item_id).await });
            }
            other => {
                deduper_trace!("content script ignores {:?}", other.kind());
                return false;
            }
        }
        true
    }

    pub async fn handle_discover(&self) {
        deduper_info!("Starting photo discovery...");
        let sink = RuntimeProgressSink {
            runtime: self.runtime.clone(),
        };
        let outcome = discover_items(self.page.as_ref(), &self.settings.discovery, &sink).await;
        match &outcome {
            Ok(photos) => deduper_info!("Discovered {} photos", photos.len()),
            Err(err) => deduper_error!("Error during photo discovery: {}", err),
        }
        self.runtime
            .send_message(&Message::DiscoverPhotosResult(DiscoverPhotosResult::from_outcome(
                outcome,
            )));
    }

    pub async fn handle_delete(&self, media_item_id: String) {
        let outcome =
            delete_item(self.page.as_ref(), &media_item_id, self.settings.wait_timeout).await;
        self.runtime
            .send_message(&Message::DeletePhotoResult(DeletePhotoResult::from_outcome(
                outcome,
            )));
    }
}

/// Forwards discovery progress onto the runtime channel.
struct RuntimeProgressSink {
    runtime: RuntimeChannel,
}

impl ProgressSink for RuntimeProgressSink {
    fn emit(&self, event: EngineEvent) {
        if let EngineEvent::DiscoveryProgress(progress) = event {
            self.runtime
                .send_message(&Message::DiscoverPhotosProgress(progress));
        }
    }
}

/// A tab in the same process; detaching it simulates a tab without a content script.
#[derive(Default)]
pub struct InProcessTab {
    content: Mutex<Option<Arc<ContentScript>>>,
}

impl InProcessTab {
    pub fn new(content: Arc<ContentScript>) -> Self {
        Self {
            content: Mutex::new(Some(content)),
        }
    }

    pub fn detach(&self) {
        lock(&self.content).take();
    }
}

impl TabMessenger for InProcessTab {
    fn send_to_tab(&self, message: &Message) -> Result<(), BusError> {
        let content = lock(&self.content).clone().ok_or(BusError::NoReceiver)?;
        let wire = message
            .to_wire()
            .map_err(|err| BusError::Failed(err.to_string()))?;
        content.on_message(&wire);
        Ok(())
    }

    fn active_url(&self) -> Option<String> {
        lock(&self.content)
            .as_ref()
            .map(|content| content.page().location())
    }
}

/// Control-surface side of the bus.
///
/// The wire format has no correlation id, so a second request for an
/// operation that is still running is refused instead of sharing replies.
#[derive(Clone)]
pub struct BusClient {
    runtime: RuntimeChannel,
    tab: Arc<dyn TabMessenger>,
    in_flight: Arc<Mutex<HashSet<Operation>>>,
}

struct InFlight {
    operations: Arc<Mutex<HashSet<Operation>>>,
    operation: Operation,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        lock(&self.operations).remove(&self.operation);
    }
}

impl BusClient {
    pub fn new(runtime: RuntimeChannel, tab: Arc<dyn TabMessenger>) -> Self {
        Self {
            runtime,
            tab,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn active_url(&self) -> Option<String> {
        self.tab.active_url()
    }

    fn claim(&self, operation: Operation) -> Result<InFlight, BusError> {
        if !lock(&self.in_flight).insert(operation) {
            return Err(BusError::AlreadyInFlight(operation));
        }
        Ok(InFlight {
            operations: Arc::clone(&self.in_flight),
            operation,
        })
    }

    /// Registers the invocation's listener, then delivers the request.
    fn request(&self, message: &Message) -> Result<(InFlight, Listener), BusError> {
        let guard = self.claim(message.operation())?;
        let listener = self.runtime.add_listener();
        // On failure the listener is dropped here, unregistering it.
        self.tab.send_to_tab(message)?;
        deduper_debug!("sent {:?} request", message.operation());
        Ok((guard, listener))
    }

    pub async fn discover(&self, sink: &dyn ProgressSink) -> Result<Vec<DiscoveredItem>, BusError> {
        let (_guard, mut listener) = self.request(&Message::DiscoverPhotos)?;
        while let Some(message) = listener.next_message().await {
            match message {
                Message::DiscoverPhotosProgress(progress) => {
                    sink.emit(EngineEvent::DiscoveryProgress(progress))
                }
                Message::DiscoverPhotosResult(result) => {
                    return result.into_result().map_err(BusError::Failed)
                }
                _ => {}
            }
        }
        Err(BusError::Disconnected)
    }

    pub async fn delete_photo(&self, media_item_id: &str) -> Result<DeletionReceipt, BusError> {
        let request = Message::DeletePhoto(DeletePhoto {
            media_item_id: media_item_id.to_string(),
        });
        let (_guard, mut listener) = self.request(&request)?;
        while let Some(message) = listener.next_message().await {
            if let Message::DeletePhotoResult(result) = message {
                if result.media_item_id == media_item_id {
                    return result.into_result().map_err(BusError::Failed);
                }
            }
        }
        Err(BusError::Disconnected)
    }

    /// Returns the content script's version.
    pub async fn health_check(&self) -> Result<String, BusError> {
        let (_guard, mut listener) = self.request(&Message::HealthCheck)?;
        while let Some(message) = listener.next_message().await {
            if let Message::HealthCheckResult(result) = message {
                return Ok(result.version);
            }
        }
        Err(BusError::Disconnected)
    }
}
