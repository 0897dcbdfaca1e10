//! Event relay implementation
//!
//! Fans agent notifications out to registered listeners, independent of the
//! command queue's progress.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};

use futures::StreamExt;
use serde_json::Value;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, warn};

use super::types::PageEvent;
use crate::proc::Notification;

/// Listener callback; invoked with the notification payload
pub type Callback = Arc<dyn Fn(Value) + Send + Sync + 'static>;

/// One registration for an event name
struct ListenerEntry {
    callback: Callback,
    once: bool,
}

/// Event relay
///
/// Keeps listeners per event name, in registration order. Any name can be
/// subscribed; only names in the agent's notification set ever fire.
#[derive(Default)]
pub struct EventRelay {
    listeners: Mutex<HashMap<String, Vec<ListenerEntry>>>,
}

/// Exact-match identity: same allocation, vtable ignored
fn same_callback(a: &Callback, b: &Callback) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

impl EventRelay {
    /// Create an empty relay
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a persistent listener
    pub fn on<E: AsRef<str>>(&self, event: E, callback: Callback) {
        self.insert(event.as_ref(), callback, false);
    }

    /// Register a listener removed after its first invocation
    pub fn once<E: AsRef<str>>(&self, event: E, callback: Callback) {
        self.insert(event.as_ref(), callback, true);
    }

    fn insert(&self, event: &str, callback: Callback, once: bool) {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        listeners
            .entry(event.to_string())
            .or_default()
            .push(ListenerEntry { callback, once });
    }

    /// Remove one specific registration, leaving other callbacks for the
    /// same event untouched
    pub fn remove_listener<E: AsRef<str>>(&self, event: E, callback: &Callback) {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(entries) = listeners.get_mut(event.as_ref()) {
            entries.retain(|entry| !same_callback(&entry.callback, callback));
            if entries.is_empty() {
                listeners.remove(event.as_ref());
            }
        }
    }

    /// Number of live registrations for an event
    pub fn listener_count<E: AsRef<str>>(&self, event: E) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(event.as_ref())
            .map(|entries| entries.len())
            .unwrap_or(0)
    }

    /// Invoke every currently-registered callback for the event, in
    /// registration order; one-shot entries are unregistered first so a
    /// callback that re-dispatches cannot fire them twice
    pub fn dispatch(&self, event: &str, params: Value) {
        let batch: Vec<Callback> = {
            let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
            let Some(entries) = listeners.get_mut(event) else {
                return;
            };
            let batch = entries
                .iter()
                .map(|entry| Arc::clone(&entry.callback))
                .collect();
            entries.retain(|entry| !entry.once);
            if entries.is_empty() {
                listeners.remove(event);
            }
            batch
        };

        for callback in batch {
            // A panicking subscriber must not interrupt the others
            let outcome =
                std::panic::catch_unwind(AssertUnwindSafe(|| callback(params.clone())));
            if outcome.is_err() {
                warn!("Listener for '{}' panicked, continuing dispatch", event);
            }
        }
    }

    /// Drain a transport's notification stream into this relay
    ///
    /// Runs until the transport closes its broadcast channel. Dispatch
    /// happens on this task, never blocking the command queue.
    pub fn spawn_pump(
        self: Arc<Self>,
        notifications: broadcast::Receiver<Notification>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut stream = BroadcastStream::new(notifications);
            while let Some(item) = stream.next().await {
                match item {
                    Ok(notification) => {
                        if PageEvent::from_name(&notification.event).is_none() {
                            debug!("Dropping unknown notification '{}'", notification.event);
                            continue;
                        }
                        self.dispatch(&notification.event, notification.params);
                    }
                    Err(BroadcastStreamRecvError::Lagged(n)) => {
                        warn!("Event relay lagged behind by {} notifications", n);
                    }
                }
            }
            debug!("Notification stream closed, relay pump exiting");
        })
    }
}

impl std::fmt::Debug for EventRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("EventRelay")
            .field("events", &listeners.len())
            .finish()
    }
}
