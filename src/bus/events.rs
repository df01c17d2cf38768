//! Publish/subscribe hub for bus lifecycle events.

use std::sync::{Arc, Mutex, PoisonError};

use crate::bus::domain::{BusEvent, SubscriptionId};

/// Callback invoked for every published event.
pub type EventHandler = Arc<dyn Fn(&BusEvent) + Send + Sync>;

/// Registry of event handlers.
///
/// Handlers run on the publishing task after the bus has released its
/// state lock, in subscription order, so a handler may call back into the
/// bus.
#[derive(Default)]
pub struct EventHub {
    handlers: Mutex<Vec<(SubscriptionId, EventHandler)>>,
}

impl EventHub {
    /// Creates a hub with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` and returns its subscription handle.
    pub fn subscribe(&self, handler: impl Fn(&BusEvent) + Send + Sync + 'static) -> SubscriptionId {
        let id = SubscriptionId::new();
        self.lock().push((id, Arc::new(handler)));
        id
    }

    /// Removes a handler. Returns `false` when the handle was unknown.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.lock();
        let before = handlers.len();
        handlers.retain(|(registered, _)| *registered != id);
        handlers.len() != before
    }

    /// Delivers `event` to every current subscriber.
    pub fn publish(&self, event: &BusEvent) {
        let handlers: Vec<EventHandler> = self
            .lock()
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect();
        for handler in handlers {
            handler(event);
        }
    }

    /// Returns the number of subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` when nobody is subscribed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every subscriber.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(SubscriptionId, EventHandler)>> {
        self.handlers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for EventHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHub")
            .field("subscribers", &self.len())
            .finish()
    }
}
