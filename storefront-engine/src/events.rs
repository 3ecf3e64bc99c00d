//! Event plumbing for the storefront state layer
//!
//! Two independent channels, both owned by the [`Store`](crate::store::Store):
//!
//! 1. An in-process publish/subscribe registry ([`EventBus`]) with typed
//!    payloads. Listeners fire in registration order; emission iterates a
//!    snapshot of the listener list, and each listener is re-checked
//!    against the live registry immediately before it runs, so a listener
//!    removed mid-emission does not fire.
//! 2. A cross-handle change feed (`tokio::sync::broadcast`), one
//!    [`StorageChange`] per successful write or removal. Components that
//!    cache store-backed state hold a receiver and refresh their view when
//!    a key they care about changes.

use parking_lot::Mutex;
use serde_json::Value;
use shared::models::LineItem;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Named events on the in-process bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// A store slot was written or removed
    StorageUpdate,
    /// The whole store was reset to defaults
    StorageClear,
    /// The cart changed through a cart-engine operation
    CartUpdate,
}

/// Typed event payloads
#[derive(Debug, Clone)]
pub enum EventPayload {
    StorageUpdate {
        key: String,
        /// New value; `None` for a removal
        value: Option<Value>,
    },
    StorageClear,
    CartUpdate {
        items: Vec<LineItem>,
        count: u32,
        subtotal: i64,
    },
}

/// Cross-handle change notification, one per successful write/remove
#[derive(Debug, Clone)]
pub struct StorageChange {
    pub key: String,
    /// New value; `None` for a removal
    pub value: Option<Value>,
}

/// Handle for unregistering a listener
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerId(u64);

type Listener = Arc<dyn Fn(&EventPayload) + Send + Sync>;

/// In-process observer registry with typed payloads
pub struct EventBus {
    next_id: AtomicU64,
    listeners: Mutex<HashMap<Topic, Vec<(ListenerId, Listener)>>>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("next_id", &self.next_id)
            .finish()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            listeners: Mutex::new(HashMap::new()),
        }
    }

    /// Register a listener for a topic; fires in registration order
    pub fn on<F>(&self, topic: Topic, listener: F) -> ListenerId
    where
        F: Fn(&EventPayload) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .lock()
            .entry(topic)
            .or_default()
            .push((id, Arc::new(listener)));
        id
    }

    /// Unregister a listener; unknown ids are a no-op
    pub fn off(&self, topic: Topic, id: ListenerId) {
        if let Some(entries) = self.listeners.lock().get_mut(&topic) {
            entries.retain(|(listener_id, _)| *listener_id != id);
        }
    }

    /// Deliver a payload to every listener registered for the topic.
    ///
    /// The registry lock is not held while a listener runs, so listeners
    /// may register or unregister others (or themselves).
    pub fn emit(&self, topic: Topic, payload: &EventPayload) {
        let snapshot: Vec<(ListenerId, Listener)> = self
            .listeners
            .lock()
            .get(&topic)
            .map(|entries| entries.clone())
            .unwrap_or_default();

        for (id, listener) in snapshot {
            let still_registered = self
                .listeners
                .lock()
                .get(&topic)
                .is_some_and(|entries| entries.iter().any(|(lid, _)| *lid == id));
            if still_registered {
                listener(payload);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex as PlMutex;

    #[test]
    fn test_listeners_fire_in_registration_order() {
        let bus = EventBus::new();
        let seen = Arc::new(PlMutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let seen = seen.clone();
            bus.on(Topic::StorageClear, move |_| seen.lock().push(tag));
        }

        bus.emit(Topic::StorageClear, &EventPayload::StorageClear);
        assert_eq!(*seen.lock(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_off_removes_listener() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicU64::new(0));

        let counter = count.clone();
        let id = bus.on(Topic::StorageClear, move |_| {
            counter.fetch_add(1, Ordering::Relaxed);
        });

        bus.emit(Topic::StorageClear, &EventPayload::StorageClear);
        bus.off(Topic::StorageClear, id);
        bus.emit(Topic::StorageClear, &EventPayload::StorageClear);

        assert_eq!(count.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_listener_removed_during_emission_does_not_fire() {
        let bus = Arc::new(EventBus::new());
        let fired = Arc::new(AtomicU64::new(0));

        // Second listener's id, registered below; the first listener
        // removes it before it has fired.
        let second_id = Arc::new(PlMutex::new(None));

        let bus_for_first = bus.clone();
        let second_for_first = second_id.clone();
        bus.on(Topic::StorageClear, move |_| {
            if let Some(id) = *second_for_first.lock() {
                bus_for_first.off(Topic::StorageClear, id);
            }
        });

        let fired_counter = fired.clone();
        let id = bus.on(Topic::StorageClear, move |_| {
            fired_counter.fetch_add(1, Ordering::Relaxed);
        });
        *second_id.lock() = Some(id);

        bus.emit(Topic::StorageClear, &EventPayload::StorageClear);
        assert_eq!(fired.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_topics_are_independent() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicU64::new(0));

        let counter = count.clone();
        bus.on(Topic::CartUpdate, move |_| {
            counter.fetch_add(1, Ordering::Relaxed);
        });

        bus.emit(Topic::StorageClear, &EventPayload::StorageClear);
        assert_eq!(count.load(Ordering::Relaxed), 0);
    }
}
