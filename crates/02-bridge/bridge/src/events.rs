//! Persistent multi-fire event subscriptions.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::{debug, error, warn};
use parking_lot::Mutex;
use protocol::{decode, Envelope};
use smallvec::SmallVec;

/// Identifies one listener among siblings on the same event key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type ListenerFn = Box<dyn FnMut(&Envelope) + Send>;

struct ListenerSlot {
    id: ListenerId,
    callback: Mutex<ListenerFn>,
}

type SlotSet = SmallVec<[Arc<ListenerSlot>; 2]>;

/// Outcome of fanning one raw event out to its subscribers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventDelivery {
    /// The decoded payload reached this many listeners.
    Invoked(usize),
    /// The payload failed to decode; no listener ran.
    Malformed,
    /// Nothing is subscribed under this key.
    NoListeners,
}

/// Multicast registry of persistent event listeners.
///
/// Lifecycle is caller-driven: subscribe on activation, remove on
/// deactivation. There is no implicit expiry, and a key may fire any number
/// of times between the two.
pub struct EventRegistry {
    listeners: Mutex<HashMap<String, SlotSet>>,
    next_id: AtomicU64,
}

impl EventRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            listeners: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Appends `listener` to the multicast set for `event_key`.
    ///
    /// Always succeeds; the returned id distinguishes this listener from its
    /// siblings for later removal.
    pub fn add(
        &self,
        event_key: &str,
        listener: impl FnMut(&Envelope) + Send + 'static,
    ) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let slot = Arc::new(ListenerSlot {
            id,
            callback: Mutex::new(Box::new(listener)),
        });
        self.listeners
            .lock()
            .entry(event_key.to_owned())
            .or_default()
            .push(slot);
        id
    }

    /// Removes exactly the listener registered under `id`; idempotent.
    pub fn remove(&self, event_key: &str, id: ListenerId) {
        let mut listeners = self.listeners.lock();
        if let Some(slots) = listeners.get_mut(event_key) {
            slots.retain(|slot| slot.id != id);
            if slots.is_empty() {
                listeners.remove(event_key);
            }
        }
    }

    /// Drops every listener bound to `event_key`.
    pub fn remove_all(&self, event_key: &str) {
        self.listeners.lock().remove(event_key);
    }

    /// Whether any listener is currently bound to `event_key`.
    pub fn has_listeners(&self, event_key: &str) -> bool {
        self.listeners.lock().contains_key(event_key)
    }

    /// Decodes `raw_payload` once and invokes the listeners subscribed at
    /// the moment of delivery, in registration order.
    ///
    /// A decode failure drops the whole delivery. A panicking listener is
    /// contained so its siblings still run. The registry lock is not held
    /// while callbacks execute, so listeners may subscribe or remove freely;
    /// such changes take effect from the next delivery.
    pub fn deliver(&self, event_key: &str, raw_payload: &str) -> EventDelivery {
        let snapshot: SlotSet = match self.listeners.lock().get(event_key) {
            Some(slots) => slots.clone(),
            None => {
                debug!("no listeners for event key {event_key}");
                return EventDelivery::NoListeners;
            }
        };
        let envelope = match decode(raw_payload) {
            Ok(envelope) => envelope,
            Err(err) => {
                warn!("dropping event {event_key}: {err}");
                return EventDelivery::Malformed;
            }
        };

        let mut invoked = 0;
        for slot in snapshot {
            let mut callback = slot.callback.lock();
            if catch_unwind(AssertUnwindSafe(|| (*callback)(&envelope))).is_err() {
                error!("listener {:?} on event key {event_key} panicked", slot.id);
            }
            invoked += 1;
        }
        EventDelivery::Invoked(invoked)
    }
}

impl Default for EventRegistry {
    fn default() -> Self {
        Self::new()
    }
}
