//! A named, independent pub/sub stream of diagnostic events.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tracing::warn;

use crate::bus::observer::Observer;
use crate::bus::payload::EventPayload;

/// One event as delivered to channel observers.
#[derive(Debug, Clone)]
pub struct ChannelEvent {
    pub key: String,
    pub payload: EventPayload,
}

/// A named event stream owning its subscriber set.
///
/// Delivery is synchronous, on the publishing thread, in attachment order:
/// within one producer invocation the causal order of its events is exactly
/// the order subscribers see them. A subscriber attached mid-stream sees
/// events published from that point forward only.
pub struct EventChannel {
    name: String,
    next_id: AtomicU64,
    subscribers: RwLock<Vec<(u64, Arc<Observer<ChannelEvent>>)>>,
}

impl EventChannel {
    pub(crate) fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            next_id: AtomicU64::new(1),
            subscribers: RwLock::new(Vec::new()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// True if at least one current subscriber would act on `key`. Producers
    /// consult this before constructing payloads.
    pub fn is_observed(&self, key: &str) -> bool {
        self.subscribers
            .read()
            .iter()
            .any(|(_, observer)| observer.wants(key))
    }

    /// Attach an observer. It receives every subsequent event it wants until
    /// the returned handle is detached; dropping the handle does not detach.
    pub fn subscribe(self: &Arc<Self>, observer: Arc<Observer<ChannelEvent>>) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers.write().push((id, observer));
        Subscription {
            channel: Arc::downgrade(self),
            id,
        }
    }

    /// Deliver `(key, payload)` to every currently-attached subscriber, in
    /// attachment order, on the calling thread. A panicking subscriber is
    /// logged and skipped; it never disturbs later subscribers or the
    /// publisher.
    pub fn publish(&self, key: impl Into<String>, payload: EventPayload) {
        let event = ChannelEvent {
            key: key.into(),
            payload,
        };
        // Snapshot so subscriber callbacks run without holding the lock.
        let subscribers: Vec<_> = self
            .subscribers
            .read()
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();
        for observer in subscribers {
            if !observer.wants(&event.key) {
                continue;
            }
            let outcome = catch_unwind(AssertUnwindSafe(|| observer.notify(&event)));
            if outcome.is_err() {
                warn!(
                    channel = %self.name,
                    key = %event.key,
                    "subscriber panicked while handling event"
                );
            }
        }
    }

    fn detach(&self, id: u64) {
        self.subscribers
            .write()
            .retain(|(subscriber_id, _)| *subscriber_id != id);
    }
}

/// Live relationship between one observer and one channel.
pub struct Subscription {
    channel: Weak<EventChannel>,
    id: u64,
}

impl Subscription {
    /// Stop future delivery to the observer. Already-dispatched events are
    /// unaffected. Safe to call more than once.
    pub fn detach(&self) {
        if let Some(channel) = self.channel.upgrade() {
            channel.detach(self.id);
        }
    }
}
