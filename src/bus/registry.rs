//! Process-wide mapping from channel name to channel, with lazy creation and
//! a "new channel" watcher stream.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::warn;

use crate::bus::channel::EventChannel;
use crate::bus::observer::Observer;
use crate::error::DiagnosticError;

struct RegistryInner {
    by_name: HashMap<String, Arc<EventChannel>>,
    // Creation order, for deterministic replay to new watchers.
    created: Vec<Arc<EventChannel>>,
    watchers: Vec<Arc<Observer<Arc<EventChannel>>>>,
}

/// The single source of truth for every channel the process has created.
///
/// Not an ambient global: construct one and pass the `Arc` to every component
/// that needs it. Channels live for the lifetime of the registry; there is no
/// deletion.
pub struct ChannelRegistry {
    inner: Mutex<RegistryInner>,
}

impl ChannelRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(RegistryInner {
                by_name: HashMap::new(),
                created: Vec::new(),
                watchers: Vec::new(),
            }),
        })
    }

    /// Return the channel for `name`, creating and registering it if absent.
    /// Concurrent calls with the same name always resolve to one instance.
    /// Empty names are rejected before any state changes.
    pub fn get_or_create(&self, name: &str) -> Result<Arc<EventChannel>, DiagnosticError> {
        if name.trim().is_empty() {
            return Err(DiagnosticError::InvalidArgument(
                "channel name must not be empty".to_string(),
            ));
        }
        let mut inner = self.inner.lock();
        if let Some(existing) = inner.by_name.get(name) {
            return Ok(Arc::clone(existing));
        }
        let channel = EventChannel::new(name);
        inner
            .by_name
            .insert(name.to_string(), Arc::clone(&channel));
        inner.created.push(Arc::clone(&channel));
        // Notify under the lock: a watcher attached concurrently sees this
        // channel exactly once, via replay or via this notification.
        for watcher in &inner.watchers {
            notify_watcher(watcher, &channel);
        }
        Ok(channel)
    }

    /// Register a watcher for channel creation. The watcher is first replayed
    /// every channel that already exists (in creation order), then notified
    /// for each future creation, so a late-started subscriber misses nothing.
    ///
    /// Watcher callbacks run under the registry lock and must not call back
    /// into the registry. Subscribing to the presented channel is fine.
    pub fn watch_channels(&self, watcher: Arc<Observer<Arc<EventChannel>>>) {
        let mut inner = self.inner.lock();
        for channel in &inner.created {
            notify_watcher(&watcher, channel);
        }
        inner.watchers.push(watcher);
    }

    /// Number of channels created so far.
    pub fn len(&self) -> usize {
        self.inner.lock().created.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn notify_watcher(watcher: &Arc<Observer<Arc<EventChannel>>>, channel: &Arc<EventChannel>) {
    let outcome = catch_unwind(AssertUnwindSafe(|| watcher.notify(channel)));
    if outcome.is_err() {
        warn!(channel = %channel.name(), "registry watcher panicked");
    }
}
