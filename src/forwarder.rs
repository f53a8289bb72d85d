//! Long-lived subscriber that forwards allowlisted channels to a structured
//! log sink.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;

use crate::bus::payload::{now_rfc3339, thread_label, EventPayload};
use crate::bus::{ChannelEvent, ChannelRegistry, EventChannel, Observer, Subscription};

/// Structured record handed to a sink for every forwarded event.
#[derive(Debug, Clone, Serialize)]
pub struct EventRecord {
    pub channel: String,
    pub key: String,
    pub payload: EventPayload,
    /// Wall-clock receipt time, RFC 3339 with milliseconds.
    pub received_at: String,
    /// Identity of the thread the event was delivered on.
    pub thread: String,
}

impl EventRecord {
    fn capture(channel: &str, event: &ChannelEvent) -> Self {
        Self {
            channel: channel.to_string(),
            key: event.key.clone(),
            payload: event.payload.clone(),
            received_at: now_rfc3339(),
            thread: thread_label(),
        }
    }
}

/// Best-effort consumer of forwarded records. Implementations must not fail
/// loudly; there is no return value to propagate.
pub trait LogSink: Send + Sync {
    fn record(&self, record: &EventRecord);
}

/// Sink rendering records as `tracing` debug events. `Record` payloads are
/// expanded entry by entry, `Failure` payloads log message and backtrace as
/// separate fields.
pub struct TracingSink;

impl LogSink for TracingSink {
    fn record(&self, record: &EventRecord) {
        debug!(
            channel = %record.channel,
            key = %record.key,
            received_at = %record.received_at,
            thread = %record.thread,
            "diagnostic event"
        );
        match &record.payload {
            EventPayload::Empty => {}
            EventPayload::Number(value) => {
                debug!(channel = %record.channel, key = %record.key, value, "payload value");
            }
            EventPayload::Text(text) => {
                debug!(channel = %record.channel, key = %record.key, text = %text, "payload text");
            }
            EventPayload::Record(map) => {
                for (field, value) in map {
                    debug!(
                        channel = %record.channel,
                        key = %record.key,
                        field = %field,
                        value = %value,
                        "payload field"
                    );
                }
            }
            EventPayload::Failure(info) => {
                debug!(
                    channel = %record.channel,
                    key = %record.key,
                    message = %info.message,
                    backtrace = info.backtrace.as_deref().unwrap_or(""),
                    "payload failure"
                );
            }
        }
    }
}

/// Forwards every event on an allowlisted set of channels to a sink.
///
/// `start` attaches a registry watcher, so channels created before or after
/// startup are both covered. Sink faults stay inside the channel's fault
/// isolation and never reach producers.
pub struct ListenerService {
    registry: Arc<ChannelRegistry>,
    allowlist: Vec<String>,
    sink: Arc<dyn LogSink>,
    started: AtomicBool,
    active: AtomicBool,
    subscriptions: Mutex<Vec<Subscription>>,
}

impl ListenerService {
    pub fn new(
        registry: Arc<ChannelRegistry>,
        allowlist: Vec<String>,
        sink: Arc<dyn LogSink>,
    ) -> Arc<Self> {
        Arc::new(Self {
            registry,
            allowlist,
            sink,
            started: AtomicBool::new(false),
            active: AtomicBool::new(false),
            subscriptions: Mutex::new(Vec::new()),
        })
    }

    /// Subscribe to the allowlisted channels, existing and future. Idempotent;
    /// only the first call does anything.
    pub fn start(self: &Arc<Self>) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        self.active.store(true, Ordering::SeqCst);
        let weak = Arc::downgrade(self);
        self.registry
            .watch_channels(Observer::new(move |channel: &Arc<EventChannel>| {
                if let Some(service) = Weak::upgrade(&weak) {
                    service.attach(channel);
                }
            }));
    }

    /// Detach from all channels and stop forwarding. Idempotent. A stopped
    /// service does not resume; construct a new one instead.
    pub fn stop(&self) {
        self.active.store(false, Ordering::SeqCst);
        for subscription in self.subscriptions.lock().drain(..) {
            subscription.detach();
        }
    }

    fn attach(&self, channel: &Arc<EventChannel>) {
        if !self.active.load(Ordering::SeqCst) {
            return;
        }
        if !self.allowlist.iter().any(|name| name == channel.name()) {
            return;
        }
        let sink = Arc::clone(&self.sink);
        let channel_name = channel.name().to_string();
        let subscription = channel.subscribe(Observer::new(move |event: &ChannelEvent| {
            let record = EventRecord::capture(&channel_name, event);
            sink.record(&record);
        }));
        self.subscriptions.lock().push(subscription);
    }
}
