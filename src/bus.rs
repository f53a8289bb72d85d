//! Diagnostic bus: named channels, observers, payloads, and the registry.

pub mod channel;
pub mod observer;
pub mod payload;
pub mod registry;

pub use channel::{ChannelEvent, EventChannel, Subscription};
pub use observer::Observer;
pub use payload::{now_rfc3339, thread_label, EventPayload, FailureInfo};
pub use registry::ChannelRegistry;
