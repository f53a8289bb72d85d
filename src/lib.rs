//! Pulse: feature-gated operation instrumentation over an in-process
//! diagnostic bus.
//!
//! Asynchronous operations wrapped in an
//! [`OperationInstrument`](instrument::OperationInstrument) report their
//! lifecycle (Start, Stop, Error, ElapsedMs) on named channels managed by a
//! [`ChannelRegistry`](bus::ChannelRegistry), without knowing who is
//! listening. A [`ListenerService`](forwarder::ListenerService) forwards
//! allowlisted channels to a structured log sink.
//!
//! Instrumentation adds real overhead; it is skipped entirely unless the
//! [`FeatureGate`](gate::FeatureGate) says otherwise, and per-key observed
//! checks avoid building payloads nobody reads.
//!
//! Note the deliberate absorb-and-report contract: with the gate enabled, a
//! wrapped operation's failure becomes an `Error` diagnostic event and the
//! caller gets `Ok(None)` instead of the error. See
//! [`OperationInstrument::execute`](instrument::OperationInstrument::execute).

pub mod bus;
pub mod config;
pub mod error;
pub mod forwarder;
pub mod gate;
pub mod instrument;
pub mod logging;
