//! Error types for the pulse instrumentation layer.

use thiserror::Error;

/// Errors surfaced by the diagnostic bus and the operation instrument.
///
/// Note that a wrapped operation failing while instrumentation is enabled is
/// NOT represented here: that failure is absorbed into an `Error` diagnostic
/// event and the caller receives `Ok(None)`. See
/// [`OperationInstrument::execute`](crate::instrument::OperationInstrument::execute).
#[derive(Debug, Error)]
pub enum DiagnosticError {
    /// Rejected synchronously, before any telemetry is emitted.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Cancellation was signaled before the operation started. The operation
    /// never ran and no events were published.
    #[error("Operation cancelled before start")]
    Cancelled,

    /// The feature gate could not answer. Propagated rather than assuming a
    /// value in either direction.
    #[error("Feature gate check failed: {0}")]
    Gate(#[source] anyhow::Error),

    /// Operation failure surfaced on the gate-disabled path, where the
    /// instrument is a transparent pass-through.
    #[error("Operation failed: {0}")]
    Operation(#[source] anyhow::Error),

    /// Configuration could not be loaded or parsed.
    #[error("Configuration error: {0}")]
    Config(String),
}
