//! Wraps asynchronous operations and publishes their lifecycle
//! (Start/Stop/Error/ElapsedMs) on the owner's diagnostic channel.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::bus::payload::{now_rfc3339, thread_label, EventPayload, FailureInfo};
use crate::bus::{ChannelRegistry, EventChannel};
use crate::error::DiagnosticError;
use crate::gate::{flags, FeatureGate};

/// Instrument for one owning component.
///
/// Events are published on the channel named after the owner, under keys
/// `"<owner>.<operation>.Start"`, `".Stop"`, `".Error"`, and `".ElapsedMs"`.
/// The owner name is an explicit string chosen at construction; by convention
/// it is the component's type name.
///
/// One instance may be invoked concurrently: every invocation carries its own
/// timer and key, the shared channel is the only common state.
pub struct OperationInstrument {
    owner: String,
    flag: String,
    channel: Arc<EventChannel>,
    gate: Arc<dyn FeatureGate>,
}

impl OperationInstrument {
    /// Instrument gated by the default diagnostics flag.
    pub fn new(
        registry: &ChannelRegistry,
        owner: impl Into<String>,
        gate: Arc<dyn FeatureGate>,
    ) -> Result<Self, DiagnosticError> {
        Self::with_flag(registry, owner, gate, flags::ENABLE_DIAGNOSTICS)
    }

    /// Instrument gated by a caller-chosen flag. Resolves (or creates) the
    /// owner's channel immediately; an empty owner name is rejected here.
    pub fn with_flag(
        registry: &ChannelRegistry,
        owner: impl Into<String>,
        gate: Arc<dyn FeatureGate>,
        flag: impl Into<String>,
    ) -> Result<Self, DiagnosticError> {
        let owner = owner.into();
        let channel = registry.get_or_create(&owner)?;
        Ok(Self {
            owner,
            flag: flag.into(),
            channel,
            gate,
        })
    }

    /// The channel this instrument publishes on.
    pub fn channel(&self) -> &Arc<EventChannel> {
        &self.channel
    }

    /// Run `operation` under instrumentation.
    ///
    /// CONTRACT — absorb and report: when the gate is enabled and the
    /// operation fails, the failure is converted into an `Error` diagnostic
    /// event and the caller receives `Ok(None)`, not the error. Callers that
    /// need the failure itself must use the gate-disabled path or inspect the
    /// channel. When the gate is disabled the instrument is a transparent
    /// pass-through: the operation's success is returned as `Ok(Some(_))` and
    /// its failure as [`DiagnosticError::Operation`], with zero telemetry.
    ///
    /// `operation_name` keys the events; empty names fail with
    /// [`DiagnosticError::InvalidArgument`] before anything runs. A
    /// cancellation already signaled on `cancel` fails with
    /// [`DiagnosticError::Cancelled`] without starting the operation;
    /// cancellation mid-operation is the operation's own concern and surfaces
    /// through its error, which takes the `Error`-event path.
    pub async fn execute<R, F, Fut>(
        &self,
        operation_name: &str,
        operation: F,
        cancel: &CancellationToken,
    ) -> Result<Option<R>, DiagnosticError>
    where
        R: Serialize,
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<R>>,
    {
        if operation_name.trim().is_empty() {
            return Err(DiagnosticError::InvalidArgument(
                "operation name must not be empty".to_string(),
            ));
        }
        if cancel.is_cancelled() {
            return Err(DiagnosticError::Cancelled);
        }

        if !self
            .gate
            .is_enabled(&self.flag)
            .await
            .map_err(DiagnosticError::Gate)?
        {
            // Hot path: no keys derived, no events, result surfaced as-is.
            return match operation().await {
                Ok(result) => Ok(Some(result)),
                Err(err) => Err(DiagnosticError::Operation(err)),
            };
        }

        let key = format!("{}.{}", self.owner, operation_name);

        // The timer only runs when Start is observed; Stop reports elapsed 0
        // otherwise.
        let started = if self.channel.is_observed(&format!("{key}.Start")) {
            let now = Instant::now();
            self.channel
                .publish(format!("{key}.Start"), EventPayload::Empty);
            Some(now)
        } else {
            None
        };

        let result = match operation().await {
            Ok(result) => Some(result),
            Err(err) => {
                self.channel
                    .publish(format!("{key}.Error"), EventPayload::Failure(failure(&err, &key)));
                None
            }
        };

        if self.channel.is_observed(&format!("{key}.Stop")) {
            let elapsed = started
                .map(|instant| instant.elapsed().as_millis() as u64)
                .unwrap_or(0);
            if let Some(result) = &result {
                match serde_json::to_value(result) {
                    Ok(Value::Null) => {}
                    Ok(value) => self
                        .channel
                        .publish(format!("{key}.Stop"), EventPayload::from_value(value)),
                    Err(err) => warn!(
                        key = %key,
                        error = %err,
                        "operation result could not be serialized for Stop event"
                    ),
                }
            }
            self.channel
                .publish(format!("{key}.ElapsedMs"), EventPayload::Number(elapsed));
            self.channel.publish(
                format!("{key}.Stop"),
                EventPayload::Text(format!("{operation_name} completed in {elapsed} ms.")),
            );
        }

        Ok(result)
    }
}

fn failure(err: &anyhow::Error, key: &str) -> FailureInfo {
    FailureInfo {
        message: format!(
            "Error: {err} -> {key} at {}. Thread: {}",
            now_rfc3339(),
            thread_label()
        ),
        backtrace: Some(format!("{err:?}")),
    }
}
