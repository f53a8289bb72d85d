//! Feature gate seam: the boolean predicate deciding whether instrumentation
//! overhead is incurred for a call.

use async_trait::async_trait;

/// Well-known flag names.
pub mod flags {
    /// Master switch for operation diagnostics.
    pub const ENABLE_DIAGNOSTICS: &str = "enable_diagnostics";
}

/// Asynchronous boolean predicate, consulted once per instrumented call.
///
/// Backed by whatever flag system the host application uses. A failing check
/// is propagated by callers rather than assumed enabled or disabled.
#[async_trait]
pub trait FeatureGate: Send + Sync {
    async fn is_enabled(&self, flag: &str) -> anyhow::Result<bool>;
}

/// Gate with a fixed answer. Useful for wiring and tests.
pub struct StaticGate(pub bool);

#[async_trait]
impl FeatureGate for StaticGate {
    async fn is_enabled(&self, _flag: &str) -> anyhow::Result<bool> {
        Ok(self.0)
    }
}

/// Gate answering from the process environment: flag `f` is enabled when
/// `PULSE_FLAG_<F>` (upper-cased) is set to `1`, `true`, or `on`.
pub struct EnvFlagGate;

impl EnvFlagGate {
    fn var_name(flag: &str) -> String {
        format!("PULSE_FLAG_{}", flag.to_uppercase())
    }
}

#[async_trait]
impl FeatureGate for EnvFlagGate {
    async fn is_enabled(&self, flag: &str) -> anyhow::Result<bool> {
        let enabled = std::env::var(Self::var_name(flag))
            .map(|value| matches!(value.as_str(), "1" | "true" | "on"))
            .unwrap_or(false);
        Ok(enabled)
    }
}
