//! Structured logging setup on top of the `tracing` crate.
//!
//! The forwarded diagnostic records land here when `TracingSink` is used, so
//! hosts typically initialize this once at startup.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

use crate::error::DiagnosticError;

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error, off.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: json, text.
    #[serde(default = "default_format")]
    pub format: String,

    /// Colored output (text format only).
    #[serde(default = "default_true")]
    pub color: bool,

    /// Module-specific log levels.
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "text".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_format(),
            color: default_true(),
            modules: HashMap::new(),
        }
    }
}

/// Initialize the logging system.
///
/// Priority order (highest to lowest): `PULSE_LOG` / `PULSE_LOG_FORMAT`
/// environment variables, the given configuration, defaults. Fails if a
/// global subscriber is already installed.
pub fn init_logging(config: Option<&LoggingConfig>) -> Result<(), DiagnosticError> {
    let filter = build_env_filter(config)?;
    let format = determine_format(config)?;
    let use_color = config.map(|c| c.color).unwrap_or(true);

    let base = Registry::default().with(filter);
    if format == "json" {
        base.with(
            fmt::layer()
                .json()
                .with_target(true)
                .with_timer(ChronoUtc::rfc_3339()),
        )
        .try_init()
        .map_err(|e| DiagnosticError::Config(format!("Failed to install subscriber: {}", e)))?;
    } else {
        base.with(
            fmt::layer()
                .with_target(true)
                .with_timer(ChronoUtc::rfc_3339())
                .with_ansi(use_color),
        )
        .try_init()
        .map_err(|e| DiagnosticError::Config(format!("Failed to install subscriber: {}", e)))?;
    }
    Ok(())
}

/// Build the environment filter from config or the `PULSE_LOG` variable.
fn build_env_filter(config: Option<&LoggingConfig>) -> Result<EnvFilter, DiagnosticError> {
    if let Ok(filter) = EnvFilter::try_from_env("PULSE_LOG") {
        return Ok(filter);
    }

    let level = config.map(|c| c.level.as_str()).unwrap_or("info");
    if level == "off" {
        return Ok(EnvFilter::new("off"));
    }

    let mut filter = EnvFilter::new(level);
    if let Some(config) = config {
        for (module, module_level) in &config.modules {
            let directive = format!("{}={}", module, module_level);
            filter = filter.add_directive(directive.parse().map_err(|e| {
                DiagnosticError::Config(format!("Invalid log directive: {}", e))
            })?);
        }
    }
    Ok(filter)
}

fn determine_format(config: Option<&LoggingConfig>) -> Result<String, DiagnosticError> {
    if let Ok(format) = std::env::var("PULSE_LOG_FORMAT") {
        if format == "json" || format == "text" {
            return Ok(format);
        }
    }

    let format = config.map(|c| c.format.as_str()).unwrap_or("text");
    if format != "json" && format != "text" {
        return Err(DiagnosticError::Config(format!(
            "Invalid log format: {} (must be 'json' or 'text')",
            format
        )));
    }
    Ok(format.to_string())
}
