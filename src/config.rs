//! Configuration for the diagnostics layer.
//!
//! Loaded from an optional TOML file with `PULSE_`-prefixed environment
//! variable overrides, falling back to defaults throughout.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::DiagnosticError;
use crate::gate::flags;
use crate::logging::LoggingConfig;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticsConfig {
    /// Feature flag consulted by instruments before emitting telemetry.
    #[serde(default = "default_feature_flag")]
    pub feature_flag: String,

    /// Channel names the listener service forwards. Empty means forward
    /// nothing.
    #[serde(default)]
    pub channels: Vec<String>,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_feature_flag() -> String {
    flags::ENABLE_DIAGNOSTICS.to_string()
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            feature_flag: default_feature_flag(),
            channels: Vec::new(),
            logging: LoggingConfig::default(),
        }
    }
}

impl DiagnosticsConfig {
    /// Load configuration, merging (lowest to highest precedence): defaults,
    /// the given TOML file if any, then `PULSE_*` environment variables
    /// (nested keys separated by `__`, e.g. `PULSE_LOGGING__LEVEL=debug`).
    pub fn load(path: Option<&Path>) -> Result<Self, DiagnosticError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        builder = builder.add_source(config::Environment::with_prefix("PULSE").separator("__"));
        let raw = builder
            .build()
            .map_err(|err| DiagnosticError::Config(err.to_string()))?;
        let mut loaded: Self = raw
            .try_deserialize()
            .map_err(|err| DiagnosticError::Config(err.to_string()))?;
        if loaded.feature_flag.trim().is_empty() {
            loaded.feature_flag = default_feature_flag();
        }
        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn defaults_are_sensible() {
        let config = DiagnosticsConfig::default();
        assert_eq!(config.feature_flag, flags::ENABLE_DIAGNOSTICS);
        assert!(config.channels.is_empty());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn load_without_file_yields_defaults() {
        let config = DiagnosticsConfig::load(None).unwrap();
        assert_eq!(config.feature_flag, flags::ENABLE_DIAGNOSTICS);
    }

    #[test]
    fn load_reads_toml_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("pulse.toml");
        fs::write(
            &path,
            r#"
feature_flag = "enable_job_diagnostics"
channels = ["SomeRandomJob", "OtherJob"]

[logging]
level = "debug"
format = "json"
"#,
        )
        .unwrap();
        let config = DiagnosticsConfig::load(Some(&path)).unwrap();
        assert_eq!(config.feature_flag, "enable_job_diagnostics");
        assert_eq!(config.channels, vec!["SomeRandomJob", "OtherJob"]);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn config_round_trips_through_toml() {
        let config = DiagnosticsConfig {
            feature_flag: "enable_diagnostics".to_string(),
            channels: vec!["Job".to_string()],
            logging: LoggingConfig::default(),
        };
        let rendered = toml::to_string_pretty(&config).unwrap();
        let parsed: DiagnosticsConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.feature_flag, config.feature_flag);
        assert_eq!(parsed.channels, config.channels);
    }

    #[test]
    fn invalid_file_reports_config_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("pulse.toml");
        fs::write(&path, "channels = 3").unwrap();
        assert!(matches!(
            DiagnosticsConfig::load(Some(&path)),
            Err(DiagnosticError::Config(_))
        ));
    }
}
