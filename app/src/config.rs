//! FILENAME: app/src/config.rs
//! PURPOSE: Service configuration loaded from TOML.
//! CONTEXT: Every field has a default, so an empty or missing file yields a
//! working configuration.

use crate::error::{ServiceError, ServiceResult};
use collab::SessionConfig;
use engine::CalculationMode;
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Mode new spreadsheets start in.
    pub calculation_mode: CalculationMode,
    pub heartbeat_timeout_secs: u64,
    /// Events buffered per subscriber before it starts lagging.
    pub event_channel_capacity: usize,
    /// Largest range a single get/update request may cover.
    pub max_range_cells: u64,
    pub log_level: String,
    /// Append-only log file; stderr when unset.
    pub log_file: Option<PathBuf>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig {
            calculation_mode: CalculationMode::Automatic,
            heartbeat_timeout_secs: 30,
            event_channel_capacity: 256,
            max_range_cells: 1_000_000,
            log_level: "info".to_string(),
            log_file: None,
        }
    }
}

impl ServiceConfig {
    pub fn from_toml_str(text: &str) -> ServiceResult<Self> {
        let config: ServiceConfig =
            toml::from_str(text).map_err(|e| ServiceError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads the file at `path`. A missing file gives the defaults.
    pub fn load(path: impl AsRef<Path>) -> ServiceResult<Self> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml_str(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(ServiceError::Config(format!(
                "cannot read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    pub fn validate(&self) -> ServiceResult<()> {
        self.level_filter()?;
        if self.event_channel_capacity == 0 {
            return Err(ServiceError::Config(
                "event_channel_capacity must be at least 1".to_string(),
            ));
        }
        if self.heartbeat_timeout_secs > i64::MAX as u64 / 1000 {
            return Err(ServiceError::Config(
                "heartbeat_timeout_secs is too large".to_string(),
            ));
        }
        Ok(())
    }

    pub fn level_filter(&self) -> ServiceResult<LevelFilter> {
        LevelFilter::from_str(&self.log_level)
            .map_err(|_| ServiceError::Config(format!("unknown log level '{}'", self.log_level)))
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            heartbeat_timeout: chrono::Duration::seconds(self.heartbeat_timeout_secs as i64),
            channel_capacity: self.event_channel_capacity.max(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_gives_defaults() {
        assert_eq!(ServiceConfig::from_toml_str("").unwrap(), ServiceConfig::default());
    }

    #[test]
    fn partial_config_overrides_fields() {
        let config = ServiceConfig::from_toml_str(
            r#"
            calculation_mode = "manual"
            heartbeat_timeout_secs = 5
            log_level = "debug"
            "#,
        )
        .unwrap();
        assert_eq!(config.calculation_mode, CalculationMode::Manual);
        assert_eq!(config.heartbeat_timeout_secs, 5);
        assert_eq!(config.max_range_cells, 1_000_000);
        assert_eq!(config.level_filter().unwrap(), LevelFilter::Debug);
        assert_eq!(
            config.session_config().heartbeat_timeout,
            chrono::Duration::seconds(5)
        );
    }

    #[test]
    fn bad_values_are_config_errors() {
        for text in [
            "calculation_mode = \"sometimes\"",
            "log_level = \"loud\"",
            "event_channel_capacity = 0",
            "max_range_cells = \"many\"",
        ] {
            assert!(
                matches!(ServiceConfig::from_toml_str(text), Err(ServiceError::Config(_))),
                "{} should be rejected",
                text
            );
        }
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServiceConfig::load(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, ServiceConfig::default());
    }
}
