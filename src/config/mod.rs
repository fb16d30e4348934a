use crate::failure::FailureMode;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

/// Environment key selecting the failure mode (`wrap` or `passthrough`)
pub const FAILURE_MODE_KEY: &str = "ONION_FAILURE_MODE";

/// Environment key enabling a trace span around every layer
pub const TRACE_LAYERS_KEY: &str = "ONION_TRACE_LAYERS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

/// Configuration service
#[derive(Clone, Default)]
pub struct ConfigService {
    config: Arc<DashMap<String, String>>,
}

impl ConfigService {
    /// Create a service pre-loaded with the process environment
    pub fn new() -> Self {
        let service = Self::default();
        for (key, value) in env::vars() {
            service.set(&key, &value);
        }
        service
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.config.get(key).map(|v| v.clone())
    }

    pub fn set(&self, key: &str, value: &str) {
        self.config.insert(key.to_string(), value.to_string());
    }

    /// Parse the value stored under `key`, if any
    pub fn parse<V: FromStr>(&self, key: &str) -> Result<Option<V>, ConfigError> {
        match self.get(key) {
            None => Ok(None),
            Some(raw) => raw
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: raw,
                }),
        }
    }
}

/// Settings applied to an onion through [`Onion::configure`](crate::Onion::configure)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OnionConfig {
    pub failure_mode: FailureMode,
    pub trace_layers: bool,
}

impl OnionConfig {
    /// Read the configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_service(&ConfigService::new())
    }

    pub fn from_service(service: &ConfigService) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            failure_mode: service
                .parse(FAILURE_MODE_KEY)?
                .unwrap_or(defaults.failure_mode),
            trace_layers: service
                .parse(TRACE_LAYERS_KEY)?
                .unwrap_or(defaults.trace_layers),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_unset() {
        let config = OnionConfig::from_service(&ConfigService::default()).unwrap();
        assert_eq!(config, OnionConfig::default());
        assert_eq!(config.failure_mode, FailureMode::Wrap);
        assert!(!config.trace_layers);
    }

    #[test]
    fn test_reads_values_from_service() {
        let service = ConfigService::default();
        service.set(FAILURE_MODE_KEY, "passthrough");
        service.set(TRACE_LAYERS_KEY, " true ");

        let config = OnionConfig::from_service(&service).unwrap();
        assert_eq!(config.failure_mode, FailureMode::Passthrough);
        assert!(config.trace_layers);
    }

    #[test]
    fn test_invalid_value_is_reported() {
        let service = ConfigService::default();
        service.set(TRACE_LAYERS_KEY, "sometimes");

        let err = OnionConfig::from_service(&service).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid value for ONION_TRACE_LAYERS: sometimes"
        );
    }

    #[test]
    fn test_deserialize_partial_config() {
        let config: OnionConfig = serde_json::from_str(r#"{ "failure_mode": "passthrough" }"#).unwrap();
        assert_eq!(config.failure_mode, FailureMode::Passthrough);
        assert!(!config.trace_layers);
    }

    #[test]
    fn test_service_get_set() {
        let service = ConfigService::default();
        assert_eq!(service.get("missing"), None);
        service.set("key", "value");
        assert_eq!(service.get("key"), Some(String::from("value")));
    }
}
