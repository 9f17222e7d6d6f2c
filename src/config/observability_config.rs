//! Logging configuration parsing from environment variables.

use super::{Lookup, parse_or};
use anyhow::Result;

/// Observability environment configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservabilityEnvConfig {
    /// Default `EnvFilter` directive when `RUST_LOG` is unset
    pub log_level: String,
    pub ansi: bool,
}

impl Default for ObservabilityEnvConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            ansi: true,
        }
    }
}

impl ObservabilityEnvConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(&|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            log_level: lookup("LOG_LEVEL")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.log_level),
            ansi: parse_or(lookup, "LOG_ANSI", defaults.ansi)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observability_config_defaults() {
        let config = ObservabilityEnvConfig::from_lookup(&|_| None).unwrap();
        assert_eq!(config, ObservabilityEnvConfig::default());
    }

    #[test]
    fn test_observability_config_overrides() {
        let config = ObservabilityEnvConfig::from_lookup(&|key| match key {
            "LOG_LEVEL" => Some("quantvision=debug".to_string()),
            "LOG_ANSI" => Some("false".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.log_level, "quantvision=debug");
        assert!(!config.ansi);
    }

    #[test]
    fn test_invalid_bool_is_rejected() {
        let result = ObservabilityEnvConfig::from_lookup(&|key| {
            (key == "LOG_ANSI").then(|| "sometimes".to_string())
        });
        assert!(result.is_err());
    }
}
