//! Logging setup for the binaries.
//!
//! `RUST_LOG` wins when set; otherwise `LOG_LEVEL` from the configuration is
//! used as the filter directive.

use crate::config::ObservabilityEnvConfig;
use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

pub fn env_filter(config: &ObservabilityEnvConfig) -> Result<EnvFilter> {
    match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(directives) if !directives.trim().is_empty() => {
            EnvFilter::try_new(directives).context("Invalid RUST_LOG directive")
        }
        _ => EnvFilter::try_new(&config.log_level)
            .with_context(|| format!("Invalid LOG_LEVEL directive: {}", config.log_level)),
    }
}

/// Installs the global subscriber. Logs go to stderr so stdout stays machine-readable.
pub fn init_tracing(config: &ObservabilityEnvConfig) -> Result<()> {
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_ansi(config.ansi)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter(config)?)
        .with(stderr_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_level_rejected() {
        let config = ObservabilityEnvConfig {
            log_level: "quantvision=loud[".to_string(),
            ansi: false,
        };
        if std::env::var(EnvFilter::DEFAULT_ENV).is_err() {
            assert!(env_filter(&config).is_err());
        }
    }

    #[test]
    fn test_default_level_accepted() {
        assert!(env_filter(&ObservabilityEnvConfig::default()).is_ok());
    }
}
