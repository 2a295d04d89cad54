//! Log subscriber setup for the verifier binary and the FFI.
//!
//! Library code only emits events through the `tracing` macros; whoever owns
//! the process calls [`init_tracing`] once.

use crate::{PactError, PactResult};
use std::fmt;
use std::str::FromStr;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// How log lines are written to stderr.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human readable lines
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat {
    type Err = PactError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(PactError::invalid_input(format!("Unknown log format '{other}'"))),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pretty => "pretty",
            Self::Json => "json",
        })
    }
}

/// Tracing configuration.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Component named in the startup event
    pub component: String,
    /// Level used when `RUST_LOG` is not set
    pub level: LevelFilter,
    /// Output format
    pub format: LogFormat,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            component: "pact".to_string(),
            level: LevelFilter::INFO,
            format: LogFormat::Pretty,
        }
    }
}

impl TracingConfig {
    /// Defaults for one component.
    #[must_use]
    pub fn for_component(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            ..Self::default()
        }
    }

    /// Set the level from its name (`off`, `error`, `warn`, `info`, `debug`
    /// or `trace`, any case).
    ///
    /// # Errors
    ///
    /// Returns `PactError::InvalidInput` for an unknown level.
    pub fn with_level(mut self, level: &str) -> PactResult<Self> {
        self.level = level
            .trim()
            .parse()
            .map_err(|_| PactError::invalid_input(format!("Unknown log level '{level}'")))?;
        Ok(self)
    }

    /// Set the output format.
    #[must_use]
    pub const fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::builder()
            .with_default_directive(self.level.into())
            .from_env_lossy()
    }
}

/// Install the global subscriber, writing to stderr.
///
/// `RUST_LOG` takes precedence over the configured level. Returns `false`
/// when a subscriber was already installed, as happens when a wrapper
/// initialises the FFI more than once.
pub fn init_tracing(config: &TracingConfig) -> bool {
    let registry = tracing_subscriber::registry().with(config.filter());
    let installed = match config.format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
            .is_ok(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
            .is_ok(),
    };

    if installed {
        tracing::debug!(component = %config.component, level = %config.level, format = %config.format, "Logging initialised");
    }
    installed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TracingConfig::default();
        assert_eq!(config.component, "pact");
        assert_eq!(config.level, LevelFilter::INFO);
        assert_eq!(config.format, LogFormat::Pretty);
    }

    #[test]
    fn test_level_names() {
        let config = TracingConfig::for_component("pact-verifier").with_level("DEBUG").unwrap();
        assert_eq!(config.component, "pact-verifier");
        assert_eq!(config.level, LevelFilter::DEBUG);
        assert_eq!(TracingConfig::default().with_level("off").unwrap().level, LevelFilter::OFF);
        assert!(TracingConfig::default().with_level("loud").is_err());
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("text".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_second_init_is_reported() {
        let config = TracingConfig::default().with_level("warn").unwrap();
        let _ = init_tracing(&config);
        assert!(!init_tracing(&config));
    }
}
