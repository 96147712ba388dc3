//! Logging subsystem for crushlink
//!
//! Unified logging interface over the `tracing` crate, configurable from
//! [`crate::config::LoggingConfig`] or programmatically.

use crate::config::LoggingConfig;
use std::fmt;
use tracing_subscriber::{fmt as subscriber_fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Severity threshold for emitted log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// Most verbose
    Trace,
    /// Detailed debugging information
    Debug,
    /// General informational messages
    Info,
    /// Warnings
    Warn,
    /// Errors only
    Error,
}

impl LogLevel {
    /// String form accepted by env filters
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    /// Parse a level name (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Info
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors that can occur while initializing logging
#[derive(Debug, Clone, thiserror::Error)]
pub enum LoggingError {
    /// A global subscriber is already installed, or setup failed
    #[error("failed to initialize logging: {0}")]
    InitializationFailed(String),
}

/// Initialize logging with defaults (info level, plain formatting)
pub fn init_logging() -> Result<(), LoggingError> {
    init_logging_with_config(&LoggingConfig::default())
}

/// Initialize logging from a [`LoggingConfig`]
///
/// The `RUST_LOG` environment variable, when set, overrides the configured
/// level.
pub fn init_logging_with_config(config: &LoggingConfig) -> Result<(), LoggingError> {
    let level = LogLevel::parse(&config.level).unwrap_or_default();
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    let fmt_layer = subscriber_fmt::layer().with_target(config.with_target);

    if config.json_format {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer.json())
            .try_init()
            .map_err(|e| LoggingError::InitializationFailed(e.to_string()))?;
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| LoggingError::InitializationFailed(e.to_string()))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_parse_and_render() {
        assert_eq!(LogLevel::parse("trace"), Some(LogLevel::Trace));
        assert_eq!(LogLevel::parse("WARNING"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse("nope"), None);
        assert_eq!(LogLevel::Debug.to_string(), "debug");
    }

    #[test]
    fn test_level_ordering() {
        assert!(LogLevel::Trace < LogLevel::Debug);
        assert!(LogLevel::Warn < LogLevel::Error);
    }

    #[test]
    fn test_default_level_is_info() {
        assert_eq!(LogLevel::default(), LogLevel::Info);
    }
}
