//! Error types for configuration loading

use thiserror::Error;

/// Errors that can occur while loading or validating configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable held a value that does not parse
    #[error("invalid configuration value: {0}")]
    InvalidValue(String),

    /// The assembled configuration is internally inconsistent
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
