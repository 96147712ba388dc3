//! Configuration management for crushlink
//!
//! Environment-based configuration with defaults and validation. Wire-format
//! constants (message word cap, sentinel) are deliberately NOT configurable;
//! only timing and retry knobs live here.

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

mod error;

pub use error::ConfigError;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Submission-rate governance
    pub limits: LimitsConfig,

    /// Session authorization issuing
    pub access: AccessConfig,

    /// Client-side orchestration knobs
    pub client: ClientConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Submission-rate limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Minimum gap between two accepted submissions from one principal
    #[serde(with = "humantime_serde")]
    pub submission_cooldown: Duration,

    /// Rolling window bounding the attempt budget
    #[serde(with = "humantime_serde")]
    pub submission_window: Duration,

    /// Accepted submissions allowed inside one window
    pub max_daily_attempts: u32,
}

/// Session authorization configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessConfig {
    /// Validity window of a signed session authorization
    #[serde(with = "humantime_serde")]
    pub authorization_validity: Duration,
}

/// Client session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Decryption attempts before a transient failure is surfaced
    pub decrypt_attempts: u32,

    /// Fixed backoff between decryption attempts
    #[serde(with = "humantime_serde")]
    pub decrypt_backoff: Duration,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Enable JSON formatting
    pub json_format: bool,

    /// Include target module
    pub with_target: bool,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            submission_cooldown: Duration::from_secs(3_600),
            submission_window: Duration::from_secs(24 * 3_600),
            max_daily_attempts: 10,
        }
    }
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            authorization_validity: Duration::from_secs(10 * 24 * 3_600),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            decrypt_attempts: 3,
            decrypt_backoff: Duration::from_millis(1_500),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            with_target: true,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Variables follow the pattern `CRUSHLINK_<SECTION>_<KEY>`.
    /// Example: `CRUSHLINK_LIMITS_COOLDOWN_SECS=7200`
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        // Limits
        if let Ok(secs) = env::var("CRUSHLINK_LIMITS_COOLDOWN_SECS") {
            config.limits.submission_cooldown = Duration::from_secs(
                secs.parse()
                    .map_err(|e| ConfigError::InvalidValue(format!("invalid cooldown: {}", e)))?,
            );
        }
        if let Ok(secs) = env::var("CRUSHLINK_LIMITS_WINDOW_SECS") {
            config.limits.submission_window = Duration::from_secs(
                secs.parse()
                    .map_err(|e| ConfigError::InvalidValue(format!("invalid window: {}", e)))?,
            );
        }
        if let Ok(attempts) = env::var("CRUSHLINK_LIMITS_MAX_DAILY_ATTEMPTS") {
            config.limits.max_daily_attempts = attempts.parse().map_err(|e| {
                ConfigError::InvalidValue(format!("invalid attempt budget: {}", e))
            })?;
        }

        // Access
        if let Ok(secs) = env::var("CRUSHLINK_ACCESS_AUTH_VALIDITY_SECS") {
            config.access.authorization_validity = Duration::from_secs(
                secs.parse().map_err(|e| {
                    ConfigError::InvalidValue(format!("invalid authorization validity: {}", e))
                })?,
            );
        }

        // Client
        if let Ok(attempts) = env::var("CRUSHLINK_CLIENT_DECRYPT_ATTEMPTS") {
            config.client.decrypt_attempts = attempts.parse().map_err(|e| {
                ConfigError::InvalidValue(format!("invalid decrypt attempts: {}", e))
            })?;
        }
        if let Ok(millis) = env::var("CRUSHLINK_CLIENT_DECRYPT_BACKOFF_MS") {
            config.client.decrypt_backoff = Duration::from_millis(
                millis.parse().map_err(|e| {
                    ConfigError::InvalidValue(format!("invalid decrypt backoff: {}", e))
                })?,
            );
        }

        // Logging
        if let Ok(level) = env::var("CRUSHLINK_LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Ok(json) = env::var("CRUSHLINK_LOG_JSON") {
            config.logging.json_format = json
                .parse()
                .map_err(|e| ConfigError::InvalidValue(format!("invalid JSON flag: {}", e)))?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.max_daily_attempts == 0 {
            return Err(ConfigError::Invalid(
                "max_daily_attempts must be at least 1".to_string(),
            ));
        }
        if self.limits.submission_cooldown > self.limits.submission_window {
            return Err(ConfigError::Invalid(
                "submission cooldown cannot exceed the window".to_string(),
            ));
        }
        if self.client.decrypt_attempts == 0 {
            return Err(ConfigError::Invalid(
                "decrypt_attempts must be at least 1".to_string(),
            ));
        }
        if self.access.authorization_validity.as_secs() == 0 {
            return Err(ConfigError::Invalid(
                "authorization validity cannot be zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.limits.max_daily_attempts, 10);
        assert_eq!(config.limits.submission_cooldown, Duration::from_secs(3_600));
        assert_eq!(
            config.limits.submission_window,
            Duration::from_secs(86_400)
        );
    }

    #[test]
    fn test_validation_rejects_zero_attempts() {
        let mut config = Config::default();
        config.limits.max_daily_attempts = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validation_rejects_cooldown_beyond_window() {
        let mut config = Config::default();
        config.limits.submission_cooldown = Duration::from_secs(48 * 3_600);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_serde_roundtrip_with_humantime_durations() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(
            back.limits.submission_cooldown,
            config.limits.submission_cooldown
        );
        assert_eq!(back.client.decrypt_backoff, config.client.decrypt_backoff);
    }
}
