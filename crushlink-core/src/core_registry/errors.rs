//! Error types for the crush registry

use crate::core_fhe::FheError;
use crate::types::Timestamp;
use thiserror::Error;

/// Result type for registry operations
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors that can occur when submitting a crush target
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Cooldown since the previous accepted submission has not elapsed
    #[error("cooldown period not elapsed; next submission at {retry_at}")]
    CooldownNotElapsed { retry_at: Timestamp },

    /// Attempt budget for the current rolling window is exhausted
    #[error("daily attempt limit reached; window resets at {window_resets_at}")]
    RateLimited { window_resets_at: Timestamp },

    /// Input carried an unexpected number of encrypted words
    #[error("expected a single encrypted word, got {0}")]
    UnexpectedInputWidth(usize),

    /// Ciphertext/proof pair failed engine verification
    #[error("invalid ciphertext: {0}")]
    InvalidCiphertext(#[from] FheError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RegistryError::CooldownNotElapsed {
            retry_at: Timestamp::from_secs(42),
        };
        assert!(err.to_string().contains("cooldown"));
        assert!(err.to_string().contains("42"));

        let err = RegistryError::UnexpectedInputWidth(3);
        assert!(err.to_string().contains("got 3"));
    }
}
