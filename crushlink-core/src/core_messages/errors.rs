//! Error types for the message store

use crate::core_fhe::FheError;
use thiserror::Error;

/// Result type for message store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur when appending a message
#[derive(Error, Debug)]
pub enum StoreError {
    /// Recipient is the null address
    #[error("invalid recipient address")]
    InvalidRecipient,

    /// Message carried no encrypted chunks
    #[error("message cannot be empty")]
    EmptyMessage,

    /// Chunk count exceeds the per-message cap
    #[error("message too long: {chunks} chunks exceeds the {max} chunk cap")]
    TooLong { chunks: usize, max: usize },

    /// Ciphertext/proof pair failed engine verification
    #[error("invalid ciphertext: {0}")]
    InvalidCiphertext(#[from] FheError),
}
