//! Error types for the client session layer

use crate::core_codec::CodecError;
use crate::core_fhe::FheError;
use crate::core_match::MatchError;
use crate::core_messages::StoreError;
use crate::core_registry::RegistryError;
use thiserror::Error;

/// Result type for client session operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors surfaced to the caller of a client session
#[derive(Error, Debug)]
pub enum ClientError {
    /// Crush target is the null address
    #[error("target cannot be the null address")]
    InvalidTarget,

    /// Message text is empty or whitespace-only
    #[error("message cannot be empty")]
    EmptyMessage,

    /// Message text exceeds the character cap
    #[error("message too long: {chars} characters exceeds the {max} character cap")]
    MessageTooLong { chars: usize, max: usize },

    /// Registry rejected the submission
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Match engine rejected the check
    #[error(transparent)]
    Match(#[from] MatchError),

    /// Message store rejected the send
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Codec rejected the message
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Engine failure outside the sanctioned retry path
    #[error(transparent)]
    Engine(#[from] FheError),
}
