//! Error types for the homomorphic engine boundary

use crate::core_fhe::handle::CiphertextHandle;
use crate::types::Address;
use thiserror::Error;

/// Result type for engine operations
pub type FheResult<T> = Result<T, FheError>;

/// Errors surfaced by the homomorphic engine
#[derive(Error, Debug, Clone)]
pub enum FheError {
    /// Ciphertext/proof pair failed verification for the calling context
    #[error("invalid ciphertext: {0}")]
    InvalidProof(String),

    /// Handle does not name a ciphertext known to the engine
    #[error("unknown ciphertext handle: {0}")]
    UnknownHandle(CiphertextHandle),

    /// Requesting principal is not on the ciphertext's access list
    #[error("principal {principal} is not authorized for this ciphertext")]
    Unauthorized { principal: Address },

    /// Session authorization is outside its validity window
    #[error("session authorization has expired")]
    ExpiredAuthorization,

    /// Session authorization is malformed or its signature does not verify
    #[error("bad session authorization: {0}")]
    BadAuthorization(String),

    /// Transient engine failure; the result may not be indexed yet
    #[error("transient engine failure: {0}")]
    Transient(String),
}
