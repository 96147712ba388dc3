//! Error types for the match engine

use crate::core_fhe::FheError;
use crate::types::Address;
use thiserror::Error;

/// Result type for match operations
pub type MatchOpResult<T> = Result<T, MatchError>;

/// Errors that can occur when computing a mutual-match result
#[derive(Error, Debug)]
pub enum MatchError {
    /// A principal asked to be matched against itself
    #[error("cannot check match with yourself")]
    SelfCheck,

    /// One of the parties has never registered a crush target
    #[error("{0} has no registered crush target")]
    NotRegistered(Address),

    /// Homomorphic evaluation failed
    #[error("engine failure: {0}")]
    Engine(#[from] FheError),
}
