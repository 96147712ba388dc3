//! Mutual-match computation over encrypted crush targets

pub mod engine;
pub mod errors;

// Re-exports
pub use engine::{MatchEngine, PairKey};
pub use errors::{MatchError, MatchOpResult};
