//! Confidential value layer
//!
//! Wraps opaque ciphertext handles plus the capability to request equality,
//! conjunction, and authorized decryption from an external homomorphic
//! engine. The engine itself is out of scope; everything above this module
//! works purely in handles.

pub mod engine;
pub mod errors;
pub mod handle;
pub mod mock;

// Re-exports
pub use engine::{EncryptedInput, HomomorphicEngine, InputContext, InputProof};
pub use errors::{FheError, FheResult};
pub use handle::CiphertextHandle;
pub use mock::MockFheEngine;
