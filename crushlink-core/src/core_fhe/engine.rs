//! HomomorphicEngine trait - abstraction over the encryption backend
//!
//! The equality/conjunction arithmetic and key material live in external
//! infrastructure. This trait is the capability surface the core calls,
//! enabling:
//! - Protocol logic that never sees a plaintext target
//! - Testability via the in-process mock adapter
//!
//! # Architecture
//!
//! ```text
//! Matchmaker / ClientSession
//!       |
//!       v
//! HomomorphicEngine (trait)
//!       |
//!       +---> MockFheEngine (in-process, deterministic)
//!       |
//!       +---> network-backed engine (external deployment)
//! ```

use crate::core_access::SessionAuthorization;
use crate::core_fhe::errors::FheResult;
use crate::core_fhe::handle::CiphertextHandle;
use crate::types::Address;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Binding context for encrypted inputs
///
/// A proof is only valid for the (coordinator, principal) pair it was
/// produced for; replaying an input under another caller must fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputContext {
    /// Protocol deployment the input targets
    pub coordinator: Address,

    /// Principal submitting the input
    pub principal: Address,
}

/// Zero-knowledge input proof blob
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputProof(pub Vec<u8>);

impl InputProof {
    /// Raw proof bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// A batch of freshly encrypted values plus the proof binding them
///
/// All handles in one input share a single proof, mirroring how a client
/// encrypts a whole message in one shot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptedInput {
    /// Handles of the encrypted values, in submission order
    pub handles: Vec<CiphertextHandle>,

    /// Proof binding the handles to an [`InputContext`]
    pub proof: InputProof,
}

/// Capability interface to the external homomorphic engine
#[async_trait]
pub trait HomomorphicEngine: Send + Sync {
    /// Encrypt clear u32 values into a proof-carrying input (client side)
    async fn encrypt(&self, context: &InputContext, values: &[u32]) -> FheResult<EncryptedInput>;

    /// Verify an input's proof for the given context
    ///
    /// Returns the usable handles. Must be called before any state derived
    /// from the input is written.
    async fn verify_input(
        &self,
        input: &EncryptedInput,
        context: &InputContext,
    ) -> FheResult<Vec<CiphertextHandle>>;

    /// Homomorphic equality against a clear scalar
    ///
    /// Produces a fresh ciphertext holding 1 if the encrypted value equals
    /// `scalar`, else 0; neither operand is decrypted.
    async fn eq_scalar(
        &self,
        handle: &CiphertextHandle,
        scalar: u32,
    ) -> FheResult<CiphertextHandle>;

    /// Homomorphic conjunction of two encrypted booleans
    async fn and(
        &self,
        left: &CiphertextHandle,
        right: &CiphertextHandle,
    ) -> FheResult<CiphertextHandle>;

    /// Attach a principal to a ciphertext's access list
    async fn allow(&self, handle: &CiphertextHandle, principal: Address) -> FheResult<()>;

    /// Disclose plaintexts to an authorized principal
    ///
    /// Checks each handle's access list against the credential's principal,
    /// the credential's scope and validity window, and its signature.
    async fn user_decrypt(
        &self,
        handles: &[CiphertextHandle],
        authorization: &SessionAuthorization,
    ) -> FheResult<Vec<u32>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_context_equality() {
        let ctx = InputContext {
            coordinator: Address([1u8; 20]),
            principal: Address([2u8; 20]),
        };
        assert_eq!(ctx, ctx);
        assert_ne!(
            ctx,
            InputContext {
                coordinator: Address([1u8; 20]),
                principal: Address([3u8; 20]),
            }
        );
    }

    #[test]
    fn test_encrypted_input_serde() {
        let input = EncryptedInput {
            handles: vec![CiphertextHandle([4u8; 32])],
            proof: InputProof(vec![1, 2, 3]),
        };
        let json = serde_json::to_string(&input).unwrap();
        let back: EncryptedInput = serde_json::from_str(&json).unwrap();
        assert_eq!(back.handles, input.handles);
        assert_eq!(back.proof, input.proof);
    }
}
