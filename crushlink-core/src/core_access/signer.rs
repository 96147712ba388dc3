//! Signing capability of the principal's long-term identity

use crate::types::Address;
use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use rand::RngCore;

/// Identity-layer capability to sign session authorizations
///
/// The core never holds wallet plumbing; it only needs the ability to sign a
/// payload once per session window. Callers inject whatever identity backend
/// they have behind this trait.
pub trait SessionSigner: Send + Sync {
    /// Principal address this signer acts for
    fn principal(&self) -> Address;

    /// Long-term verifying key embedded into authorizations
    fn verifying_key(&self) -> VerifyingKey;

    /// Sign a canonical payload digest
    fn sign(&self, message: &[u8]) -> Signature;
}

/// In-process signer over an ed25519 keypair
pub struct LocalSigner {
    signing_key: SigningKey,
    principal: Address,
}

impl LocalSigner {
    /// Create a signer from an existing key
    pub fn new(signing_key: SigningKey) -> Self {
        let principal = Address::from_verifying_key(&signing_key.verifying_key());
        Self {
            signing_key,
            principal,
        }
    }

    /// Create a signer from a fixed 32-byte seed (deterministic, for tests)
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self::new(SigningKey::from_bytes(&seed))
    }

    /// Generate a signer with a fresh random key
    pub fn generate() -> Self {
        let mut seed = [0u8; 32];
        rand::rng().fill_bytes(&mut seed);
        Self::new(SigningKey::from_bytes(&seed))
    }
}

impl SessionSigner for LocalSigner {
    fn principal(&self) -> Address {
        self.principal
    }

    fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    fn sign(&self, message: &[u8]) -> Signature {
        self.signing_key.sign(message)
    }
}
