//! Session authorizations for authorized decryption
//!
//! A principal does not sign every decryption request. It signs one
//! time-bounded credential binding together its identity, the coordinator
//! contexts it wants to read from, a validity window, and a fresh ephemeral
//! public key; the engine then re-encrypts disclosed plaintexts under that
//! ephemeral key. The credential is presented alongside ciphertext handles
//! on every decryption request within its window.

use crate::types::{Address, Timestamp};
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::Duration;
use thiserror::Error;

/// Domain separator for the signed payload
const PAYLOAD_DOMAIN: &[u8] = b"crushlink-session-auth-v1";

/// Errors produced when validating a session authorization
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionAuthError {
    /// Signature does not verify against the embedded key
    #[error("authorization signature does not verify")]
    SignatureMismatch,

    /// Embedded verifying key does not belong to the claimed principal
    #[error("authorization key does not match principal {0}")]
    PrincipalMismatch(Address),
}

/// A time-bounded, principal-scoped decryption credential
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionAuthorization {
    /// Principal this credential authorizes
    pub principal: Address,

    /// Coordinator contexts the credential is scoped to (sorted)
    pub coordinators: Vec<Address>,

    /// When the credential was issued
    pub issued_at: Timestamp,

    /// Validity window length
    #[serde(with = "humantime_serde")]
    pub valid_for: Duration,

    /// Fresh x25519 public key plaintexts are re-encrypted under
    pub ephemeral_public: [u8; 32],

    /// Long-term verifying key of the principal
    pub verifying_key: VerifyingKey,

    /// Signature over the canonical payload digest
    pub signature: Signature,
}

impl SessionAuthorization {
    /// Canonical digest the principal signs
    pub fn payload_digest(
        principal: &Address,
        coordinators: &[Address],
        issued_at: Timestamp,
        valid_for: Duration,
        ephemeral_public: &[u8; 32],
    ) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(PAYLOAD_DOMAIN);
        hasher.update(principal.as_bytes());
        for coordinator in coordinators {
            hasher.update(coordinator.as_bytes());
        }
        hasher.update(issued_at.as_secs().to_be_bytes());
        hasher.update(valid_for.as_secs().to_be_bytes());
        hasher.update(ephemeral_public);
        hasher.finalize().into()
    }

    /// When this credential stops being valid
    pub fn expires_at(&self) -> Timestamp {
        self.issued_at.plus(self.valid_for)
    }

    /// Whether the credential is outside its validity window at `now`
    pub fn is_expired(&self, now: Timestamp) -> bool {
        now >= self.expires_at()
    }

    /// Whether the credential is scoped to the given coordinator
    pub fn covers(&self, coordinator: &Address) -> bool {
        self.coordinators.contains(coordinator)
    }

    /// Check the signature and the principal/key binding
    pub fn verify(&self) -> Result<(), SessionAuthError> {
        if Address::from_verifying_key(&self.verifying_key) != self.principal {
            return Err(SessionAuthError::PrincipalMismatch(self.principal));
        }

        let digest = Self::payload_digest(
            &self.principal,
            &self.coordinators,
            self.issued_at,
            self.valid_for,
            &self.ephemeral_public,
        );
        self.verifying_key
            .verify(&digest, &self.signature)
            .map_err(|_| SessionAuthError::SignatureMismatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_access::signer::{LocalSigner, SessionSigner};

    fn signed_auth(valid_for: Duration) -> SessionAuthorization {
        let signer = LocalSigner::from_seed([3u8; 32]);
        let coordinators = vec![Address([0xaa; 20])];
        let issued_at = Timestamp::from_secs(1_000);
        let ephemeral_public = [0x55u8; 32];

        let digest = SessionAuthorization::payload_digest(
            &signer.principal(),
            &coordinators,
            issued_at,
            valid_for,
            &ephemeral_public,
        );

        SessionAuthorization {
            principal: signer.principal(),
            coordinators,
            issued_at,
            valid_for,
            ephemeral_public,
            verifying_key: signer.verifying_key(),
            signature: signer.sign(&digest),
        }
    }

    #[test]
    fn test_valid_authorization_verifies() {
        let auth = signed_auth(Duration::from_secs(86_400));
        assert!(auth.verify().is_ok());
    }

    #[test]
    fn test_tampered_scope_fails_verification() {
        let mut auth = signed_auth(Duration::from_secs(86_400));
        auth.coordinators.push(Address([0xbb; 20]));
        assert_eq!(auth.verify(), Err(SessionAuthError::SignatureMismatch));
    }

    #[test]
    fn test_foreign_key_fails_principal_binding() {
        let mut auth = signed_auth(Duration::from_secs(86_400));
        let other = LocalSigner::from_seed([4u8; 32]);
        auth.verifying_key = other.verifying_key();
        assert!(matches!(
            auth.verify(),
            Err(SessionAuthError::PrincipalMismatch(_))
        ));
    }

    #[test]
    fn test_expiry_window() {
        let auth = signed_auth(Duration::from_secs(100));
        assert!(!auth.is_expired(Timestamp::from_secs(1_099)));
        assert!(auth.is_expired(Timestamp::from_secs(1_100)));
    }

    #[test]
    fn test_scope_coverage() {
        let auth = signed_auth(Duration::from_secs(100));
        assert!(auth.covers(&Address([0xaa; 20])));
        assert!(!auth.covers(&Address([0xcc; 20])));
    }
}
