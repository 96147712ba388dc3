//! Session authorization cache
//!
//! Signing prompts the principal's identity layer, so authorizations are
//! created once per (principal, coordinator set) and reused until they
//! expire. Validity is typically on the order of days.

use crate::core_access::session::SessionAuthorization;
use crate::core_access::signer::SessionSigner;
use crate::types::{Address, Timestamp};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::debug;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroize;

/// A cached credential plus the ephemeral secret that unwraps re-encrypted
/// plaintexts returned under it
pub struct SessionEntry {
    /// The signed, reusable credential
    pub authorization: SessionAuthorization,

    ephemeral_secret: StaticSecret,
}

impl SessionEntry {
    /// Ephemeral secret matching `authorization.ephemeral_public`
    pub fn ephemeral_secret(&self) -> &StaticSecret {
        &self.ephemeral_secret
    }
}

type CacheKey = (Address, Vec<Address>);

/// Cache of session authorizations keyed by (principal, coordinator set)
pub struct AuthorizationCache {
    validity: Duration,
    entries: RwLock<HashMap<CacheKey, Arc<SessionEntry>>>,
}

impl AuthorizationCache {
    /// Create a cache issuing credentials valid for `validity`
    pub fn new(validity: Duration) -> Self {
        Self {
            validity,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Return a live cached credential, or sign a fresh one
    ///
    /// An expired entry is replaced in place; callers always receive a
    /// credential that is valid at `now`.
    pub fn load_or_sign(
        &self,
        signer: &dyn SessionSigner,
        coordinators: &[Address],
        now: Timestamp,
    ) -> Arc<SessionEntry> {
        let mut scope: Vec<Address> = coordinators.to_vec();
        scope.sort();
        scope.dedup();
        let key = (signer.principal(), scope.clone());

        if let Some(entry) = self.entries.read().unwrap().get(&key) {
            if !entry.authorization.is_expired(now) {
                return Arc::clone(entry);
            }
        }

        debug!(
            principal = %signer.principal(),
            coordinators = scope.len(),
            "Signing fresh session authorization"
        );

        let entry = Arc::new(Self::sign_entry(signer, scope, now, self.validity));
        self.entries
            .write()
            .unwrap()
            .insert(key, Arc::clone(&entry));
        entry
    }

    fn sign_entry(
        signer: &dyn SessionSigner,
        coordinators: Vec<Address>,
        issued_at: Timestamp,
        valid_for: Duration,
    ) -> SessionEntry {
        let mut seed = [0u8; 32];
        rand::RngCore::fill_bytes(&mut rand::rng(), &mut seed);
        let ephemeral_secret = StaticSecret::from(seed);
        seed.zeroize();
        let ephemeral_public = PublicKey::from(&ephemeral_secret).to_bytes();

        let digest = SessionAuthorization::payload_digest(
            &signer.principal(),
            &coordinators,
            issued_at,
            valid_for,
            &ephemeral_public,
        );

        let authorization = SessionAuthorization {
            principal: signer.principal(),
            coordinators,
            issued_at,
            valid_for,
            ephemeral_public,
            verifying_key: signer.verifying_key(),
            signature: signer.sign(&digest),
        };

        SessionEntry {
            authorization,
            ephemeral_secret,
        }
    }
}
