//! Mock homomorphic engine for tests and local demos
//!
//! Keeps clear values and access lists in process behind opaque handles, so
//! protocol logic can be exercised without real encryption. Proof and
//! authorization checks are enforced with the same strictness the external
//! engine applies: wrong context, missing grant, or an expired credential
//! all fail the same way.

use crate::clock::Clock;
use crate::core_access::SessionAuthorization;
use crate::core_fhe::engine::{EncryptedInput, HomomorphicEngine, InputContext, InputProof};
use crate::core_fhe::errors::{FheError, FheResult};
use crate::core_fhe::handle::CiphertextHandle;
use crate::types::Address;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
struct CipherRecord {
    value: u32,
    coordinator: Address,
    created_by: Address,
    acl: HashSet<Address>,
}

#[derive(Default)]
struct MockState {
    records: HashMap<CiphertextHandle, CipherRecord>,
    counter: u64,
    forced_decrypt_failures: u32,
}

/// In-process engine implementation backed by a clear-value table
pub struct MockFheEngine {
    clock: Arc<dyn Clock>,
    state: Mutex<MockState>,
}

impl MockFheEngine {
    /// Create an engine whose authorization expiry follows `clock`
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            state: Mutex::new(MockState::default()),
        }
    }

    /// Make the next `count` decryption requests fail transiently
    ///
    /// Models the indexing lag right after a transaction commits; used to
    /// exercise client-side retry.
    pub fn inject_decrypt_failures(&self, count: u32) {
        self.state.lock().unwrap().forced_decrypt_failures = count;
    }

    /// Peek at a stored clear value (test support)
    pub fn plaintext_of(&self, handle: &CiphertextHandle) -> Option<u32> {
        self.state
            .lock()
            .unwrap()
            .records
            .get(handle)
            .map(|r| r.value)
    }

    fn fresh_handle(state: &mut MockState) -> CiphertextHandle {
        state.counter += 1;
        let mut hasher = Sha256::new();
        hasher.update(uuid::Uuid::new_v4().as_bytes());
        hasher.update(state.counter.to_be_bytes());
        CiphertextHandle(hasher.finalize().into())
    }

    fn compute_proof(context: &InputContext, handles: &[CiphertextHandle]) -> Vec<u8> {
        let mut hasher = Sha256::new();
        hasher.update(b"crushlink-input-proof-v1");
        hasher.update(context.coordinator.as_bytes());
        hasher.update(context.principal.as_bytes());
        for handle in handles {
            hasher.update(handle.as_bytes());
        }
        hasher.finalize().to_vec()
    }
}

#[async_trait]
impl HomomorphicEngine for MockFheEngine {
    async fn encrypt(&self, context: &InputContext, values: &[u32]) -> FheResult<EncryptedInput> {
        let mut state = self.state.lock().unwrap();
        let mut handles = Vec::with_capacity(values.len());

        for value in values {
            let handle = Self::fresh_handle(&mut state);
            state.records.insert(
                handle,
                CipherRecord {
                    value: *value,
                    coordinator: context.coordinator,
                    created_by: context.principal,
                    acl: HashSet::new(),
                },
            );
            handles.push(handle);
        }

        let proof = InputProof(Self::compute_proof(context, &handles));
        Ok(EncryptedInput { handles, proof })
    }

    async fn verify_input(
        &self,
        input: &EncryptedInput,
        context: &InputContext,
    ) -> FheResult<Vec<CiphertextHandle>> {
        let expected = Self::compute_proof(context, &input.handles);
        if expected != input.proof.0 {
            return Err(FheError::InvalidProof(
                "proof does not match submitted context".to_string(),
            ));
        }

        let state = self.state.lock().unwrap();
        for handle in &input.handles {
            let record = state
                .records
                .get(handle)
                .ok_or(FheError::UnknownHandle(*handle))?;
            if record.coordinator != context.coordinator || record.created_by != context.principal {
                return Err(FheError::InvalidProof(format!(
                    "handle {} was not produced for this context",
                    handle
                )));
            }
        }

        Ok(input.handles.clone())
    }

    async fn eq_scalar(
        &self,
        handle: &CiphertextHandle,
        scalar: u32,
    ) -> FheResult<CiphertextHandle> {
        let mut state = self.state.lock().unwrap();
        let record = state
            .records
            .get(handle)
            .ok_or(FheError::UnknownHandle(*handle))?
            .clone();

        let result = Self::fresh_handle(&mut state);
        state.records.insert(
            result,
            CipherRecord {
                value: (record.value == scalar) as u32,
                coordinator: record.coordinator,
                created_by: record.created_by,
                acl: HashSet::new(),
            },
        );
        Ok(result)
    }

    async fn and(
        &self,
        left: &CiphertextHandle,
        right: &CiphertextHandle,
    ) -> FheResult<CiphertextHandle> {
        let mut state = self.state.lock().unwrap();
        let left_record = state
            .records
            .get(left)
            .ok_or(FheError::UnknownHandle(*left))?
            .clone();
        let right_value = state
            .records
            .get(right)
            .ok_or(FheError::UnknownHandle(*right))?
            .value;

        let result = Self::fresh_handle(&mut state);
        state.records.insert(
            result,
            CipherRecord {
                value: (left_record.value != 0 && right_value != 0) as u32,
                coordinator: left_record.coordinator,
                created_by: left_record.created_by,
                acl: HashSet::new(),
            },
        );
        Ok(result)
    }

    async fn allow(&self, handle: &CiphertextHandle, principal: Address) -> FheResult<()> {
        let mut state = self.state.lock().unwrap();
        let record = state
            .records
            .get_mut(handle)
            .ok_or(FheError::UnknownHandle(*handle))?;
        record.acl.insert(principal);
        Ok(())
    }

    async fn user_decrypt(
        &self,
        handles: &[CiphertextHandle],
        authorization: &SessionAuthorization,
    ) -> FheResult<Vec<u32>> {
        let mut state = self.state.lock().unwrap();

        if state.forced_decrypt_failures > 0 {
            state.forced_decrypt_failures -= 1;
            return Err(FheError::Transient(
                "ciphertext not indexed yet".to_string(),
            ));
        }

        authorization
            .verify()
            .map_err(|e| FheError::BadAuthorization(e.to_string()))?;

        if authorization.is_expired(self.clock.now()) {
            return Err(FheError::ExpiredAuthorization);
        }

        let mut values = Vec::with_capacity(handles.len());
        for handle in handles {
            let record = state
                .records
                .get(handle)
                .ok_or(FheError::UnknownHandle(*handle))?;

            if !authorization.covers(&record.coordinator) {
                return Err(FheError::BadAuthorization(format!(
                    "authorization does not cover coordinator {}",
                    record.coordinator
                )));
            }
            if !record.acl.contains(&authorization.principal) {
                return Err(FheError::Unauthorized {
                    principal: authorization.principal,
                });
            }
            values.push(record.value);
        }

        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::core_access::{AuthorizationCache, LocalSigner, SessionSigner};
    use std::time::Duration;

    fn coordinator() -> Address {
        Address([0xc0; 20])
    }

    fn engine_with_clock() -> (Arc<MockFheEngine>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        (Arc::new(MockFheEngine::new(clock.clone())), clock)
    }

    fn authorize(signer: &LocalSigner, clock: &ManualClock) -> SessionAuthorization {
        let cache = AuthorizationCache::new(Duration::from_secs(86_400));
        let entry = cache.load_or_sign(signer, &[coordinator()], clock.now());
        entry.authorization.clone()
    }

    #[tokio::test]
    async fn test_encrypt_verify_roundtrip() {
        let (engine, _clock) = engine_with_clock();
        let ctx = InputContext {
            coordinator: coordinator(),
            principal: Address([1u8; 20]),
        };

        let input = engine.encrypt(&ctx, &[7, 8, 9]).await.unwrap();
        let handles = engine.verify_input(&input, &ctx).await.unwrap();
        assert_eq!(handles.len(), 3);
    }

    #[tokio::test]
    async fn test_verify_rejects_foreign_context() {
        let (engine, _clock) = engine_with_clock();
        let ctx = InputContext {
            coordinator: coordinator(),
            principal: Address([1u8; 20]),
        };
        let input = engine.encrypt(&ctx, &[7]).await.unwrap();

        let replayed = InputContext {
            coordinator: coordinator(),
            principal: Address([2u8; 20]),
        };
        let err = engine.verify_input(&input, &replayed).await.unwrap_err();
        assert!(matches!(err, FheError::InvalidProof(_)));
    }

    #[tokio::test]
    async fn test_eq_and_conjunction() {
        let (engine, _clock) = engine_with_clock();
        let ctx = InputContext {
            coordinator: coordinator(),
            principal: Address([1u8; 20]),
        };
        let input = engine.encrypt(&ctx, &[42, 42]).await.unwrap();

        let hit = engine.eq_scalar(&input.handles[0], 42).await.unwrap();
        let miss = engine.eq_scalar(&input.handles[1], 43).await.unwrap();
        assert_eq!(engine.plaintext_of(&hit), Some(1));
        assert_eq!(engine.plaintext_of(&miss), Some(0));

        let both = engine.and(&hit, &miss).await.unwrap();
        assert_eq!(engine.plaintext_of(&both), Some(0));
        let same = engine.and(&hit, &hit).await.unwrap();
        assert_eq!(engine.plaintext_of(&same), Some(1));
    }

    #[tokio::test]
    async fn test_decrypt_requires_grant() {
        let (engine, clock) = engine_with_clock();
        let signer = LocalSigner::from_seed([9u8; 32]);
        let ctx = InputContext {
            coordinator: coordinator(),
            principal: signer.principal(),
        };
        let input = engine.encrypt(&ctx, &[123]).await.unwrap();
        let auth = authorize(&signer, &clock);

        let err = engine
            .user_decrypt(&input.handles, &auth)
            .await
            .unwrap_err();
        assert!(matches!(err, FheError::Unauthorized { .. }));

        engine
            .allow(&input.handles[0], signer.principal())
            .await
            .unwrap();
        let values = engine.user_decrypt(&input.handles, &auth).await.unwrap();
        assert_eq!(values, vec![123]);
    }

    #[tokio::test]
    async fn test_decrypt_rejects_expired_authorization() {
        let (engine, clock) = engine_with_clock();
        let signer = LocalSigner::from_seed([10u8; 32]);
        let ctx = InputContext {
            coordinator: coordinator(),
            principal: signer.principal(),
        };
        let input = engine.encrypt(&ctx, &[1]).await.unwrap();
        engine
            .allow(&input.handles[0], signer.principal())
            .await
            .unwrap();

        let cache = AuthorizationCache::new(Duration::from_secs(100));
        let auth = cache
            .load_or_sign(&signer, &[coordinator()], clock.now())
            .authorization
            .clone();

        clock.advance(1_000);
        let err = engine
            .user_decrypt(&input.handles, &auth)
            .await
            .unwrap_err();
        assert!(matches!(err, FheError::ExpiredAuthorization));
    }

    #[tokio::test]
    async fn test_injected_failures_are_transient() {
        let (engine, clock) = engine_with_clock();
        let signer = LocalSigner::from_seed([11u8; 32]);
        let ctx = InputContext {
            coordinator: coordinator(),
            principal: signer.principal(),
        };
        let input = engine.encrypt(&ctx, &[55]).await.unwrap();
        engine
            .allow(&input.handles[0], signer.principal())
            .await
            .unwrap();
        let auth = authorize(&signer, &clock);

        engine.inject_decrypt_failures(1);
        let err = engine
            .user_decrypt(&input.handles, &auth)
            .await
            .unwrap_err();
        assert!(matches!(err, FheError::Transient(_)));

        let values = engine.user_decrypt(&input.handles, &auth).await.unwrap();
        assert_eq!(values, vec![55]);
    }
}
