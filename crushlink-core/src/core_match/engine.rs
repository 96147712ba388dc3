//! Match engine - homomorphic mutual-match computation
//!
//! A match result answers "did these two name each other" without ever
//! opening either target: both equality checks and their conjunction run on
//! ciphertexts. Results are stored per canonical pair so either party's
//! query reads the same physical entry, and each result is a snapshot of the
//! targets at computation time.

use crate::core_fhe::{CiphertextHandle, HomomorphicEngine};
use crate::core_match::errors::{MatchError, MatchOpResult};
use crate::core_registry::CrushRegistry;
use crate::types::Address;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Unordered pair of principals normalized to one fixed order
///
/// The numerically smaller address always comes first, so `(a, b)` and
/// `(b, a)` key the same entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PairKey {
    first: Address,
    second: Address,
}

impl PairKey {
    /// Canonicalize an unordered pair
    pub fn canonical(a: Address, b: Address) -> Self {
        if a <= b {
            PairKey {
                first: a,
                second: b,
            }
        } else {
            PairKey {
                first: b,
                second: a,
            }
        }
    }
}

/// Computes and stores encrypted mutual-match results
pub struct MatchEngine {
    engine: Arc<dyn HomomorphicEngine>,
    registry: Arc<CrushRegistry>,
    results: RwLock<HashMap<PairKey, CiphertextHandle>>,
}

impl MatchEngine {
    /// Create a match engine over the shared registry
    pub fn new(engine: Arc<dyn HomomorphicEngine>, registry: Arc<CrushRegistry>) -> Self {
        Self {
            engine,
            registry,
            results: RwLock::new(HashMap::new()),
        }
    }

    /// Compute the mutual-match result for `caller` and `other`
    ///
    /// Evaluates `target(caller) == other AND target(other) == caller` over
    /// the 32-bit address projections, stores the encrypted 0/1 under the
    /// canonical pair (overwriting any previous snapshot), and grants
    /// decryption to both parties.
    pub async fn check_match(
        &self,
        caller: Address,
        other: Address,
    ) -> MatchOpResult<CiphertextHandle> {
        if caller == other {
            return Err(MatchError::SelfCheck);
        }

        let caller_target = self
            .registry
            .live_target(caller)
            .await
            .ok_or(MatchError::NotRegistered(caller))?;
        let other_target = self
            .registry
            .live_target(other)
            .await
            .ok_or(MatchError::NotRegistered(other))?;

        debug!(caller = %caller, other = %other, "Evaluating mutual match");

        let caller_names_other = self
            .engine
            .eq_scalar(&caller_target, other.low_u32())
            .await?;
        let other_names_caller = self
            .engine
            .eq_scalar(&other_target, caller.low_u32())
            .await?;
        let both = self
            .engine
            .and(&caller_names_other, &other_names_caller)
            .await?;

        self.engine.allow(&both, caller).await?;
        self.engine.allow(&both, other).await?;

        let key = PairKey::canonical(caller, other);
        self.results.write().await.insert(key, both);

        info!(caller = %caller, other = %other, result = %both, "Match result stored");
        Ok(both)
    }

    /// Stored result for a pair (zero handle if never computed)
    pub async fn match_result(&self, a: Address, b: Address) -> CiphertextHandle {
        self.results
            .read()
            .await
            .get(&PairKey::canonical(a, b))
            .copied()
            .unwrap_or(CiphertextHandle::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::LimitsConfig;
    use crate::core_fhe::{EncryptedInput, InputContext, MockFheEngine};

    fn coordinator() -> Address {
        Address([0xc0; 20])
    }

    struct Fixture {
        engine: Arc<MockFheEngine>,
        registry: Arc<CrushRegistry>,
        matches: MatchEngine,
    }

    fn setup() -> Fixture {
        let clock = Arc::new(ManualClock::default());
        let engine = Arc::new(MockFheEngine::new(clock.clone()));
        let registry = Arc::new(CrushRegistry::new(
            engine.clone(),
            clock,
            LimitsConfig::default(),
            coordinator(),
        ));
        let matches = MatchEngine::new(engine.clone(), registry.clone());
        Fixture {
            engine,
            registry,
            matches,
        }
    }

    async fn register(fixture: &Fixture, who: Address, crush_on: Address) {
        let input: EncryptedInput = fixture
            .engine
            .encrypt(
                &InputContext {
                    coordinator: coordinator(),
                    principal: who,
                },
                &[crush_on.low_u32()],
            )
            .await
            .unwrap();
        fixture.registry.submit(who, &input).await.unwrap();
    }

    #[test]
    fn test_pair_key_is_symmetric() {
        let a = Address([1u8; 20]);
        let b = Address([2u8; 20]);
        assert_eq!(PairKey::canonical(a, b), PairKey::canonical(b, a));
    }

    #[tokio::test]
    async fn test_self_check_rejected() {
        let fixture = setup();
        let alice = Address([1u8; 20]);
        register(&fixture, alice, Address([2u8; 20])).await;

        let err = fixture.matches.check_match(alice, alice).await.unwrap_err();
        assert!(matches!(err, MatchError::SelfCheck));
    }

    #[tokio::test]
    async fn test_unregistered_party_rejected() {
        let fixture = setup();
        let alice = Address([1u8; 20]);
        let bob = Address([2u8; 20]);
        register(&fixture, alice, bob).await;

        let err = fixture.matches.check_match(alice, bob).await.unwrap_err();
        assert!(matches!(err, MatchError::NotRegistered(who) if who == bob));
    }

    #[tokio::test]
    async fn test_mutual_interest_yields_one() {
        let fixture = setup();
        let alice = Address([1u8; 20]);
        let bob = Address([2u8; 20]);
        register(&fixture, alice, bob).await;
        register(&fixture, bob, alice).await;

        let handle = fixture.matches.check_match(alice, bob).await.unwrap();
        assert_eq!(fixture.engine.plaintext_of(&handle), Some(1));
    }

    #[tokio::test]
    async fn test_one_sided_interest_yields_zero() {
        let fixture = setup();
        let alice = Address([1u8; 20]);
        let bob = Address([2u8; 20]);
        let charlie = Address([3u8; 20]);
        register(&fixture, alice, bob).await;
        register(&fixture, bob, charlie).await;

        let handle = fixture.matches.check_match(alice, bob).await.unwrap();
        assert_eq!(fixture.engine.plaintext_of(&handle), Some(0));
    }

    #[tokio::test]
    async fn test_result_readable_from_both_directions() {
        let fixture = setup();
        let alice = Address([1u8; 20]);
        let bob = Address([2u8; 20]);
        register(&fixture, alice, bob).await;
        register(&fixture, bob, alice).await;

        let handle = fixture.matches.check_match(alice, bob).await.unwrap();
        assert_eq!(fixture.matches.match_result(alice, bob).await, handle);
        assert_eq!(fixture.matches.match_result(bob, alice).await, handle);
    }

    #[tokio::test]
    async fn test_unchecked_pair_reads_zero_handle() {
        let fixture = setup();
        let a = Address([1u8; 20]);
        let b = Address([2u8; 20]);
        assert!(fixture.matches.match_result(a, b).await.is_zero());
    }

    #[tokio::test]
    async fn test_recheck_overwrites_stored_snapshot() {
        let fixture = setup();
        let alice = Address([1u8; 20]);
        let bob = Address([2u8; 20]);
        register(&fixture, alice, bob).await;
        register(&fixture, bob, alice).await;

        let first = fixture.matches.check_match(alice, bob).await.unwrap();
        let again = fixture.matches.check_match(bob, alice).await.unwrap();

        assert_ne!(first, again);
        assert_eq!(fixture.matches.match_result(alice, bob).await, again);
        assert_eq!(fixture.engine.plaintext_of(&again), Some(1));
    }
}
