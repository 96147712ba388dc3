//! Crush registry - per-user encrypted target storage with rate governance
//!
//! One record per principal. The stored target is an opaque ciphertext
//! handle; only the latest accepted submission is live, and its access list
//! names the owner alone. Submissions are governed by a cooldown between
//! consecutive accepts and an attempt budget inside a rolling window that
//! re-anchors each time it fully elapses.

use crate::clock::Clock;
use crate::config::LimitsConfig;
use crate::core_fhe::{CiphertextHandle, EncryptedInput, HomomorphicEngine, InputContext};
use crate::core_registry::errors::{RegistryError, RegistryResult};
use crate::types::{Address, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Per-user registry record
///
/// Created on first accepted submission, mutated on every later accept,
/// never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrushRecord {
    /// Record owner
    pub owner: Address,

    /// Handle of the live encrypted target
    pub target: CiphertextHandle,

    /// Whether the owner has ever submitted successfully
    pub registered: bool,

    /// Time of the last accepted submission
    pub last_submission: Timestamp,

    /// Anchor of the current rolling window
    pub window_start: Timestamp,

    /// Accepted submissions inside the current window
    pub attempts_in_window: u32,
}

/// Rate-limited store of encrypted crush targets
pub struct CrushRegistry {
    engine: Arc<dyn HomomorphicEngine>,
    clock: Arc<dyn Clock>,
    limits: LimitsConfig,
    coordinator: Address,
    records: RwLock<HashMap<Address, CrushRecord>>,
}

impl CrushRegistry {
    /// Create a registry bound to one coordinator context
    pub fn new(
        engine: Arc<dyn HomomorphicEngine>,
        clock: Arc<dyn Clock>,
        limits: LimitsConfig,
        coordinator: Address,
    ) -> Self {
        Self {
            engine,
            clock,
            limits,
            coordinator,
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Submit an encrypted crush target
    ///
    /// The input is engine-verified before any state is read or written.
    /// The first submission for a principal is accepted unconditionally;
    /// later ones are subject to the cooldown and the window budget. On
    /// accept, the new target replaces the previous one and its access list
    /// is restricted to the owner.
    pub async fn submit(
        &self,
        caller: Address,
        input: &EncryptedInput,
    ) -> RegistryResult<CiphertextHandle> {
        let context = InputContext {
            coordinator: self.coordinator,
            principal: caller,
        };
        let handles = self.engine.verify_input(input, &context).await?;
        if handles.len() != 1 {
            return Err(RegistryError::UnexpectedInputWidth(handles.len()));
        }
        let target = handles[0];

        let mut records = self.records.write().await;
        let now = self.clock.now();

        match records.entry(caller) {
            std::collections::hash_map::Entry::Occupied(mut entry) => {
                let record = entry.get();

                let since_last = now.seconds_since(record.last_submission);
                if since_last < self.limits.submission_cooldown.as_secs() {
                    warn!(caller = %caller, since_last, "Submission rejected: cooldown");
                    return Err(RegistryError::CooldownNotElapsed {
                        retry_at: record.last_submission.plus(self.limits.submission_cooldown),
                    });
                }

                // Decide the re-anchor without mutating, so a rejection
                // leaves the record byte-for-byte untouched
                let window_elapsed = now.seconds_since(record.window_start)
                    >= self.limits.submission_window.as_secs();
                let attempts = if window_elapsed {
                    0
                } else {
                    record.attempts_in_window
                };

                if attempts >= self.limits.max_daily_attempts {
                    warn!(caller = %caller, "Submission rejected: attempt budget exhausted");
                    return Err(RegistryError::RateLimited {
                        window_resets_at: record.window_start.plus(self.limits.submission_window),
                    });
                }

                self.engine.allow(&target, caller).await?;

                let record = entry.get_mut();
                if window_elapsed {
                    debug!(caller = %caller, "Re-anchoring submission window");
                    record.window_start = now;
                }
                record.target = target;
                record.attempts_in_window = attempts + 1;
                record.last_submission = now;
            }
            std::collections::hash_map::Entry::Vacant(entry) => {
                self.engine.allow(&target, caller).await?;
                entry.insert(CrushRecord {
                    owner: caller,
                    target,
                    registered: true,
                    last_submission: now,
                    window_start: now,
                    attempts_in_window: 1,
                });
            }
        }

        info!(caller = %caller, target = %target, "Crush target stored");
        Ok(target)
    }

    /// Attempts left in the caller's current window
    pub async fn remaining_attempts(&self, user: Address) -> u32 {
        let records = self.records.read().await;
        match records.get(&user) {
            Some(record) => {
                let now = self.clock.now();
                if now.seconds_since(record.window_start)
                    >= self.limits.submission_window.as_secs()
                {
                    self.limits.max_daily_attempts
                } else {
                    self.limits
                        .max_daily_attempts
                        .saturating_sub(record.attempts_in_window)
                }
            }
            None => self.limits.max_daily_attempts,
        }
    }

    /// Earliest time the next submission can be accepted
    ///
    /// `last_submission + cooldown`, with a zero last submission for users
    /// that have never submitted.
    pub async fn next_submission_time(&self, user: Address) -> Timestamp {
        let last = self
            .records
            .read()
            .await
            .get(&user)
            .map(|r| r.last_submission)
            .unwrap_or_default();
        last.plus(self.limits.submission_cooldown)
    }

    /// Whether the user has a live registration
    pub async fn is_registered(&self, user: Address) -> bool {
        self.records
            .read()
            .await
            .get(&user)
            .map(|r| r.registered)
            .unwrap_or(false)
    }

    /// Handle of the user's stored target (zero handle if none)
    ///
    /// The target itself is never disclosed; this only reports that one
    /// exists.
    pub async fn target_handle(&self, user: Address) -> CiphertextHandle {
        self.records
            .read()
            .await
            .get(&user)
            .map(|r| r.target)
            .unwrap_or(CiphertextHandle::ZERO)
    }

    /// Live target of a registered user, for homomorphic evaluation
    pub(crate) async fn live_target(&self, user: Address) -> Option<CiphertextHandle> {
        self.records
            .read()
            .await
            .get(&user)
            .filter(|r| r.registered)
            .map(|r| r.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::core_fhe::MockFheEngine;

    fn coordinator() -> Address {
        Address([0xc0; 20])
    }

    fn setup() -> (CrushRegistry, Arc<MockFheEngine>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let engine = Arc::new(MockFheEngine::new(clock.clone()));
        let registry = CrushRegistry::new(
            engine.clone(),
            clock.clone(),
            LimitsConfig::default(),
            coordinator(),
        );
        (registry, engine, clock)
    }

    async fn encrypt_target(
        engine: &MockFheEngine,
        caller: Address,
        value: u32,
    ) -> EncryptedInput {
        engine
            .encrypt(
                &InputContext {
                    coordinator: coordinator(),
                    principal: caller,
                },
                &[value],
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_first_submission_registers() {
        let (registry, engine, _clock) = setup();
        let alice = Address([1u8; 20]);

        let input = encrypt_target(&engine, alice, 7).await;
        let target = registry.submit(alice, &input).await.unwrap();

        assert!(registry.is_registered(alice).await);
        assert_eq!(registry.target_handle(alice).await, target);
        assert_eq!(registry.remaining_attempts(alice).await, 9);
    }

    #[tokio::test]
    async fn test_unregistered_reads() {
        let (registry, _engine, _clock) = setup();
        let ghost = Address([9u8; 20]);

        assert!(!registry.is_registered(ghost).await);
        assert!(registry.target_handle(ghost).await.is_zero());
        assert_eq!(registry.remaining_attempts(ghost).await, 10);
        assert_eq!(
            registry.next_submission_time(ghost).await,
            Timestamp::from_secs(0).plus(LimitsConfig::default().submission_cooldown)
        );
    }

    #[tokio::test]
    async fn test_cooldown_enforced() {
        let (registry, engine, clock) = setup();
        let alice = Address([1u8; 20]);

        let input = encrypt_target(&engine, alice, 7).await;
        registry.submit(alice, &input).await.unwrap();

        let retry = encrypt_target(&engine, alice, 8).await;
        let err = registry.submit(alice, &retry).await.unwrap_err();
        assert!(matches!(err, RegistryError::CooldownNotElapsed { .. }));

        clock.advance(3_600);
        registry.submit(alice, &retry).await.unwrap();
        assert_eq!(registry.remaining_attempts(alice).await, 8);
    }

    #[tokio::test]
    async fn test_attempt_budget_and_window_reanchor() {
        let (registry, engine, clock) = setup();
        let alice = Address([1u8; 20]);

        for i in 0..10 {
            let input = encrypt_target(&engine, alice, i).await;
            registry.submit(alice, &input).await.unwrap();
            clock.advance(3_600);
        }
        assert_eq!(registry.remaining_attempts(alice).await, 0);

        // 11th accepted submission inside the window fails
        let eleventh = encrypt_target(&engine, alice, 11).await;
        let err = registry.submit(alice, &eleventh).await.unwrap_err();
        assert!(matches!(err, RegistryError::RateLimited { .. }));

        // After the window elapses the budget re-anchors and cooldown governs
        clock.advance(24 * 3_600);
        assert_eq!(registry.remaining_attempts(alice).await, 10);
        registry.submit(alice, &eleventh).await.unwrap();
        assert_eq!(registry.remaining_attempts(alice).await, 9);
    }

    #[tokio::test]
    async fn test_only_latest_target_is_live() {
        let (registry, engine, clock) = setup();
        let alice = Address([1u8; 20]);

        let first = encrypt_target(&engine, alice, 7).await;
        let first_handle = registry.submit(alice, &first).await.unwrap();

        clock.advance(3_600);
        let second = encrypt_target(&engine, alice, 8).await;
        let second_handle = registry.submit(alice, &second).await.unwrap();

        assert_ne!(first_handle, second_handle);
        assert_eq!(registry.target_handle(alice).await, second_handle);
        assert_eq!(registry.live_target(alice).await, Some(second_handle));
    }

    #[tokio::test]
    async fn test_rejected_input_leaves_state_untouched() {
        let (registry, engine, _clock) = setup();
        let alice = Address([1u8; 20]);
        let mallory = Address([2u8; 20]);

        // Input encrypted for mallory, replayed by alice
        let stolen = encrypt_target(&engine, mallory, 7).await;
        let err = registry.submit(alice, &stolen).await.unwrap_err();
        assert!(matches!(err, RegistryError::InvalidCiphertext(_)));

        assert!(!registry.is_registered(alice).await);
        assert_eq!(registry.remaining_attempts(alice).await, 10);
    }

    #[tokio::test]
    async fn test_multi_word_input_rejected() {
        let (registry, engine, _clock) = setup();
        let alice = Address([1u8; 20]);

        let wide = engine
            .encrypt(
                &InputContext {
                    coordinator: coordinator(),
                    principal: alice,
                },
                &[1, 2],
            )
            .await
            .unwrap();
        let err = registry.submit(alice, &wide).await.unwrap_err();
        assert!(matches!(err, RegistryError::UnexpectedInputWidth(2)));
    }

    #[tokio::test]
    async fn test_next_submission_time_tracks_cooldown() {
        let (registry, engine, clock) = setup();
        let alice = Address([1u8; 20]);

        let input = encrypt_target(&engine, alice, 7).await;
        registry.submit(alice, &input).await.unwrap();

        let expected = clock.now().plus(LimitsConfig::default().submission_cooldown);
        assert_eq!(registry.next_submission_time(alice).await, expected);
    }
}
