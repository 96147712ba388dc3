//! Matchmaker - main orchestrator for the confidential matching protocol
//!
//! Coordinates the crush registry, the match engine, and the message store
//! behind the operation surface the display layer consumes. Every mutating
//! operation is atomic: policy checks and state updates happen under one
//! write-lock scope inside the owning component, and reads never block
//! writers.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────┐
//! │     Matchmaker     │
//! └───┬──────┬──────┬──┘
//!     │      │      │
//!     ▼      ▼      ▼
//! Registry Match Messages
//!     └──────┴──────┘
//!            │
//!            ▼
//!   HomomorphicEngine
//! ```

use crate::clock::Clock;
use crate::config::Config;
use crate::core_fhe::{CiphertextHandle, EncryptedInput, HomomorphicEngine};
use crate::core_match::{MatchEngine, MatchOpResult};
use crate::core_messages::{MessageStore, StoreResult};
use crate::core_registry::{CrushRegistry, RegistryResult};
use crate::types::{Address, Timestamp};
use std::sync::Arc;
use tracing::info;

/// Orchestrates all protocol operations for one coordinator context
pub struct Matchmaker {
    registry: Arc<CrushRegistry>,
    matches: Arc<MatchEngine>,
    messages: Arc<MessageStore>,
    coordinator: Address,
}

impl Matchmaker {
    /// Create a matchmaker over an injected engine and clock
    pub fn new(
        engine: Arc<dyn HomomorphicEngine>,
        clock: Arc<dyn Clock>,
        config: Arc<Config>,
        coordinator: Address,
    ) -> Self {
        info!(coordinator = %coordinator, "Creating Matchmaker");

        let registry = Arc::new(CrushRegistry::new(
            engine.clone(),
            clock,
            config.limits.clone(),
            coordinator,
        ));
        let matches = Arc::new(MatchEngine::new(engine.clone(), registry.clone()));
        let messages = Arc::new(MessageStore::new(engine, coordinator));

        Self {
            registry,
            matches,
            messages,
            coordinator,
        }
    }

    /// Coordinator context this matchmaker serves
    pub fn coordinator(&self) -> Address {
        self.coordinator
    }

    /// Store an encrypted crush target for the caller
    pub async fn submit_crush(
        &self,
        caller: Address,
        input: &EncryptedInput,
    ) -> RegistryResult<CiphertextHandle> {
        self.registry.submit(caller, input).await
    }

    /// Compute and store the mutual-match result for a pair
    pub async fn check_match(
        &self,
        caller: Address,
        other: Address,
    ) -> MatchOpResult<CiphertextHandle> {
        self.matches.check_match(caller, other).await
    }

    /// Stored match result for a pair (zero handle if never computed)
    pub async fn match_result(&self, a: Address, b: Address) -> CiphertextHandle {
        self.matches.match_result(a, b).await
    }

    /// Attempts left in the user's current submission window
    pub async fn remaining_attempts(&self, user: Address) -> u32 {
        self.registry.remaining_attempts(user).await
    }

    /// Earliest time the user's next submission can be accepted
    pub async fn next_submission_time(&self, user: Address) -> Timestamp {
        self.registry.next_submission_time(user).await
    }

    /// Whether the user has a live registration
    pub async fn is_registered(&self, user: Address) -> bool {
        self.registry.is_registered(user).await
    }

    /// Handle of the user's stored target (zero handle if none)
    pub async fn target_handle(&self, user: Address) -> CiphertextHandle {
        self.registry.target_handle(user).await
    }

    /// Append an encrypted message from `caller` to `to`
    pub async fn send_message(
        &self,
        caller: Address,
        to: Address,
        input: &EncryptedInput,
    ) -> StoreResult<()> {
        self.messages.send(caller, to, input).await
    }

    /// Flattened chunk handles for one direction, in append order
    pub async fn messages(&self, from: Address, to: Address) -> Vec<CiphertextHandle> {
        self.messages.messages(from, to).await
    }
}
