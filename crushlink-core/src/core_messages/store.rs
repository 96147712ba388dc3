//! Message store - append-only per-direction log of encrypted chunks
//!
//! Each send appends one chunk set (sentinel-delimited by the codec) under
//! the directed key `(from, to)`. Chunk sets are never mutated or deleted;
//! a conversation is the pair of directed logs, merged by the display layer.

use crate::core_codec::MAX_MESSAGE_WORDS;
use crate::core_fhe::{CiphertextHandle, EncryptedInput, HomomorphicEngine, InputContext};
use crate::core_messages::errors::{StoreError, StoreResult};
use crate::types::Address;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

type DirectedKey = (Address, Address);

/// Append-only store of encrypted message chunk sets
pub struct MessageStore {
    engine: Arc<dyn HomomorphicEngine>,
    coordinator: Address,
    logs: RwLock<HashMap<DirectedKey, Vec<Vec<CiphertextHandle>>>>,
}

impl MessageStore {
    /// Create a store bound to one coordinator context
    pub fn new(engine: Arc<dyn HomomorphicEngine>, coordinator: Address) -> Self {
        Self {
            engine,
            coordinator,
            logs: RwLock::new(HashMap::new()),
        }
    }

    /// Append one encrypted message under `(caller, to)`
    ///
    /// Policy checks run before proof verification, and everything runs
    /// before any append; a failed send leaves the log untouched. Both the
    /// sender and the recipient are granted decryption on every chunk.
    pub async fn send(
        &self,
        caller: Address,
        to: Address,
        input: &EncryptedInput,
    ) -> StoreResult<()> {
        if to.is_zero() {
            return Err(StoreError::InvalidRecipient);
        }
        if input.handles.is_empty() {
            return Err(StoreError::EmptyMessage);
        }
        if input.handles.len() > MAX_MESSAGE_WORDS {
            warn!(
                caller = %caller,
                chunks = input.handles.len(),
                "Message rejected: over the chunk cap"
            );
            return Err(StoreError::TooLong {
                chunks: input.handles.len(),
                max: MAX_MESSAGE_WORDS,
            });
        }

        let context = InputContext {
            coordinator: self.coordinator,
            principal: caller,
        };
        let handles = self.engine.verify_input(input, &context).await?;

        for handle in &handles {
            self.engine.allow(handle, caller).await?;
            self.engine.allow(handle, to).await?;
        }

        let mut logs = self.logs.write().await;
        logs.entry((caller, to)).or_default().push(handles.clone());

        info!(
            from = %caller,
            to = %to,
            chunks = handles.len(),
            "Message chunk set appended"
        );
        Ok(())
    }

    /// All chunk handles sent from `from` to `to`, flattened in append order
    pub async fn messages(&self, from: Address, to: Address) -> Vec<CiphertextHandle> {
        self.logs
            .read()
            .await
            .get(&(from, to))
            .map(|sets| sets.iter().flatten().copied().collect())
            .unwrap_or_default()
    }
}
