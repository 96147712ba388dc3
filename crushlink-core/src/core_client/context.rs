//! Execution-context snapshots for staleness guards
//!
//! The network and the active identity can change underneath an in-flight
//! operation. Each operation captures a [`RequestContext`] when it starts
//! and compares it against the shared [`ContextWatch`] before committing any
//! side effect; on mismatch the result is discarded, never applied. This is
//! a staleness guard, not a rollback: a transaction already submitted to
//! the ledger may still commit.

use crate::types::Address;
use std::sync::{Arc, RwLock};

/// Versioned snapshot of the execution context at operation start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestContext {
    /// Network the operation was issued against
    pub chain_id: u64,

    /// Identity the operation acts for
    pub principal: Address,
}

/// Shared view of the current execution context
///
/// Explicit state handed to each operation; intentionally not a module-level
/// cell.
#[derive(Clone)]
pub struct ContextWatch {
    inner: Arc<RwLock<RequestContext>>,
}

impl ContextWatch {
    /// Create a watch with an initial context
    pub fn new(initial: RequestContext) -> Self {
        Self {
            inner: Arc::new(RwLock::new(initial)),
        }
    }

    /// Snapshot the current context
    pub fn current(&self) -> RequestContext {
        *self.inner.read().unwrap()
    }

    /// Replace the current context (network switch, identity change)
    pub fn update(&self, context: RequestContext) {
        *self.inner.write().unwrap() = context;
    }

    /// Whether a snapshot still describes the current context
    pub fn is_current(&self, snapshot: &RequestContext) -> bool {
        *self.inner.read().unwrap() == *snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(chain_id: u64, byte: u8) -> RequestContext {
        RequestContext {
            chain_id,
            principal: Address([byte; 20]),
        }
    }

    #[test]
    fn test_snapshot_tracks_updates() {
        let watch = ContextWatch::new(context(1, 0xaa));
        let snapshot = watch.current();
        assert!(watch.is_current(&snapshot));

        watch.update(context(1, 0xbb));
        assert!(!watch.is_current(&snapshot));
        assert!(watch.is_current(&watch.current()));
    }

    #[test]
    fn test_chain_switch_invalidates_snapshot() {
        let watch = ContextWatch::new(context(1, 0xaa));
        let snapshot = watch.current();

        watch.update(context(5, 0xaa));
        assert!(!watch.is_current(&snapshot));
    }

    #[test]
    fn test_clones_share_state() {
        let watch = ContextWatch::new(context(1, 0xaa));
        let other = watch.clone();
        let snapshot = watch.current();

        other.update(context(2, 0xaa));
        assert!(!watch.is_current(&snapshot));
    }
}
