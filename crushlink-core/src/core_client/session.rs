//! Client session - caller-side orchestration of protocol operations
//!
//! Single-threaded cooperative: each operation class carries an exclusive
//! in-flight flag, and a second invocation while one is pending is reported
//! as skipped rather than queued. Every asynchronous step re-validates the
//! captured [`RequestContext`] before acting on its result. Decryption
//! retries transient engine failures with bounded attempts and fixed
//! backoff; nothing else is retried.

use crate::clock::Clock;
use crate::config::{ClientConfig, Config};
use crate::core_access::{AuthorizationCache, SessionSigner};
use crate::core_client::context::{ContextWatch, RequestContext};
use crate::core_client::errors::{ClientError, ClientResult};
use crate::core_codec::{self, MAX_MESSAGE_CHARS};
use crate::core_fhe::{CiphertextHandle, HomomorphicEngine, InputContext};
use crate::core_protocol::Matchmaker;
use crate::types::{Address, Timestamp};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Why a requested operation did not run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// An operation of a conflicting class is already in flight
    Busy,

    /// The execution context changed while the operation was in flight;
    /// its result was discarded
    StaleContext,
}

/// Result of an operation that may be skipped instead of run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// The operation ran to completion
    Completed(T),

    /// The operation was skipped; no side effect was applied client-side
    Skipped(SkipReason),
}

impl<T> Outcome<T> {
    /// The completed value, if any
    pub fn completed(self) -> Option<T> {
        match self {
            Outcome::Completed(value) => Some(value),
            Outcome::Skipped(_) => None,
        }
    }

    /// Whether the operation ran to completion
    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed(_))
    }
}

/// What a completed submission reports back
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitReceipt {
    /// Handle of the stored target
    pub target: CiphertextHandle,

    /// Attempts left in the current window, read after the submit
    pub remaining_attempts: u32,

    /// Earliest accepted time for the next submission
    pub next_submission_time: Timestamp,
}

/// A decrypted match result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchOutcome {
    /// Handle the clear value was read from
    pub handle: CiphertextHandle,

    /// Whether both parties named each other
    pub is_match: bool,
}

/// One decoded message with its direction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationEntry {
    /// Sender
    pub from: Address,

    /// Recipient
    pub to: Address,

    /// Decoded text
    pub text: String,
}

struct OpFlag(AtomicBool);

impl OpFlag {
    fn new() -> Self {
        OpFlag(AtomicBool::new(false))
    }

    fn try_acquire(&self) -> Option<OpGuard<'_>> {
        self.0
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()?;
        Some(OpGuard(&self.0))
    }

    fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

struct OpGuard<'a>(&'a AtomicBool);

impl Drop for OpGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

struct InFlight {
    submitting: OpFlag,
    checking: OpFlag,
    decrypting: OpFlag,
    sending: OpFlag,
    loading: OpFlag,
}

impl InFlight {
    fn new() -> Self {
        Self {
            submitting: OpFlag::new(),
            checking: OpFlag::new(),
            decrypting: OpFlag::new(),
            sending: OpFlag::new(),
            loading: OpFlag::new(),
        }
    }
}

/// Caller-side session over one matchmaker deployment
pub struct ClientSession {
    matchmaker: Arc<Matchmaker>,
    engine: Arc<dyn HomomorphicEngine>,
    signer: Arc<dyn SessionSigner>,
    clock: Arc<dyn Clock>,
    auth_cache: AuthorizationCache,
    retry: ClientConfig,
    watch: ContextWatch,
    flags: InFlight,
    last_match: Mutex<Option<MatchOutcome>>,
}

impl ClientSession {
    /// Create a session for the signer's principal
    pub fn new(
        matchmaker: Arc<Matchmaker>,
        engine: Arc<dyn HomomorphicEngine>,
        signer: Arc<dyn SessionSigner>,
        clock: Arc<dyn Clock>,
        config: &Config,
        watch: ContextWatch,
    ) -> Self {
        info!(principal = %signer.principal(), "Creating client session");

        Self {
            matchmaker,
            engine,
            signer,
            clock,
            auth_cache: AuthorizationCache::new(config.access.authorization_validity),
            retry: config.client.clone(),
            watch,
            flags: InFlight::new(),
            last_match: Mutex::new(None),
        }
    }

    /// The watch this session validates its snapshots against
    pub fn watch(&self) -> &ContextWatch {
        &self.watch
    }

    /// Encrypt and submit a crush target, then refresh rate-limit state
    pub async fn submit_crush(&self, target: Address) -> ClientResult<Outcome<SubmitReceipt>> {
        if self.flags.checking.is_set() {
            return Ok(Outcome::Skipped(SkipReason::Busy));
        }
        let Some(_guard) = self.flags.submitting.try_acquire() else {
            return Ok(Outcome::Skipped(SkipReason::Busy));
        };

        if target.is_zero() {
            return Err(ClientError::InvalidTarget);
        }

        let snapshot = self.watch.current();
        debug!(principal = %snapshot.principal, "Encrypting crush target");

        let context = InputContext {
            coordinator: self.matchmaker.coordinator(),
            principal: snapshot.principal,
        };
        let input = self.engine.encrypt(&context, &[target.low_u32()]).await?;

        if !self.watch.is_current(&snapshot) {
            return Ok(Outcome::Skipped(SkipReason::StaleContext));
        }

        let stored = self
            .matchmaker
            .submit_crush(snapshot.principal, &input)
            .await?;

        if !self.watch.is_current(&snapshot) {
            return Ok(Outcome::Skipped(SkipReason::StaleContext));
        }

        let remaining_attempts = self.matchmaker.remaining_attempts(snapshot.principal).await;
        let next_submission_time = self
            .matchmaker
            .next_submission_time(snapshot.principal)
            .await;

        Ok(Outcome::Completed(SubmitReceipt {
            target: stored,
            remaining_attempts,
            next_submission_time,
        }))
    }

    /// Run a match check against `other` and auto-decrypt the result
    pub async fn check_match(&self, other: Address) -> ClientResult<Outcome<MatchOutcome>> {
        if self.flags.submitting.is_set() {
            return Ok(Outcome::Skipped(SkipReason::Busy));
        }
        let Some(_guard) = self.flags.checking.try_acquire() else {
            return Ok(Outcome::Skipped(SkipReason::Busy));
        };

        let snapshot = self.watch.current();
        let handle = self
            .matchmaker
            .check_match(snapshot.principal, other)
            .await?;

        if !self.watch.is_current(&snapshot) {
            return Ok(Outcome::Skipped(SkipReason::StaleContext));
        }

        self.decrypt_result_inner(&snapshot, handle).await
    }

    /// Decrypt a match result handle
    ///
    /// A zero handle short-circuits to "no match" without engine contact,
    /// and a handle that was already decrypted is served from the session's
    /// last result.
    pub async fn decrypt_match_result(
        &self,
        handle: CiphertextHandle,
    ) -> ClientResult<Outcome<MatchOutcome>> {
        let Some(_guard) = self.flags.decrypting.try_acquire() else {
            return Ok(Outcome::Skipped(SkipReason::Busy));
        };

        let snapshot = self.watch.current();
        self.decrypt_result_inner(&snapshot, handle).await
    }

    async fn decrypt_result_inner(
        &self,
        snapshot: &RequestContext,
        handle: CiphertextHandle,
    ) -> ClientResult<Outcome<MatchOutcome>> {
        if handle.is_zero() {
            return Ok(Outcome::Completed(MatchOutcome {
                handle,
                is_match: false,
            }));
        }

        if let Some(cached) = self.last_match.lock().unwrap().clone() {
            if cached.handle == handle {
                return Ok(Outcome::Completed(cached));
            }
        }

        let entry = self.auth_cache.load_or_sign(
            self.signer.as_ref(),
            &[self.matchmaker.coordinator()],
            self.clock.now(),
        );

        if !self.watch.is_current(snapshot) {
            return Ok(Outcome::Skipped(SkipReason::StaleContext));
        }

        let values = self
            .decrypt_with_retry(&[handle], &entry.authorization)
            .await?;

        if !self.watch.is_current(snapshot) {
            return Ok(Outcome::Skipped(SkipReason::StaleContext));
        }

        let outcome = MatchOutcome {
            handle,
            is_match: values[0] == 1,
        };
        *self.last_match.lock().unwrap() = Some(outcome.clone());

        info!(
            handle = %outcome.handle,
            is_match = outcome.is_match,
            "Match result decrypted"
        );
        Ok(Outcome::Completed(outcome))
    }

    /// Encode, encrypt, and send a text message
    pub async fn send_message(&self, to: Address, text: &str) -> ClientResult<Outcome<()>> {
        if self.flags.submitting.is_set() || self.flags.checking.is_set() {
            return Ok(Outcome::Skipped(SkipReason::Busy));
        }
        let Some(_guard) = self.flags.sending.try_acquire() else {
            return Ok(Outcome::Skipped(SkipReason::Busy));
        };

        if text.trim().is_empty() {
            return Err(ClientError::EmptyMessage);
        }
        let chars = text.chars().count();
        if chars > MAX_MESSAGE_CHARS {
            return Err(ClientError::MessageTooLong {
                chars,
                max: MAX_MESSAGE_CHARS,
            });
        }

        let snapshot = self.watch.current();
        let words = core_codec::encode(text)?;

        let context = InputContext {
            coordinator: self.matchmaker.coordinator(),
            principal: snapshot.principal,
        };
        let input = self.engine.encrypt(&context, &words).await?;

        if !self.watch.is_current(&snapshot) {
            return Ok(Outcome::Skipped(SkipReason::StaleContext));
        }

        self.matchmaker
            .send_message(snapshot.principal, to, &input)
            .await?;

        Ok(Outcome::Completed(()))
    }

    /// Fetch, decrypt, and decode both directions of a conversation
    ///
    /// Entries are grouped by direction (own messages first); interleaving
    /// across directions is the display layer's concern.
    pub async fn load_conversation(
        &self,
        other: Address,
    ) -> ClientResult<Outcome<Vec<ConversationEntry>>> {
        let Some(_guard) = self.flags.loading.try_acquire() else {
            return Ok(Outcome::Skipped(SkipReason::Busy));
        };

        let snapshot = self.watch.current();
        let me = snapshot.principal;

        let outgoing = self.matchmaker.messages(me, other).await;
        let incoming = self.matchmaker.messages(other, me).await;
        if outgoing.is_empty() && incoming.is_empty() {
            return Ok(Outcome::Completed(vec![]));
        }

        let entry = self.auth_cache.load_or_sign(
            self.signer.as_ref(),
            &[self.matchmaker.coordinator()],
            self.clock.now(),
        );

        if !self.watch.is_current(&snapshot) {
            return Ok(Outcome::Skipped(SkipReason::StaleContext));
        }

        let mut entries = Vec::new();
        for (handles, from, to) in [(outgoing, me, other), (incoming, other, me)] {
            if handles.is_empty() {
                continue;
            }
            let words = self
                .decrypt_with_retry(&handles, &entry.authorization)
                .await?;
            for text in core_codec::decode_many(&words) {
                entries.push(ConversationEntry { from, to, text });
            }
        }

        if !self.watch.is_current(&snapshot) {
            return Ok(Outcome::Skipped(SkipReason::StaleContext));
        }

        Ok(Outcome::Completed(entries))
    }

    async fn decrypt_with_retry(
        &self,
        handles: &[CiphertextHandle],
        authorization: &crate::core_access::SessionAuthorization,
    ) -> ClientResult<Vec<u32>> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.engine.user_decrypt(handles, authorization).await {
                Ok(values) => return Ok(values),
                Err(crate::core_fhe::FheError::Transient(reason))
                    if attempt < self.retry.decrypt_attempts =>
                {
                    debug!(attempt, %reason, "Transient decryption failure; backing off");
                    tokio::time::sleep(self.retry.decrypt_backoff).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}
