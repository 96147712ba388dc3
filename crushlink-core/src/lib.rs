//! crushlink-core - confidential mutual-match protocol
//!
//! Two parties each privately name a person they are interested in; a mutual
//! interest is revealed only if both named each other, and nothing is
//! disclosed otherwise. The crate coordinates a rate-limited registry of
//! encrypted crush targets, a homomorphic equality/conjunction match engine,
//! creation-time access lists with session-authorized decryption, a
//! fixed-width message codec, and an append-only encrypted message store.
//! The homomorphic primitive itself is consumed behind
//! [`core_fhe::HomomorphicEngine`]; an in-process mock backs tests and
//! local demos.

pub mod clock;
pub mod config;
pub mod core_access;
pub mod core_client;
pub mod core_codec;
pub mod core_fhe;
pub mod core_match;
pub mod core_messages;
pub mod core_protocol;
pub mod core_registry;
pub mod logging;
pub mod types;

// Re-exports
pub use core_protocol::Matchmaker;
pub use logging::{init_logging, init_logging_with_config, LogLevel};
pub use types::{Address, Timestamp};
