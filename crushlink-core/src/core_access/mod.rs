//! Access control for authorized decryption
//!
//! Every ciphertext this core produces carries an access list fixed at
//! creation time. Disclosure is a two-step protocol: the principal obtains a
//! reusable [`SessionAuthorization`] signed by its long-term identity, then
//! presents ciphertext handles plus that credential to the homomorphic
//! engine, which checks both the access list and the credential before
//! releasing plaintext.

pub mod cache;
pub mod session;
pub mod signer;

// Re-exports
pub use cache::{AuthorizationCache, SessionEntry};
pub use session::{SessionAuthError, SessionAuthorization};
pub use signer::{LocalSigner, SessionSigner};
