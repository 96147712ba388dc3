//! Opaque ciphertext handles

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Opaque reference to an encrypted value held by the homomorphic engine
///
/// A handle is never the plaintext; it only names a ciphertext. The all-zero
/// handle is reserved to mean "no value was ever computed here".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CiphertextHandle(pub [u8; 32]);

impl CiphertextHandle {
    /// Reserved handle meaning "never computed"
    pub const ZERO: CiphertextHandle = CiphertextHandle([0u8; 32]);

    /// Create a handle from raw bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        CiphertextHandle(bytes)
    }

    /// Whether this is the reserved zero handle
    pub fn is_zero(&self) -> bool {
        *self == CiphertextHandle::ZERO
    }

    /// Raw bytes of the handle
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for CiphertextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl Serialize for CiphertextHandle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for CiphertextHandle {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let stripped = s.strip_prefix("0x").unwrap_or(&s);
        let raw = hex::decode(stripped).map_err(de::Error::custom)?;
        if raw.len() != 32 {
            return Err(de::Error::custom(format!(
                "expected 32 bytes, got {}",
                raw.len()
            )));
        }
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&raw);
        Ok(CiphertextHandle(bytes))
    }
}
