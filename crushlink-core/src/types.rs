//! Common types shared across the crushlink core
//!
//! Defines:
//! - Principal addresses and their 32-bit projection
//! - Ledger timestamps

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// A 20-byte principal identity on the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The null address; never a valid principal
    pub const ZERO: Address = Address([0u8; 20]);

    /// Create an address from raw bytes
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Address(bytes)
    }

    /// Derive an address from an ed25519 verifying key
    /// (last 20 bytes of the key's SHA-256 digest)
    pub fn from_verifying_key(key: &ed25519_dalek::VerifyingKey) -> Self {
        let digest = Sha256::digest(key.as_bytes());
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&digest[12..]);
        Address(bytes)
    }

    /// Whether this is the null address
    pub fn is_zero(&self) -> bool {
        *self == Address::ZERO
    }

    /// Raw bytes of the address
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Low 32 bits of the address's canonical numeric value.
    ///
    /// This lossy projection is the plaintext domain for crush targets:
    /// distinct addresses sharing the low 32 bits would collide. The narrow
    /// width is part of the wire format and must match on every caller.
    pub fn low_u32(&self) -> u32 {
        u32::from_be_bytes([self.0[16], self.0[17], self.0[18], self.0[19]])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// Error parsing an address from its hex representation
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("invalid address: {0}")]
pub struct ParseAddressError(pub String);

impl FromStr for Address {
    type Err = ParseAddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let raw = hex::decode(stripped).map_err(|e| ParseAddressError(e.to_string()))?;
        if raw.len() != 20 {
            return Err(ParseAddressError(format!(
                "expected 20 bytes, got {}",
                raw.len()
            )));
        }
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&raw);
        Ok(Address(bytes))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// Unix timestamp in seconds
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// Create a timestamp from seconds since epoch
    pub fn from_secs(secs: u64) -> Self {
        Timestamp(secs)
    }

    /// Seconds since epoch
    pub fn as_secs(&self) -> u64 {
        self.0
    }

    /// Seconds elapsed since `earlier` (zero if `earlier` is in the future)
    pub fn seconds_since(&self, earlier: Timestamp) -> u64 {
        self.0.saturating_sub(earlier.0)
    }

    /// This timestamp shifted forward by a duration
    pub fn plus(&self, duration: Duration) -> Timestamp {
        Timestamp(self.0.saturating_add(duration.as_secs()))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
