//! Fairness Hashing
//!
//! Provides the one-way hash used for:
//! - Operator seed commitments
//! - The fairness digest of a combined seed
//!
//! The algorithm (SHA-256) and the encoding (lowercase hex) are part of the
//! published algorithm. Changing either invalidates every published round.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;

/// Raw hash output (256 bits / 32 bytes).
pub type HashBytes = [u8; 32];

/// Length of a hex-encoded SHA-256 digest.
pub const DIGEST_HEX_LEN: usize = 64;

/// Compute SHA-256 over arbitrary bytes.
pub fn hash_bytes(data: &[u8]) -> HashBytes {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Compute SHA-256 over arbitrary bytes and encode as lowercase hex.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(hash_bytes(data))
}

/// Check that a string is a well-formed lowercase hex SHA-256 digest.
pub fn is_digest_hex(value: &str) -> bool {
    value.len() == DIGEST_HEX_LEN
        && value.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

/// A published hash that is not 64 hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("expected 64 hex characters, got {0:?}")]
pub struct MalformedDigest(pub String);

/// Hash of a combined seed, the sole randomness source of a round.
///
/// Always 64 lowercase hex characters, including after deserialization.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FairnessDigest(String);

impl FairnessDigest {
    /// Parse a digest published elsewhere.
    ///
    /// Uppercase input is accepted and normalized. Returns `None` unless the
    /// value is exactly 64 hex characters.
    pub fn from_hex(value: &str) -> Option<Self> {
        let lowered = value.to_ascii_lowercase();
        if is_digest_hex(&lowered) {
            Some(Self(lowered))
        } else {
            None
        }
    }

    /// Hex string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Wrap any string, skipping the format check.
    #[cfg(test)]
    pub(crate) fn unchecked(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl TryFrom<String> for FairnessDigest {
    type Error = MalformedDigest;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value).ok_or(MalformedDigest(value))
    }
}

impl From<FairnessDigest> for String {
    fn from(digest: FairnessDigest) -> Self {
        digest.0
    }
}

impl fmt::Debug for FairnessDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FairnessDigest({})", self.0.get(..16).unwrap_or(&self.0))
    }
}

impl fmt::Display for FairnessDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Apply the fairness hash to a combined seed.
///
/// Single SHA-256 application over the UTF-8 bytes. Pure and stateless.
pub fn digest(combined_seed: &str) -> FairnessDigest {
    FairnessDigest(sha256_hex(combined_seed.as_bytes()))
}

// =============================================================================
// TESTS
// =============================================================================
