//! Operator Seed Commitment
//!
//! Commit to the operator seed before any player contribution is known.
//! Reveal it after resolution so anyone can check it against the commitment.

use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::core::hash::{is_digest_hex, sha256_hex, MalformedDigest};

/// Bytes of entropy behind every operator seed (256 bits).
pub const OPERATOR_SEED_BYTES: usize = 32;

/// Secret operator seed.
///
/// 32 random bytes rendered as 64 lowercase hex characters. The hex text,
/// not the raw bytes, is what gets hashed and combined.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperatorSeed(String);

impl OperatorSeed {
    /// Wrap a seed published by an operator.
    ///
    /// No format check: verification hashes whatever text it is given.
    pub fn from_published(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Seed text as hashed and combined.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this looks like a seed produced by [`commit`].
    pub fn is_well_formed(&self) -> bool {
        is_digest_hex(&self.0)
    }

    /// Commitment for this seed.
    pub fn commitment(&self) -> SeedCommitment {
        SeedCommitment(sha256_hex(self.0.as_bytes()))
    }
}

impl fmt::Debug for OperatorSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print the secret.
        write!(f, "OperatorSeed(<redacted>)")
    }
}

/// Commitment = SHA-256(operator seed text), lowercase hex.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SeedCommitment(String);

impl SeedCommitment {
    /// Parse a published commitment. Uppercase hex is normalized.
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

    /// Verify that the given seed produces this commitment.
    pub fn verify(&self, seed: &OperatorSeed) -> bool {
        *self == seed.commitment()
    }
}

impl TryFrom<String> for SeedCommitment {
    type Error = MalformedDigest;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value).ok_or(MalformedDigest(value))
    }
}

impl From<SeedCommitment> for String {
    fn from(commitment: SeedCommitment) -> Self {
        commitment.0
    }
}

impl fmt::Debug for SeedCommitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SeedCommitment({})", self.0.get(..16).unwrap_or(&self.0))
    }
}

impl fmt::Display for SeedCommitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Errors while generating a commitment.
#[derive(Debug, Error)]
pub enum CommitError {
    /// The entropy source failed. The round cannot proceed.
    #[error("entropy source failed: {0}")]
    Entropy(#[from] rand::Error),
}

/// Draw a fresh operator seed from the OS CSPRNG and commit to it.
pub fn commit() -> Result<(OperatorSeed, SeedCommitment), CommitError> {
    commit_with(&mut OsRng)
}

/// Draw a fresh operator seed from the given CSPRNG and commit to it.
pub fn commit_with<R: RngCore + CryptoRng>(
    rng: &mut R,
) -> Result<(OperatorSeed, SeedCommitment), CommitError> {
    let mut bytes = [0u8; OPERATOR_SEED_BYTES];
    rng.try_fill_bytes(&mut bytes)?;

    let seed = OperatorSeed(hex::encode(bytes));
    let commitment = seed.commitment();
    Ok((seed, commitment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_commitment_verification() {
        let (seed, commitment) = commit().unwrap();
        assert!(commitment.verify(&seed));
        assert!(seed.is_well_formed());
    }

    #[test]
    fn test_known_commitment() {
        let seed = OperatorSeed::from_published("deadbeef".repeat(8));
        assert_eq!(
            seed.commitment().as_str(),
            "247d08f3e13938b244f5ecd8966f1778e5e72b175820f46ba86c9c039272affa"
        );
    }

    #[test]
    fn test_fresh_seeds_differ() {
        let (seed1, commitment1) = commit().unwrap();
        let (seed2, commitment2) = commit().unwrap();
        assert_ne!(seed1, seed2);
        assert_ne!(commitment1, commitment2);
    }

    #[test]
    fn test_seeded_rng_is_reproducible() {
        let (a, _) = commit_with(&mut StdRng::seed_from_u64(7)).unwrap();
        let (b, _) = commit_with(&mut StdRng::seed_from_u64(7)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_wrong_seed_fails_verification() {
        let (_, commitment) = commit().unwrap();
        let (other, _) = commit().unwrap();
        assert!(!commitment.verify(&other));
    }

    #[test]
    fn test_debug_redacts_seed() {
        let (seed, _) = commit().unwrap();
        let printed = format!("{:?}", seed);
        assert!(!printed.contains(seed.as_str()));
    }

    #[test]
    fn test_from_hex_rejects_malformed() {
        assert!(SeedCommitment::from_hex("not-a-hash").is_none());
        let (_, commitment) = commit().unwrap();
        let upper = commitment.as_str().to_ascii_uppercase();
        assert_eq!(SeedCommitment::from_hex(&upper), Some(commitment));
    }

    #[test]
    fn test_deserialize_checks_format() {
        let non_ascii = format!("\"a{}\"", "é".repeat(12));
        assert!(serde_json::from_str::<SeedCommitment>(&non_ascii).is_err());

        let (_, commitment) = commit().unwrap();
        let upper = format!("\"{}\"", commitment.as_str().to_ascii_uppercase());
        assert_eq!(serde_json::from_str::<SeedCommitment>(&upper).unwrap(), commitment);
    }
}
