//! Core deterministic primitives.
//!
//! All types in this module are pure and platform-independent.
//! They form the foundation every published round is verified against.

pub mod hash;
pub mod multiplier;

// Re-export core types
pub use hash::{digest, sha256_hex, FairnessDigest};
pub use multiplier::Multiplier;
