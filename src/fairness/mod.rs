//! Fairness Engine
//!
//! Commit-reveal pipeline from operator seed to multiplier.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    FAIRNESS ENGINE                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  params.rs      - Published algorithm constants             │
//! │  commitment.rs  - Operator seed + SHA-256 commitment        │
//! │  combiner.rs    - Contribution validation and ordering      │
//! │  transform.rs   - Digest prefix -> crash curve -> clamp     │
//! │  verify.rs      - Recompute and compare a published round   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every function here is pure over its arguments. No state is shared
//! between rounds.

pub mod params;
pub mod commitment;
pub mod combiner;
pub mod transform;
pub mod verify;

// Re-export key types
pub use params::{FairnessParams, ParamsError, ALGORITHM_VERSION};
pub use commitment::{commit, commit_with, CommitError, OperatorSeed, SeedCommitment};
pub use combiner::{canonical_order, combine, Contribution, ParticipantId, ValidationError};
pub use transform::{transform, MultiplierResult, TransformError};
pub use verify::{verify, verify_detailed, VerificationOutcome, VerificationReport};
