//! # Crash Fair
//!
//! Provably fair commit-reveal engine for crash-style multiplier rounds.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        CRASH FAIR                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/            - Deterministic primitives                │
//! │  ├── hash.rs      - SHA-256 helpers, fairness digest        │
//! │  └── multiplier.rs- Fixed-point multiplier (hundredths)     │
//! │                                                             │
//! │  fairness/        - Pure fairness pipeline                  │
//! │  ├── params.rs    - Versioned algorithm constants           │
//! │  ├── commitment.rs- Operator seed and commitment            │
//! │  ├── combiner.rs  - Contribution validation and ordering    │
//! │  ├── transform.rs - Digest to multiplier                    │
//! │  └── verify.rs    - Independent re-computation              │
//! │                                                             │
//! │  round/           - Protocol (stateful)                     │
//! │  ├── state.rs     - Round lifecycle state machine           │
//! │  ├── record.rs    - Publishable round record                │
//! │  └── manager.rs   - Concurrent round management             │
//! │                                                             │
//! │  diagnostics.rs   - Injectable round event observers        │
//! │  config.rs        - Environment configuration               │
//! │  simulation.rs    - Distribution harness                    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Fairness Guarantee
//!
//! The `core/` and `fairness/` modules are **pure**:
//! - The operator seed is fixed by its commitment before any contribution
//! - Contributions are combined in a canonical order, never arrival order
//! - Verification compares integer hundredths, never raw floats
//!
//! Given the revealed seed and the published contributions, anyone can
//! recompute the **identical multiplier** with nothing but SHA-256.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod core;
pub mod diagnostics;
pub mod fairness;
pub mod round;
pub mod simulation;

// Re-export commonly used types
pub use config::EngineConfig;
pub use crate::core::hash::{digest, FairnessDigest};
pub use crate::core::multiplier::Multiplier;
pub use diagnostics::{RoundEvent, RoundEventData, RoundObserver, TracingObserver};
pub use fairness::{
    combine, commit, transform, verify, verify_detailed, Contribution, FairnessParams,
    MultiplierResult, OperatorSeed, ParticipantId, SeedCommitment, VerificationOutcome,
    ALGORITHM_VERSION,
};
pub use round::{RoundError, RoundId, RoundManager, RoundRecord, RoundState};
pub use simulation::{run_simulation, SimulationReport};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
