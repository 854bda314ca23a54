//! Verification API
//!
//! Recompute a published round from its revealed inputs.
//! Needs no live round state; safe to call concurrently from anywhere.

use serde::{Deserialize, Serialize};

use crate::core::hash::digest;
use crate::core::multiplier::Multiplier;
use crate::fairness::combiner::{combine, Contribution};
use crate::fairness::commitment::{OperatorSeed, SeedCommitment};
use crate::fairness::params::FairnessParams;
use crate::fairness::transform::{transform, MultiplierResult};

/// Result of an audit. A mismatch is a finding, not an engine failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VerificationOutcome {
    /// Commitment and multiplier both reproduce.
    Valid,
    /// The seed does not hash to the claimed commitment.
    CommitmentMismatch,
    /// The seed matches but the pipeline yields a different multiplier.
    MultiplierMismatch,
}

impl VerificationOutcome {
    /// Did verification pass?
    pub fn is_valid(self) -> bool {
        self == Self::Valid
    }
}

/// Audit result with every recomputed value.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationReport {
    /// Overall outcome.
    pub outcome: VerificationOutcome,
    /// Commitment recomputed from the given seed.
    pub computed_commitment: SeedCommitment,
    /// Intermediate values recomputed from the given inputs, if the pipeline ran.
    pub computed: Option<MultiplierResult>,
    /// Multiplier claimed by the operator; `None` unless it is a two-decimal value.
    pub claimed_multiplier: Option<Multiplier>,
    /// Why the pipeline could not be recomputed.
    pub note: Option<String>,
}

/// Verify a published round and return only the outcome.
pub fn verify(
    params: &FairnessParams,
    operator_seed: &OperatorSeed,
    contributions: &[Contribution],
    claimed_commitment: &str,
    claimed_multiplier: f64,
) -> VerificationOutcome {
    verify_detailed(
        params,
        operator_seed,
        contributions,
        claimed_commitment,
        claimed_multiplier,
    )
    .outcome
}

/// Verify a published round and keep every recomputed value.
///
/// Steps:
/// 1. hash the seed and compare to the claimed commitment (case-insensitive hex)
/// 2. combine, digest and transform
/// 3. compare the final multiplier to the claim in hundredths
pub fn verify_detailed(
    params: &FairnessParams,
    operator_seed: &OperatorSeed,
    contributions: &[Contribution],
    claimed_commitment: &str,
    claimed_multiplier: f64,
) -> VerificationReport {
    let computed_commitment = operator_seed.commitment();
    let claimed = Multiplier::from_published(claimed_multiplier);

    let report = |outcome, computed, note: Option<String>| VerificationReport {
        outcome,
        computed_commitment: computed_commitment.clone(),
        computed,
        claimed_multiplier: claimed,
        note,
    };

    let commitment_matches = SeedCommitment::from_hex(claimed_commitment)
        .map(|c| c == computed_commitment)
        .unwrap_or(false);
    if !commitment_matches {
        return report(VerificationOutcome::CommitmentMismatch, None, None);
    }

    if let Err(e) = params.validate() {
        return report(
            VerificationOutcome::MultiplierMismatch,
            None,
            Some(format!("invalid parameters: {}", e)),
        );
    }

    let combined = match combine(operator_seed, contributions, params) {
        Ok(combined) => combined,
        Err(e) => {
            return report(
                VerificationOutcome::MultiplierMismatch,
                None,
                Some(format!("invalid contributions: {}", e)),
            )
        }
    };

    let result = match transform(&digest(&combined), params) {
        Ok(result) => result,
        Err(e) => {
            return report(
                VerificationOutcome::MultiplierMismatch,
                None,
                Some(format!("transform failed: {}", e)),
            )
        }
    };

    match claimed {
        Some(claimed) if claimed == result.final_multiplier => {
            report(VerificationOutcome::Valid, Some(result), None)
        }
        Some(_) => report(VerificationOutcome::MultiplierMismatch, Some(result), None),
        None => report(
            VerificationOutcome::MultiplierMismatch,
            Some(result),
            Some(format!("claimed multiplier {} is not a two-decimal value", claimed_multiplier)),
        ),
    }
}
