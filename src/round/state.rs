//! Round Lifecycle
//!
//! One round of the commit-reveal protocol:
//!
//! ```text
//! CREATED -> SEED_COMMITTED -> CONTRIBUTIONS_LOCKED -> RESOLVED -> REVEALED
//!    \______________\___________________\
//!                                        -> FAILED
//! ```
//!
//! The seed is committed before any contribution is accepted, and the
//! contribution set is frozen before the seed is combined. Neither side can
//! steer the outcome after seeing the other's input.
//!
//! Every field is set at most once. A round never moves backwards.

use chrono::{DateTime, Utc};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::core::hash::{digest, FairnessDigest};
use crate::core::multiplier::Multiplier;
use crate::fairness::combiner::{
    canonical_order, combine, Contribution, ParticipantId, ValidationError,
};
use crate::fairness::commitment::{commit_with, OperatorSeed, SeedCommitment};
use crate::fairness::params::{FairnessParams, ParamsError};
use crate::fairness::transform::{transform, MultiplierResult, TransformError};
use crate::round::record::RoundRecord;

/// Unique round identifier.
pub type RoundId = uuid::Uuid;

/// Round lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoundState {
    /// Allocated, nothing committed yet.
    Created,
    /// Commitment published, accepting contributions.
    SeedCommitted,
    /// Contribution set frozen.
    ContributionsLocked,
    /// Multiplier computed, seed still private.
    Resolved,
    /// Seed published, round verifiable.
    Revealed,
    /// Aborted or failed an integrity check.
    Failed,
}

impl RoundState {
    /// No further transitions possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Revealed | Self::Failed)
    }
}

/// Operation invoked out of lifecycle order. The round is unaffected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot {operation} while round is {state:?}")]
pub struct StateError {
    /// Rejected operation.
    pub operation: &'static str,
    /// State the round was in.
    pub state: RoundState,
}

/// Integrity faults. Fatal to the round and never retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IntegrityError {
    /// Seed does not hash to its own commitment.
    #[error("operator seed does not match its commitment")]
    CommitmentMismatch,

    /// Seed or commitment absent past the commit step.
    #[error("operator seed missing after commit")]
    MissingSeed,

    /// Digest did not parse.
    #[error("digest transform failed: {0}")]
    Transform(#[from] TransformError),

    /// Locked contributions no longer pass validation.
    #[error("locked contributions failed revalidation: {0}")]
    Contributions(ValidationError),

    /// Commitment already issued to an earlier round.
    #[error("operator seed commitment {0} was already issued")]
    SeedReuse(SeedCommitment),

    /// Entropy source failed while drawing the seed.
    #[error("entropy source failed: {0}")]
    Entropy(String),
}

/// Round errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RoundError {
    /// Bad contribution; resubmit.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Out-of-order operation.
    #[error(transparent)]
    State(#[from] StateError),

    /// Integrity fault; round is now FAILED.
    #[error(transparent)]
    Integrity(#[from] IntegrityError),

    /// Unknown round id.
    #[error("round {0} not found")]
    NotFound(RoundId),

    /// Engine configured with unusable parameters.
    #[error("invalid parameters: {0}")]
    Params(#[from] ParamsError),
}

/// A single round.
#[derive(Debug)]
pub struct Round {
    id: RoundId,
    state: RoundState,
    params: FairnessParams,
    seed: Option<OperatorSeed>,
    commitment: Option<SeedCommitment>,
    /// Open contributions, one per participant.
    pending: BTreeMap<ParticipantId, Contribution>,
    /// Frozen contributions in canonical order.
    locked: Vec<Contribution>,
    digest: Option<FairnessDigest>,
    result: Option<MultiplierResult>,
    created_at: DateTime<Utc>,
    resolved_at: Option<DateTime<Utc>>,
    revealed_at: Option<DateTime<Utc>>,
    failure: Option<String>,
}

impl Round {
    /// Create a round in `CREATED`.
    pub fn new(id: RoundId, params: FairnessParams) -> Self {
        Self {
            id,
            state: RoundState::Created,
            params,
            seed: None,
            commitment: None,
            pending: BTreeMap::new(),
            locked: Vec::new(),
            digest: None,
            result: None,
            created_at: Utc::now(),
            resolved_at: None,
            revealed_at: None,
            failure: None,
        }
    }

    fn require(&self, expected: RoundState, operation: &'static str) -> Result<(), StateError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(StateError {
                operation,
                state: self.state,
            })
        }
    }

    /// Move to `FAILED` and return the fault as an error.
    pub(crate) fn fail(&mut self, fault: IntegrityError) -> RoundError {
        self.state = RoundState::Failed;
        self.failure = Some(fault.to_string());
        RoundError::Integrity(fault)
    }

    /// `CREATED -> SEED_COMMITTED`: draw and commit the operator seed.
    pub fn commit<R: RngCore + CryptoRng>(
        &mut self,
        rng: &mut R,
    ) -> Result<SeedCommitment, RoundError> {
        self.require(RoundState::Created, "commit seed")?;

        let (seed, commitment) = match commit_with(rng) {
            Ok(pair) => pair,
            Err(e) => return Err(self.fail(IntegrityError::Entropy(e.to_string()))),
        };
        if !commitment.verify(&seed) {
            return Err(self.fail(IntegrityError::CommitmentMismatch));
        }

        self.seed = Some(seed);
        self.commitment = Some(commitment.clone());
        self.state = RoundState::SeedCommitted;
        Ok(commitment)
    }

    /// Accept a contribution while the window is open.
    ///
    /// Returns `true` when it replaced the participant's earlier value.
    pub fn submit(
        &mut self,
        participant_id: ParticipantId,
        value: &str,
    ) -> Result<bool, RoundError> {
        self.require(RoundState::SeedCommitted, "submit contribution")?;
        let contribution = Contribution::new(participant_id.clone(), value, &self.params)?;
        Ok(self.pending.insert(participant_id, contribution).is_some())
    }

    /// `SEED_COMMITTED -> CONTRIBUTIONS_LOCKED`: freeze the contribution set.
    pub fn lock(&mut self) -> Result<usize, RoundError> {
        self.require(RoundState::SeedCommitted, "lock contributions")?;
        if self.pending.is_empty() {
            return Err(ValidationError::NoContributions.into());
        }

        let submitted: Vec<Contribution> = self.pending.values().cloned().collect();
        self.locked = canonical_order(&submitted);
        self.pending.clear();
        self.state = RoundState::ContributionsLocked;
        Ok(self.locked.len())
    }

    /// `CONTRIBUTIONS_LOCKED -> RESOLVED`: combine, hash and transform.
    pub fn resolve(&mut self) -> Result<Multiplier, RoundError> {
        self.require(RoundState::ContributionsLocked, "resolve")?;

        let seed = match &self.seed {
            Some(seed) => seed.clone(),
            None => return Err(self.fail(IntegrityError::MissingSeed)),
        };
        let combined = match combine(&seed, &self.locked, &self.params) {
            Ok(combined) => combined,
            Err(e) => return Err(self.fail(IntegrityError::Contributions(e))),
        };
        let fairness_digest = digest(&combined);
        let result = match transform(&fairness_digest, &self.params) {
            Ok(result) => result,
            Err(e) => return Err(self.fail(e.into())),
        };

        let multiplier = result.final_multiplier;
        self.digest = Some(fairness_digest);
        self.result = Some(result);
        self.resolved_at = Some(Utc::now());
        self.state = RoundState::Resolved;
        Ok(multiplier)
    }

    /// `RESOLVED -> REVEALED`: publish the operator seed.
    ///
    /// The commitment is re-checked first; a mismatch fails the round.
    pub fn reveal(&mut self) -> Result<OperatorSeed, RoundError> {
        self.require(RoundState::Resolved, "reveal seed")?;

        let (seed, commitment) = match (&self.seed, &self.commitment) {
            (Some(seed), Some(commitment)) => (seed.clone(), commitment.clone()),
            _ => return Err(self.fail(IntegrityError::MissingSeed)),
        };
        if !commitment.verify(&seed) {
            return Err(self.fail(IntegrityError::CommitmentMismatch));
        }

        self.revealed_at = Some(Utc::now());
        self.state = RoundState::Revealed;
        Ok(seed)
    }

    /// Abort the round. Only possible before `RESOLVED`.
    pub fn abort(&mut self, reason: &str) -> Result<(), RoundError> {
        match self.state {
            RoundState::Created | RoundState::SeedCommitted | RoundState::ContributionsLocked => {
                self.state = RoundState::Failed;
                self.failure = Some(format!("aborted: {}", reason));
                Ok(())
            }
            state => Err(StateError { operation: "abort", state }.into()),
        }
    }

    /// Round identifier.
    pub fn id(&self) -> RoundId {
        self.id
    }

    /// Current state.
    pub fn state(&self) -> RoundState {
        self.state
    }

    /// Parameters this round runs under.
    pub fn params(&self) -> &FairnessParams {
        &self.params
    }

    /// Published commitment.
    pub fn commitment(&self) -> Option<&SeedCommitment> {
        self.commitment.as_ref()
    }

    /// Final multiplier, visible from `RESOLVED` on.
    pub fn final_multiplier(&self) -> Option<Multiplier> {
        self.result.as_ref().map(|r| r.final_multiplier)
    }

    /// Operator seed, only once revealed.
    pub fn operator_seed(&self) -> Option<&OperatorSeed> {
        match self.state {
            RoundState::Revealed => self.seed.as_ref(),
            _ => None,
        }
    }

    /// Intermediate values, only once revealed.
    pub fn audit(&self) -> Option<&MultiplierResult> {
        match self.state {
            RoundState::Revealed => self.result.as_ref(),
            _ => None,
        }
    }

    /// Fairness digest, only once revealed.
    pub fn fairness_digest(&self) -> Option<&FairnessDigest> {
        match self.state {
            RoundState::Revealed => self.digest.as_ref(),
            _ => None,
        }
    }

    /// Contributions in canonical order (frozen set once locked).
    pub fn contributions(&self) -> Vec<Contribution> {
        if self.locked.is_empty() {
            let open: Vec<Contribution> = self.pending.values().cloned().collect();
            canonical_order(&open)
        } else {
            self.locked.clone()
        }
    }

    /// Failure reason, if failed.
    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    /// Publishable record of the round in its current state.
    pub fn record(&self) -> RoundRecord {
        RoundRecord {
            round_id: self.id,
            algorithm_version: self.params.version,
            params: self.params.clone(),
            state: self.state,
            commitment_hash: self.commitment.clone(),
            contributions: self.contributions(),
            operator_seed: self.operator_seed().cloned(),
            final_multiplier: self.final_multiplier(),
            fairness_digest: self.fairness_digest().cloned(),
            audit: self.audit().cloned(),
            created_at: self.created_at,
            resolved_at: self.resolved_at,
            revealed_at: self.revealed_at,
            failure: self.failure.clone(),
        }
    }
}
