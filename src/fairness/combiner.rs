//! Seed Combination
//!
//! Merges the operator seed with player contributions into the single string
//! that gets hashed.
//!
//! ## Ordering
//!
//! Contributions are sorted by participant id (byte-wise), then by value,
//! before concatenation. The same set of contributions therefore always
//! yields the same combined seed, whatever order they arrived in:
//!
//! ```text
//! combined = operator_seed || value(p_1) || value(p_2) || ...   with p_1 < p_2 < ...
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::fairness::commitment::OperatorSeed;
use crate::fairness::params::FairnessParams;

/// Identifier of the player behind a contribution.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    /// Create a participant id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// String form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ParticipantId({})", self.0)
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ParticipantId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A validated player seed contribution.
///
/// `value` is already trimmed; it is exactly what enters the combined seed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contribution {
    participant_id: ParticipantId,
    value: String,
}

impl Contribution {
    /// Validate a submitted value.
    ///
    /// The length limit applies to the submission as received; the trimmed
    /// value must be non-empty.
    pub fn new(
        participant_id: ParticipantId,
        value: &str,
        params: &FairnessParams,
    ) -> Result<Self, ValidationError> {
        let len = value.chars().count();
        if len > params.max_contribution_len {
            return Err(ValidationError::TooLong {
                len,
                max: params.max_contribution_len,
            });
        }

        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Empty);
        }

        Ok(Self {
            participant_id,
            value: trimmed.to_string(),
        })
    }

    /// Validate a submission received as raw bytes.
    pub fn from_utf8(
        participant_id: ParticipantId,
        bytes: &[u8],
        params: &FairnessParams,
    ) -> Result<Self, ValidationError> {
        let value = std::str::from_utf8(bytes).map_err(|e| ValidationError::Encoding {
            valid_up_to: e.valid_up_to(),
        })?;
        Self::new(participant_id, value, params)
    }

    /// Who submitted this contribution.
    pub fn participant_id(&self) -> &ParticipantId {
        &self.participant_id
    }

    /// Trimmed value.
    pub fn value(&self) -> &str {
        &self.value
    }

    fn sort_key(&self) -> (&str, &str) {
        (self.participant_id.as_str(), self.value.as_str())
    }
}

/// Contribution validation errors.
///
/// Recoverable: the caller may fix the value and resubmit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Empty or whitespace-only value.
    #[error("contribution cannot be empty or whitespace only")]
    Empty,

    /// Value longer than the configured limit.
    #[error("contribution is too long ({len} characters, max {max})")]
    TooLong {
        /// Submitted length in characters.
        len: usize,
        /// Configured maximum.
        max: usize,
    },

    /// Raw submission was not valid UTF-8.
    #[error("contribution is not valid UTF-8 (valid up to byte {valid_up_to})")]
    Encoding {
        /// Length of the valid prefix.
        valid_up_to: usize,
    },

    /// A round cannot be resolved from the operator seed alone.
    #[error("at least one contribution is required")]
    NoContributions,
}

/// Sort contributions into their canonical order.
pub fn canonical_order(contributions: &[Contribution]) -> Vec<Contribution> {
    let mut sorted = contributions.to_vec();
    sorted.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    sorted
}

/// Combine the operator seed with the contributions.
///
/// Values are re-validated against `params` so published contributions from
/// untrusted sources go through the same checks as live submissions.
pub fn combine(
    operator_seed: &OperatorSeed,
    contributions: &[Contribution],
    params: &FairnessParams,
) -> Result<String, ValidationError> {
    if contributions.is_empty() {
        return Err(ValidationError::NoContributions);
    }

    let ordered = canonical_order(contributions);
    let mut combined = String::with_capacity(
        operator_seed.as_str().len() + ordered.iter().map(|c| c.value.len()).sum::<usize>(),
    );
    combined.push_str(operator_seed.as_str());

    for contribution in &ordered {
        let checked = Contribution::new(
            contribution.participant_id.clone(),
            &contribution.value,
            params,
        )?;
        combined.push_str(checked.value());
    }

    Ok(combined)
}
