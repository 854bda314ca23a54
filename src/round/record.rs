//! Publishable Round Record
//!
//! Everything an auditor needs to re-check a round, in one value.
//! JSON for publishing, bincode for compact archival.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::hash::FairnessDigest;
use crate::core::multiplier::Multiplier;
use crate::fairness::combiner::Contribution;
use crate::fairness::commitment::{OperatorSeed, SeedCommitment};
use crate::fairness::params::FairnessParams;
use crate::fairness::transform::MultiplierResult;
use crate::fairness::verify::{verify_detailed, VerificationOutcome, VerificationReport};
use crate::round::state::{RoundId, RoundState};

/// Published record of a round.
///
/// Fields that are not yet public in the round's state are `None`: the
/// operator seed, digest and audit values appear only after reveal.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundRecord {
    /// Round identifier.
    pub round_id: RoundId,
    /// Algorithm version.
    pub algorithm_version: u8,
    /// Parameters the round ran under.
    pub params: FairnessParams,
    /// Lifecycle state at the time of the snapshot.
    pub state: RoundState,
    /// Commitment published at round start.
    pub commitment_hash: Option<SeedCommitment>,
    /// Contributions in canonical order.
    pub contributions: Vec<Contribution>,
    /// Operator seed (after reveal).
    pub operator_seed: Option<OperatorSeed>,
    /// Final multiplier (after resolve).
    pub final_multiplier: Option<Multiplier>,
    /// Fairness digest (after reveal).
    pub fairness_digest: Option<FairnessDigest>,
    /// Intermediate transform values (after reveal).
    pub audit: Option<MultiplierResult>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Resolution time.
    pub resolved_at: Option<DateTime<Utc>>,
    /// Reveal time.
    pub revealed_at: Option<DateTime<Utc>>,
    /// Failure reason.
    pub failure: Option<String>,
}

/// Record encoding errors.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    /// JSON encoding or decoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Binary encoding or decoding failed.
    #[error("binary encoding error: {0}")]
    Binary(#[from] bincode::Error),
}

impl RoundRecord {
    /// Whether the record holds everything needed for verification.
    pub fn is_verifiable(&self) -> bool {
        self.commitment_hash.is_some()
            && self.operator_seed.is_some()
            && self.final_multiplier.is_some()
    }

    /// Re-check this record. `None` until the round has been revealed.
    pub fn verify(&self) -> Option<VerificationOutcome> {
        self.verify_detailed().map(|report| report.outcome)
    }

    /// Re-check this record and keep every recomputed value.
    pub fn verify_detailed(&self) -> Option<VerificationReport> {
        let commitment = self.commitment_hash.as_ref()?;
        let seed = self.operator_seed.as_ref()?;
        let multiplier = self.final_multiplier?;

        Some(verify_detailed(
            &self.params,
            seed,
            &self.contributions,
            commitment.as_str(),
            multiplier.as_f64(),
        ))
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String, RecordError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserialize from JSON.
    pub fn from_json(data: &str) -> Result<Self, RecordError> {
        Ok(serde_json::from_str(data)?)
    }

    /// Serialize to bytes using bincode.
    pub fn to_bytes(&self) -> Result<Vec<u8>, RecordError> {
        Ok(bincode::serialize(self)?)
    }

    /// Deserialize from bincode bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self, RecordError> {
        Ok(bincode::deserialize(data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fairness::combiner::ParticipantId;
    use crate::round::state::Round;
    use rand::rngs::OsRng;

    fn revealed_record() -> RoundRecord {
        let mut round = Round::new(uuid::Uuid::new_v4(), FairnessParams::default());
        round.commit(&mut OsRng).unwrap();
        round.submit(ParticipantId::from("p2"), "second").unwrap();
        round.submit(ParticipantId::from("p1"), "first").unwrap();
        round.lock().unwrap();
        round.resolve().unwrap();
        round.reveal().unwrap();
        round.record()
    }

    #[test]
    fn test_revealed_record_verifies() {
        let record = revealed_record();
        assert!(record.is_verifiable());
        assert_eq!(record.verify(), Some(VerificationOutcome::Valid));
        assert!(record.revealed_at.is_some());
    }

    #[test]
    fn test_unrevealed_record_hides_seed() {
        let mut round = Round::new(uuid::Uuid::new_v4(), FairnessParams::default());
        round.commit(&mut OsRng).unwrap();
        round.submit(ParticipantId::from("p1"), "first").unwrap();
        round.lock().unwrap();
        round.resolve().unwrap();

        let record = round.record();
        assert!(record.operator_seed.is_none());
        assert!(record.audit.is_none());
        assert!(record.final_multiplier.is_some());
        assert_eq!(record.verify(), None);
    }

    #[test]
    fn test_json_uses_published_field_names() {
        let json = revealed_record().to_json().unwrap();
        assert!(json.contains("\"commitmentHash\""));
        assert!(json.contains("\"operatorSeed\""));
        assert!(json.contains("\"finalMultiplier\""));
        assert!(json.contains("\"REVEALED\""));
    }

    #[test]
    fn test_archived_record_still_verifies() {
        let record = revealed_record();

        let from_json = RoundRecord::from_json(&record.to_json().unwrap()).unwrap();
        assert_eq!(from_json.verify(), Some(VerificationOutcome::Valid));

        let from_bytes = RoundRecord::from_bytes(&record.to_bytes().unwrap()).unwrap();
        assert_eq!(from_bytes.contributions, record.contributions);
        assert_eq!(from_bytes.verify(), Some(VerificationOutcome::Valid));
    }

    #[test]
    fn test_malformed_hashes_rejected_on_load() {
        let json = revealed_record().to_json().unwrap();
        let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();

        let mut short_digest = value.clone();
        short_digest["fairnessDigest"] = "abc".into();
        assert!(matches!(
            RoundRecord::from_json(&short_digest.to_string()),
            Err(RecordError::Json(_))
        ));

        value["commitmentHash"] = format!("a{}", "é".repeat(12)).into();
        assert!(matches!(
            RoundRecord::from_json(&value.to_string()),
            Err(RecordError::Json(_))
        ));
    }

    #[test]
    fn test_loaded_record_debug_formats() {
        let record = RoundRecord::from_json(&revealed_record().to_json().unwrap()).unwrap();
        let printed = format!("{:?}", record);
        assert!(printed.contains("FairnessDigest("));
        assert!(printed.contains("<redacted>"));
    }

    #[test]
    fn test_tampered_record_detected() {
        let mut record = revealed_record();
        let bumped = record.final_multiplier.unwrap().hundredths() + 1;
        record.final_multiplier = Some(Multiplier::from_hundredths(bumped));
        assert_eq!(record.verify(), Some(VerificationOutcome::MultiplierMismatch));
    }
}
