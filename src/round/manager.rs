//! Round Management
//!
//! Owns every live round and exposes the engine's external interface:
//! start, submit, lock-and-resolve, reveal, verify.
//!
//! Each round sits behind its own lock. Contribution submissions for the same
//! round are serialized on it; independent rounds never contend.

use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::core::multiplier::Multiplier;
use crate::diagnostics::{RoundEvent, RoundEventData, RoundObserver, TracingObserver};
use crate::fairness::combiner::{Contribution, ParticipantId};
use crate::fairness::commitment::{OperatorSeed, SeedCommitment};
use crate::fairness::params::FairnessParams;
use crate::fairness::verify::{verify, VerificationOutcome};
use crate::round::record::RoundRecord;
use crate::round::state::{IntegrityError, Round, RoundError, RoundId, RoundState, StateError};

/// Published at round start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundStart {
    /// New round.
    pub round_id: RoundId,
    /// Commitment to the operator seed.
    pub commitment_hash: SeedCommitment,
}

/// Published at resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundResolution {
    /// Resolved round.
    pub round_id: RoundId,
    /// Multiplier visible to gameplay.
    pub final_multiplier: Multiplier,
}

/// Published at reveal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundReveal {
    /// Revealed round.
    pub round_id: RoundId,
    /// The committed operator seed.
    pub operator_seed: OperatorSeed,
}

/// Commitments remembered after their round leaves live state.
pub const DEFAULT_RETIRED_WINDOW: usize = 100_000;

/// Commitments issued by this manager.
///
/// Live rounds are always tracked. Archived rounds stay in a FIFO window of
/// bounded size, so memory is proportional to live rounds plus the window.
#[derive(Debug)]
struct IssuedCommitments {
    live: BTreeMap<SeedCommitment, RoundId>,
    retired: BTreeSet<SeedCommitment>,
    retired_order: VecDeque<SeedCommitment>,
    window: usize,
}

impl IssuedCommitments {
    fn new(window: usize) -> Self {
        Self {
            live: BTreeMap::new(),
            retired: BTreeSet::new(),
            retired_order: VecDeque::new(),
            window,
        }
    }

    /// Record a new commitment. `false` if it was seen before.
    fn insert(&mut self, commitment: &SeedCommitment, round_id: RoundId) -> bool {
        if self.live.contains_key(commitment) || self.retired.contains(commitment) {
            return false;
        }
        self.live.insert(commitment.clone(), round_id);
        true
    }

    /// Move a round's commitment from live into the retired window.
    fn retire(&mut self, commitment: &SeedCommitment, round_id: RoundId) {
        // A round that failed on reuse does not own the commitment.
        if self.live.get(commitment) != Some(&round_id) {
            return;
        }
        self.live.remove(commitment);
        if self.window == 0 {
            return;
        }
        self.retired.insert(commitment.clone());
        self.retired_order.push_back(commitment.clone());
        while self.retired_order.len() > self.window {
            if let Some(oldest) = self.retired_order.pop_front() {
                self.retired.remove(&oldest);
            }
        }
    }
}

/// Manages all live rounds.
pub struct RoundManager {
    /// Parameters for new rounds.
    params: FairnessParams,
    /// Diagnostics sink.
    observer: Arc<dyn RoundObserver>,
    /// Live rounds.
    rounds: RwLock<BTreeMap<RoundId, Arc<RwLock<Round>>>>,
    /// Issued commitments, to refuse seed reuse.
    issued: RwLock<IssuedCommitments>,
}

impl RoundManager {
    /// Create a manager that reports through `tracing`.
    pub fn new(params: FairnessParams) -> Result<Self, RoundError> {
        Self::with_observer(params, Arc::new(TracingObserver))
    }

    /// Create a manager with a custom diagnostics sink.
    pub fn with_observer(
        params: FairnessParams,
        observer: Arc<dyn RoundObserver>,
    ) -> Result<Self, RoundError> {
        params.validate()?;
        Ok(Self {
            params,
            observer,
            rounds: RwLock::new(BTreeMap::new()),
            issued: RwLock::new(IssuedCommitments::new(DEFAULT_RETIRED_WINDOW)),
        })
    }

    /// Remember at most `window` commitments of archived rounds.
    ///
    /// Commitments of live rounds are always remembered.
    pub fn with_retired_window(mut self, window: usize) -> Self {
        self.issued = RwLock::new(IssuedCommitments::new(window));
        self
    }

    /// Parameters applied to new rounds.
    pub fn params(&self) -> &FairnessParams {
        &self.params
    }

    fn emit(&self, round_id: RoundId, data: RoundEventData) {
        self.observer.on_event(&RoundEvent::new(round_id, data));
    }

    fn report(&self, round_id: RoundId, error: &RoundError, participant: Option<&ParticipantId>) {
        let data = match (error, participant) {
            (RoundError::Validation(e), Some(participant_id)) => {
                RoundEventData::ContributionRejected {
                    participant_id: participant_id.clone(),
                    reason: e.to_string(),
                }
            }
            (RoundError::State(e), _) => RoundEventData::StateRejected {
                operation: e.operation.to_string(),
                state: e.state,
            },
            (RoundError::Integrity(e), _) => RoundEventData::Failed {
                reason: e.to_string(),
                integrity: true,
            },
            _ => return,
        };
        self.emit(round_id, data);
    }

    async fn get(&self, round_id: RoundId) -> Result<Arc<RwLock<Round>>, RoundError> {
        let rounds = self.rounds.read().await;
        rounds.get(&round_id).cloned().ok_or(RoundError::NotFound(round_id))
    }

    /// Start a round with a seed from the OS CSPRNG.
    pub async fn start_round(&self) -> Result<RoundStart, RoundError> {
        self.start_round_with(&mut OsRng).await
    }

    /// Start a round with a seed from the given CSPRNG.
    ///
    /// `CREATED -> SEED_COMMITTED`. A commitment already issued to another
    /// round is an integrity fault; the new round is kept as `FAILED`.
    pub async fn start_round_with<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
    ) -> Result<RoundStart, RoundError> {
        let round_id = uuid::Uuid::new_v4();
        let mut round = Round::new(round_id, self.params.clone());
        let committed = round.commit(rng);

        let outcome = match committed {
            Ok(commitment) => {
                let mut issued = self.issued.write().await;
                if issued.insert(&commitment, round_id) {
                    Ok(commitment)
                } else {
                    Err(round.fail(IntegrityError::SeedReuse(commitment)))
                }
            }
            Err(e) => Err(e),
        };

        {
            let mut rounds = self.rounds.write().await;
            rounds.insert(round_id, Arc::new(RwLock::new(round)));
        }

        match outcome {
            Ok(commitment_hash) => {
                self.emit(
                    round_id,
                    RoundEventData::Started {
                        commitment: commitment_hash.clone(),
                    },
                );
                Ok(RoundStart {
                    round_id,
                    commitment_hash,
                })
            }
            Err(e) => {
                self.report(round_id, &e, None);
                Err(e)
            }
        }
    }

    /// Accept a contribution while the round's window is open.
    pub async fn submit_contribution(
        &self,
        round_id: RoundId,
        participant_id: ParticipantId,
        value: &str,
    ) -> Result<(), RoundError> {
        let round = self.get(round_id).await?;
        let mut round = round.write().await;

        match round.submit(participant_id.clone(), value) {
            Ok(replaced) => {
                self.emit(
                    round_id,
                    RoundEventData::ContributionAccepted {
                        participant_id,
                        replaced,
                    },
                );
                Ok(())
            }
            Err(e) => {
                self.report(round_id, &e, Some(&participant_id));
                Err(e)
            }
        }
    }

    /// Freeze contributions and compute the multiplier.
    ///
    /// Both steps run under one write lock, so no contribution can slip in
    /// between locking and combining.
    pub async fn lock_and_resolve(&self, round_id: RoundId) -> Result<RoundResolution, RoundError> {
        let round = self.get(round_id).await?;
        let mut round = round.write().await;

        let result = match round.lock() {
            Ok(count) => {
                self.emit(round_id, RoundEventData::Locked {
                    contributions: count,
                });
                round.resolve()
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(final_multiplier) => {
                self.emit(round_id, RoundEventData::Resolved {
                    multiplier: final_multiplier,
                });
                Ok(RoundResolution {
                    round_id,
                    final_multiplier,
                })
            }
            Err(e) => {
                self.report(round_id, &e, None);
                Err(e)
            }
        }
    }

    /// Publish the operator seed of a resolved round.
    pub async fn reveal_seed(&self, round_id: RoundId) -> Result<RoundReveal, RoundError> {
        let round = self.get(round_id).await?;
        let mut round = round.write().await;

        match round.reveal() {
            Ok(operator_seed) => {
                self.emit(round_id, RoundEventData::Revealed);
                Ok(RoundReveal {
                    round_id,
                    operator_seed,
                })
            }
            Err(e) => {
                self.report(round_id, &e, None);
                Err(e)
            }
        }
    }

    /// Abort a round that has not been resolved yet.
    pub async fn abort_round(&self, round_id: RoundId, reason: &str) -> Result<(), RoundError> {
        let round = self.get(round_id).await?;
        let mut round = round.write().await;

        match round.abort(reason) {
            Ok(()) => {
                self.emit(
                    round_id,
                    RoundEventData::Failed {
                        reason: reason.to_string(),
                        integrity: false,
                    },
                );
                Ok(())
            }
            Err(e) => {
                self.report(round_id, &e, None);
                Err(e)
            }
        }
    }

    /// Verify a published round. Uses no live state.
    pub fn verify_round(
        &self,
        operator_seed: &str,
        contributions: &[Contribution],
        commitment_hash: &str,
        final_multiplier: f64,
    ) -> VerificationOutcome {
        verify(
            &self.params,
            &OperatorSeed::from_published(operator_seed),
            contributions,
            commitment_hash,
            final_multiplier,
        )
    }

    /// Current state of a round.
    pub async fn state(&self, round_id: RoundId) -> Result<RoundState, RoundError> {
        let round = self.get(round_id).await?;
        let round = round.read().await;
        Ok(round.state())
    }

    /// Publishable record of a round.
    pub async fn record(&self, round_id: RoundId) -> Result<RoundRecord, RoundError> {
        let round = self.get(round_id).await?;
        let round = round.read().await;
        Ok(round.record())
    }

    /// Remove a finished round from live state and return its final record.
    ///
    /// Its commitment moves to the retired window.
    pub async fn archive_round(&self, round_id: RoundId) -> Result<RoundRecord, RoundError> {
        let mut rounds = self.rounds.write().await;
        let round = rounds.get(&round_id).cloned().ok_or(RoundError::NotFound(round_id))?;
        let round = round.read().await;

        if !round.state().is_terminal() {
            return Err(StateError {
                operation: "archive",
                state: round.state(),
            }
            .into());
        }

        rounds.remove(&round_id);
        if let Some(commitment) = round.commitment() {
            self.issued.write().await.retire(commitment, round_id);
        }
        Ok(round.record())
    }

    /// Number of live rounds.
    pub async fn round_count(&self) -> usize {
        let rounds = self.rounds.read().await;
        rounds.len()
    }

    /// Drop every terminal round. Returns their records.
    pub async fn cleanup(&self) -> Vec<RoundRecord> {
        let mut rounds = self.rounds.write().await;
        let mut removed = Vec::new();

        for (id, round) in rounds.iter() {
            let r = round.read().await;
            if r.state().is_terminal() {
                removed.push((*id, r.record()));
            }
        }

        let mut issued = self.issued.write().await;
        for (id, record) in &removed {
            rounds.remove(id);
            if let Some(commitment) = &record.commitment_hash {
                issued.retire(commitment, *id);
            }
        }
        removed.into_iter().map(|(_, record)| record).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::RecordingObserver;
    use crate::fairness::combiner::ValidationError;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn manager() -> RoundManager {
        RoundManager::new(FairnessParams::default()).unwrap()
    }

    #[tokio::test]
    async fn test_full_protocol() {
        let manager = manager();
        let start = manager.start_round().await.unwrap();
        assert_eq!(manager.state(start.round_id).await.unwrap(), RoundState::SeedCommitted);

        manager
            .submit_contribution(start.round_id, ParticipantId::from("alice"), "a-seed")
            .await
            .unwrap();
        manager
            .submit_contribution(start.round_id, ParticipantId::from("bob"), "b-seed")
            .await
            .unwrap();

        let resolution = manager.lock_and_resolve(start.round_id).await.unwrap();
        let reveal = manager.reveal_seed(start.round_id).await.unwrap();
        let record = manager.record(start.round_id).await.unwrap();

        let outcome = manager.verify_round(
            reveal.operator_seed.as_str(),
            &record.contributions,
            start.commitment_hash.as_str(),
            resolution.final_multiplier.as_f64(),
        );
        assert_eq!(outcome, VerificationOutcome::Valid);
    }

    #[tokio::test]
    async fn test_invalid_params_rejected() {
        let params = FairnessParams {
            house_edge: 2.0,
            ..Default::default()
        };
        assert!(matches!(RoundManager::new(params), Err(RoundError::Params(_))));
    }

    #[tokio::test]
    async fn test_unknown_round() {
        let manager = manager();
        let id = uuid::Uuid::new_v4();
        assert_eq!(manager.lock_and_resolve(id).await, Err(RoundError::NotFound(id)));
    }

    #[tokio::test]
    async fn test_contribution_after_lock_rejected() {
        let manager = manager();
        let start = manager.start_round().await.unwrap();
        manager
            .submit_contribution(start.round_id, ParticipantId::from("p1"), "early")
            .await
            .unwrap();
        manager.lock_and_resolve(start.round_id).await.unwrap();

        let late = manager
            .submit_contribution(start.round_id, ParticipantId::from("p2"), "late")
            .await;
        assert!(matches!(late, Err(RoundError::State(_))));
        assert_eq!(manager.record(start.round_id).await.unwrap().contributions.len(), 1);
    }

    #[tokio::test]
    async fn test_reveal_before_resolve_rejected() {
        let manager = manager();
        let start = manager.start_round().await.unwrap();
        let result = manager.reveal_seed(start.round_id).await;
        assert_eq!(
            result,
            Err(RoundError::State(StateError {
                operation: "reveal seed",
                state: RoundState::SeedCommitted,
            }))
        );
    }

    #[tokio::test]
    async fn test_validation_error_reported() {
        let observer = Arc::new(RecordingObserver::new());
        let manager =
            RoundManager::with_observer(FairnessParams::default(), observer.clone()).unwrap();
        let start = manager.start_round().await.unwrap();

        let result = manager
            .submit_contribution(start.round_id, ParticipantId::from("p1"), &"x".repeat(76))
            .await;
        assert_eq!(
            result,
            Err(RoundError::Validation(ValidationError::TooLong { len: 76, max: 75 }))
        );

        let events = observer.events();
        assert!(events.iter().any(|e| matches!(
            e.data,
            RoundEventData::ContributionRejected { .. }
        )));
        assert_eq!(manager.state(start.round_id).await.unwrap(), RoundState::SeedCommitted);
    }

    #[tokio::test]
    async fn test_seed_reuse_fails_round() {
        let manager = manager();
        manager.start_round_with(&mut StdRng::seed_from_u64(5)).await.unwrap();

        let reused = manager.start_round_with(&mut StdRng::seed_from_u64(5)).await;
        assert!(matches!(
            reused,
            Err(RoundError::Integrity(IntegrityError::SeedReuse(_)))
        ));
        assert_eq!(manager.round_count().await, 2);
    }

    #[tokio::test]
    async fn test_retired_window_is_bounded() {
        let manager = manager().with_retired_window(1);

        for seed in [5, 6] {
            let start = manager
                .start_round_with(&mut StdRng::seed_from_u64(seed))
                .await
                .unwrap();
            manager.abort_round(start.round_id, "rotate").await.unwrap();
            manager.archive_round(start.round_id).await.unwrap();
        }

        // Seed 6 is still in the window, seed 5 has been evicted.
        let reused = manager.start_round_with(&mut StdRng::seed_from_u64(6)).await;
        assert!(matches!(
            reused,
            Err(RoundError::Integrity(IntegrityError::SeedReuse(_)))
        ));
        assert!(manager
            .start_round_with(&mut StdRng::seed_from_u64(5))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_failed_reuse_does_not_release_original() {
        let manager = manager().with_retired_window(0);
        let original = manager
            .start_round_with(&mut StdRng::seed_from_u64(9))
            .await
            .unwrap();
        assert!(manager
            .start_round_with(&mut StdRng::seed_from_u64(9))
            .await
            .is_err());

        // Archiving the failed duplicate must not forget the live original.
        assert_eq!(manager.cleanup().await.len(), 1);
        let again = manager.start_round_with(&mut StdRng::seed_from_u64(9)).await;
        assert!(matches!(
            again,
            Err(RoundError::Integrity(IntegrityError::SeedReuse(_)))
        ));
        assert_eq!(
            manager.state(original.round_id).await.unwrap(),
            RoundState::SeedCommitted
        );
    }

    #[tokio::test]
    async fn test_abort_and_archive() {
        let manager = manager();
        let start = manager.start_round().await.unwrap();

        // Live rounds cannot be archived.
        assert!(matches!(
            manager.archive_round(start.round_id).await,
            Err(RoundError::State(_))
        ));

        manager.abort_round(start.round_id, "maintenance").await.unwrap();
        let record = manager.archive_round(start.round_id).await.unwrap();
        assert_eq!(record.state, RoundState::Failed);
        assert_eq!(manager.round_count().await, 0);
    }

    #[tokio::test]
    async fn test_cleanup_removes_terminal_rounds() {
        let manager = manager();
        let done = manager.start_round().await.unwrap();
        let open = manager.start_round().await.unwrap();

        manager
            .submit_contribution(done.round_id, ParticipantId::from("p1"), "v")
            .await
            .unwrap();
        manager.lock_and_resolve(done.round_id).await.unwrap();
        manager.reveal_seed(done.round_id).await.unwrap();

        let removed = manager.cleanup().await;
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].round_id, done.round_id);
        assert_eq!(manager.state(open.round_id).await.unwrap(), RoundState::SeedCommitted);
    }

    #[tokio::test]
    async fn test_concurrent_submissions_all_land() {
        let manager = Arc::new(manager());
        let start = manager.start_round().await.unwrap();

        let mut handles = Vec::new();
        for i in 0..32 {
            let manager = manager.clone();
            let round_id = start.round_id;
            handles.push(tokio::spawn(async move {
                manager
                    .submit_contribution(round_id, ParticipantId::new(format!("p{:02}", i)), "seed")
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let record = manager.record(start.round_id).await.unwrap();
        assert_eq!(record.contributions.len(), 32);
        assert_eq!(record.contributions[0].participant_id().as_str(), "p00");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_submissions_racing_lock_are_all_or_nothing() {
        let manager = Arc::new(manager());
        let start = manager.start_round().await.unwrap();
        manager
            .submit_contribution(start.round_id, ParticipantId::from("first"), "seed")
            .await
            .unwrap();

        let mut submissions = Vec::new();
        let round_id = start.round_id;
        for i in 0..64 {
            let submitter = manager.clone();
            submissions.push(tokio::spawn(async move {
                let participant_id = ParticipantId::new(format!("racer-{:02}", i));
                let result = submitter
                    .submit_contribution(round_id, participant_id.clone(), "racing")
                    .await;
                (participant_id, result)
            }));
            if i == 32 {
                let locker = manager.clone();
                submissions.push(tokio::spawn(async move {
                    let result = locker.lock_and_resolve(round_id).await.map(|_| ());
                    (ParticipantId::from("lock"), result)
                }));
            }
        }

        let mut accepted = Vec::new();
        for handle in submissions {
            let (participant_id, result) = handle.await.unwrap();
            if participant_id.as_str() == "lock" {
                result.unwrap();
                continue;
            }
            match result {
                Ok(()) => accepted.push(participant_id),
                Err(e) => assert!(matches!(e, RoundError::State(_)), "unexpected {:?}", e),
            }
        }

        let resolution = manager.lock_and_resolve(start.round_id).await;
        assert!(matches!(resolution, Err(RoundError::State(_))));

        let record = manager.record(start.round_id).await.unwrap();
        let locked: Vec<&ParticipantId> =
            record.contributions.iter().map(|c| c.participant_id()).collect();
        assert_eq!(locked.len(), accepted.len() + 1);
        for participant_id in &accepted {
            assert!(locked.contains(&participant_id));
        }

        let reveal = manager.reveal_seed(start.round_id).await.unwrap();
        let record = manager.record(start.round_id).await.unwrap();
        let outcome = manager.verify_round(
            reveal.operator_seed.as_str(),
            &record.contributions,
            start.commitment_hash.as_str(),
            record.final_multiplier.unwrap().as_f64(),
        );
        assert_eq!(outcome, VerificationOutcome::Valid);
    }

    #[tokio::test]
    async fn test_rounds_are_independent() {
        let manager = manager();
        let a = manager.start_round().await.unwrap();
        let b = manager.start_round().await.unwrap();
        assert_ne!(a.commitment_hash, b.commitment_hash);

        manager
            .submit_contribution(a.round_id, ParticipantId::from("p1"), "same")
            .await
            .unwrap();
        manager.lock_and_resolve(a.round_id).await.unwrap();

        assert_eq!(manager.state(b.round_id).await.unwrap(), RoundState::SeedCommitted);
    }
}
