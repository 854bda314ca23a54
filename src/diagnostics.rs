//! Round Diagnostics
//!
//! Structured events emitted by the round layer. The engine only reports
//! what happened; the injected [`RoundObserver`] decides what to do with it.

use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tracing::{error, info, warn};

use crate::core::multiplier::Multiplier;
use crate::fairness::combiner::ParticipantId;
use crate::fairness::commitment::SeedCommitment;
use crate::round::state::{RoundId, RoundState};

/// Event data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum RoundEventData {
    /// Seed committed and commitment published.
    Started {
        commitment: SeedCommitment,
    },

    /// Contribution accepted (or replaced a previous one).
    ContributionAccepted {
        participant_id: ParticipantId,
        replaced: bool,
    },

    /// Contribution rejected; round unaffected.
    ContributionRejected {
        participant_id: ParticipantId,
        reason: String,
    },

    /// Operation invoked out of lifecycle order.
    StateRejected {
        operation: String,
        state: RoundState,
    },

    /// Contribution set frozen.
    Locked {
        contributions: usize,
    },

    /// Multiplier computed.
    Resolved {
        multiplier: Multiplier,
    },

    /// Operator seed published.
    Revealed,

    /// Round aborted or failed an integrity check.
    Failed {
        reason: String,
        integrity: bool,
    },
}

/// A round event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoundEvent {
    /// Round the event belongs to.
    pub round_id: RoundId,
    /// Event data.
    pub data: RoundEventData,
}

impl RoundEvent {
    /// Create a new event.
    pub fn new(round_id: RoundId, data: RoundEventData) -> Self {
        Self { round_id, data }
    }
}

/// Sink for round events.
pub trait RoundObserver: Send + Sync {
    /// Handle one event.
    fn on_event(&self, event: &RoundEvent);
}

/// Forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl RoundObserver for TracingObserver {
    fn on_event(&self, event: &RoundEvent) {
        let round_id = event.round_id;
        match &event.data {
            RoundEventData::Started { commitment } => {
                info!(%round_id, commitment = %commitment, "round started");
            }
            RoundEventData::ContributionAccepted { participant_id, replaced } => {
                info!(%round_id, participant = %participant_id, replaced, "contribution accepted");
            }
            RoundEventData::ContributionRejected { participant_id, reason } => {
                warn!(%round_id, participant = %participant_id, %reason, "contribution rejected");
            }
            RoundEventData::StateRejected { operation, state } => {
                warn!(%round_id, %operation, ?state, "operation rejected in current state");
            }
            RoundEventData::Locked { contributions } => {
                info!(%round_id, contributions, "contributions locked");
            }
            RoundEventData::Resolved { multiplier } => {
                info!(%round_id, multiplier = %multiplier, "round resolved");
            }
            RoundEventData::Revealed => {
                info!(%round_id, "operator seed revealed");
            }
            RoundEventData::Failed { reason, integrity: true } => {
                error!(%round_id, %reason, "integrity fault, suspected tampering or bug");
            }
            RoundEventData::Failed { reason, integrity: false } => {
                warn!(%round_id, %reason, "round failed");
            }
        }
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl RoundObserver for NoopObserver {
    fn on_event(&self, _event: &RoundEvent) {}
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<RoundEvent>>,
}

impl RecordingObserver {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of recorded events.
    pub fn events(&self) -> Vec<RoundEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl RoundObserver for RecordingObserver {
    fn on_event(&self, event: &RoundEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event.clone()),
            Err(poisoned) => poisoned.into_inner().push(event.clone()),
        }
    }
}
