//! Distribution Simulation
//!
//! Runs many independent rounds through the public pipeline and reports how
//! the final multipliers are distributed. Used to sanity-check a parameter
//! set against the closed-form mean of the clamped crash curve.

use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::core::hash::digest;
use crate::core::multiplier::{Multiplier, MULTIPLIER_SCALE};
use crate::fairness::combiner::{combine, Contribution, ParticipantId, ValidationError};
use crate::fairness::commitment::{commit_with, CommitError};
use crate::fairness::params::{FairnessParams, ParamsError};
use crate::fairness::transform::{transform, TransformError};

/// Bytes of randomness in each simulated contribution.
const SIMULATED_CONTRIBUTION_BYTES: usize = 8;

/// Histogram buckets: `(lower, upper_exclusive, label)`, scanned in order.
pub const DISTRIBUTION_BUCKETS: [(f64, f64, &str); 10] = [
    (1.0, 2.0, "1-2"),
    (2.0, 3.0, "2-3"),
    (3.0, 5.0, "3-5"),
    (5.0, 10.0, "5-10"),
    (10.0, 20.0, "10-20"),
    (20.0, 50.0, "20-50"),
    (50.0, 100.0, "50-100"),
    (100.0, 500.0, "100-500"),
    (500.0, 1000.0, "500-1000"),
    (1000.0, f64::INFINITY, "1000+"),
];

/// One histogram row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BucketCount {
    /// Bucket label.
    pub label: String,
    /// Rounds that landed in the bucket.
    pub count: u64,
    /// Share of all rounds, in percent.
    pub percentage: f64,
}

/// Summary of a simulation run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationReport {
    /// Rounds simulated.
    pub total_rounds: u32,
    /// Histogram in bucket order.
    pub distribution: Vec<BucketCount>,
    /// Lowest multiplier seen.
    pub min_hit: Multiplier,
    /// Highest multiplier seen.
    pub max_hit: Multiplier,
    /// Sample mean.
    pub average: f64,
    /// Sample median.
    pub median: f64,
    /// Closed-form mean of the clamped curve.
    pub theoretical_mean: f64,
}

/// Simulation errors.
#[derive(Debug, Error)]
pub enum SimulationError {
    /// Parameters failed validation.
    #[error(transparent)]
    Params(#[from] ParamsError),

    /// Histogram starts at 1.00.
    #[error("minimum multiplier {0} lies below the histogram range")]
    BelowHistogram(f64),

    /// Seed generation failed.
    #[error(transparent)]
    Commit(#[from] CommitError),

    /// Generated contribution was rejected.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Digest could not be transformed.
    #[error(transparent)]
    Transform(#[from] TransformError),
}

/// Mean of the clamped, house-edge-adjusted crash curve.
///
/// With `k = 1 - edge` the adjusted value is `k / (1 - x)` for uniform `x`.
/// Values below `min` are lifted to `min`, values above `max` capped.
pub fn theoretical_mean(params: &FairnessParams) -> f64 {
    let k = 1.0 - params.house_edge;
    let (min, max) = (params.min_multiplier, params.max_multiplier);
    if k <= 0.0 {
        return min;
    }
    if max <= k {
        return max;
    }
    let below = if min > k { 1.0 - k / min } else { 0.0 };
    min * below + k * ((1.0 - below) * max / k).ln() + k
}

/// Standard deviation of the same distribution.
pub fn theoretical_std_dev(params: &FairnessParams) -> f64 {
    let k = 1.0 - params.house_edge;
    let (min, max) = (params.min_multiplier, params.max_multiplier);
    if k <= 0.0 || max <= k {
        return 0.0;
    }
    let below = if min > k { 1.0 - k / min } else { 0.0 };
    let second_moment = min * min * below + 2.0 * k * max - k * k / (1.0 - below);
    let mean = theoretical_mean(params);
    (second_moment - mean * mean).max(0.0).sqrt()
}

/// Index of the first bucket containing `value`.
pub fn bucket_index(value: f64) -> Option<usize> {
    DISTRIBUTION_BUCKETS
        .iter()
        .position(|(lower, upper, _)| value >= *lower && value < *upper)
}

/// Simulate `rounds` independent rounds, each with one random contribution.
pub fn run_simulation<R: RngCore + CryptoRng>(
    rounds: u32,
    params: &FairnessParams,
    rng: &mut R,
) -> Result<SimulationReport, SimulationError> {
    params.validate()?;
    if params.min_multiplier < DISTRIBUTION_BUCKETS[0].0 {
        return Err(SimulationError::BelowHistogram(params.min_multiplier));
    }

    let participant = ParticipantId::from("simulator");
    let mut counts = [0u64; DISTRIBUTION_BUCKETS.len()];
    let mut hits: Vec<u32> = Vec::with_capacity(rounds as usize);
    let mut contribution_bytes = [0u8; SIMULATED_CONTRIBUTION_BYTES];

    for _ in 0..rounds {
        let (seed, _commitment) = commit_with(rng)?;
        rng.fill_bytes(&mut contribution_bytes);
        let contribution =
            Contribution::new(participant.clone(), &hex::encode(contribution_bytes), params)?;

        let combined = combine(&seed, &[contribution], params)?;
        let multiplier = transform(&digest(&combined), params)?.final_multiplier;

        // Clamping keeps every result at or above the first bucket's lower bound.
        match bucket_index(multiplier.as_f64()) {
            Some(index) => counts[index] += 1,
            None => debug_assert!(false, "multiplier {multiplier} outside every bucket"),
        }
        hits.push(multiplier.hundredths());
    }

    hits.sort_unstable();
    let report = summarize(rounds, &counts, &hits, params);
    debug!(
        rounds,
        average = report.average,
        theoretical = report.theoretical_mean,
        "simulation finished"
    );
    Ok(report)
}

fn summarize(
    rounds: u32,
    counts: &[u64],
    sorted_hits: &[u32],
    params: &FairnessParams,
) -> SimulationReport {
    let distribution = DISTRIBUTION_BUCKETS
        .iter()
        .zip(counts)
        .map(|((_, _, label), &count)| BucketCount {
            label: label.to_string(),
            count,
            percentage: if rounds == 0 {
                0.0
            } else {
                count as f64 * 100.0 / rounds as f64
            },
        })
        .collect();

    let scale = MULTIPLIER_SCALE as f64;
    let average = if sorted_hits.is_empty() {
        0.0
    } else {
        let total: u64 = sorted_hits.iter().map(|&h| u64::from(h)).sum();
        total as f64 / sorted_hits.len() as f64 / scale
    };

    let median = match sorted_hits.len() {
        0 => 0.0,
        n if n % 2 == 1 => f64::from(sorted_hits[n / 2]) / scale,
        n => (f64::from(sorted_hits[n / 2 - 1]) + f64::from(sorted_hits[n / 2])) / 2.0 / scale,
    };

    SimulationReport {
        total_rounds: rounds,
        distribution,
        min_hit: Multiplier::from_hundredths(sorted_hits.first().copied().unwrap_or(0)),
        max_hit: Multiplier::from_hundredths(sorted_hits.last().copied().unwrap_or(0)),
        average,
        median,
        theoretical_mean: theoretical_mean(params),
    }
}
