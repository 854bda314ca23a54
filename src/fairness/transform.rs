//! Hash-to-Multiplier Transform
//!
//! Maps a fairness digest to a bounded multiplier:
//!
//! ```text
//! h        = parse_hex(digest[..prefix_len])
//! x        = h / (2^(4 * prefix_len) - 1)          in [0, 1]
//! raw      = 1 / (1 - x)                            crash curve, +inf at x = 1
//! adjusted = raw * (1 - house_edge)
//! final    = round_half_up(clamp(adjusted, min, max), 2 decimals)
//! ```
//!
//! Every intermediate value is kept in [`MultiplierResult`] so disputes can
//! be settled step by step.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::hash::FairnessDigest;
use crate::core::multiplier::{round_half_up, Multiplier, MULTIPLIER_SCALE};
use crate::fairness::params::{FairnessParams, ParamsError};

/// Audit record of one transform.
///
/// Only `final_multiplier` is exposed to gameplay.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiplierResult {
    /// Integer value of the digest prefix.
    pub prefix_value: u64,
    /// Prefix value normalized into [0, 1].
    pub raw_normalized_value: f64,
    /// Crash-curve output before the house edge. May be infinite.
    #[serde(with = "unbounded_f64")]
    pub raw_multiplier: f64,
    /// Curve output after the house edge, before clamping.
    #[serde(with = "unbounded_f64")]
    pub house_edge_adjusted: f64,
    /// Clamped and rounded multiplier.
    pub final_multiplier: Multiplier,
}

// JSON has no infinity; +inf travels as null.
mod unbounded_f64 {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_some(value)
        } else {
            serializer.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::INFINITY))
    }
}

/// Transform errors. Any of these means the digest was not produced by the
/// fairness hash, so callers treat them as integrity faults.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransformError {
    /// Parameters failed validation.
    #[error("invalid parameters: {0}")]
    Params(#[from] ParamsError),

    /// Digest shorter than the configured prefix.
    #[error("digest has {len} characters, prefix needs {needed}")]
    DigestTooShort {
        /// Digest length.
        len: usize,
        /// Configured prefix length.
        needed: usize,
    },

    /// Prefix is not base-16.
    #[error("failed to parse hash prefix {prefix:?} as hex")]
    Parse {
        /// The offending prefix.
        prefix: String,
    },
}

/// Run the transform over a digest.
///
/// Pure and total over well-formed digests: identical inputs always produce
/// identical outputs.
pub fn transform(
    digest: &FairnessDigest,
    params: &FairnessParams,
) -> Result<MultiplierResult, TransformError> {
    params.validate()?;

    let hex = digest.as_str();
    let prefix = hex.get(..params.prefix_len).ok_or(TransformError::DigestTooShort {
        len: hex.len(),
        needed: params.prefix_len,
    })?;

    let parse_error = || TransformError::Parse {
        prefix: prefix.to_string(),
    };
    // from_str_radix tolerates a leading '+', the published format does not.
    if !prefix.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(parse_error());
    }
    let prefix_value = u64::from_str_radix(prefix, 16).map_err(|_| parse_error())?;

    let max_value = params.max_prefix_value();
    let raw_normalized_value = prefix_value as f64 / max_value as f64;

    // x == 1 yields +inf here; the clamp below absorbs it.
    let raw_multiplier = 1.0 / (1.0 - raw_normalized_value);
    let house_edge_adjusted = raw_multiplier * (1.0 - params.house_edge);

    let clamped = house_edge_adjusted
        .max(params.min_multiplier)
        .min(params.max_multiplier);
    let hundredths = round_half_up(clamped * MULTIPLIER_SCALE as f64) as u32;

    Ok(MultiplierResult {
        prefix_value,
        raw_normalized_value,
        raw_multiplier,
        house_edge_adjusted,
        final_multiplier: Multiplier::from_hundredths(hundredths),
    })
}
