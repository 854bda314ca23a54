//! Fairness Parameters
//!
//! The constants that define the published multiplier algorithm.
//! Every round record carries a copy so auditors can reproduce it exactly.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Version of the hash-to-multiplier algorithm.
///
/// Bump whenever the prefix length, curve, rounding or seed encoding changes.
pub const ALGORITHM_VERSION: u8 = 1;

/// Largest prefix that still fits a `f64` mantissa (13 * 4 = 52 bits).
pub const MAX_PREFIX_LEN: usize = 13;

/// Largest representable multiplier: `u32::MAX` hundredths.
pub const MAX_MULTIPLIER_LIMIT: f64 = u32::MAX as f64 / 100.0;

/// Parameters of the multiplier transform and contribution validation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FairnessParams {
    /// Algorithm version these parameters belong to.
    pub version: u8,
    /// Fraction removed from the fair payout (0.03 = 3%).
    pub house_edge: f64,
    /// Hex characters of the digest fed into the curve.
    pub prefix_len: usize,
    /// Lower clamp bound.
    pub min_multiplier: f64,
    /// Upper clamp bound.
    pub max_multiplier: f64,
    /// Maximum length of a player contribution, in characters.
    pub max_contribution_len: usize,
}

impl Default for FairnessParams {
    fn default() -> Self {
        Self {
            version: ALGORITHM_VERSION,
            house_edge: 0.03,
            prefix_len: 13,
            min_multiplier: 1.0,
            max_multiplier: 9999.0,
            max_contribution_len: 75,
        }
    }
}

impl FairnessParams {
    /// Check parameters are usable by the transform.
    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.version != ALGORITHM_VERSION {
            return Err(ParamsError::UnsupportedVersion(self.version));
        }
        if !(0.0..1.0).contains(&self.house_edge) {
            return Err(ParamsError::HouseEdge(self.house_edge));
        }
        if self.prefix_len == 0 || self.prefix_len > MAX_PREFIX_LEN {
            return Err(ParamsError::PrefixLen(self.prefix_len));
        }
        if !self.min_multiplier.is_finite()
            || !self.max_multiplier.is_finite()
            || self.min_multiplier < 0.0
            || self.min_multiplier > self.max_multiplier
            || self.max_multiplier > MAX_MULTIPLIER_LIMIT
        {
            return Err(ParamsError::Bounds {
                min: self.min_multiplier,
                max: self.max_multiplier,
            });
        }
        if self.max_contribution_len == 0 {
            return Err(ParamsError::MaxContributionLen);
        }
        Ok(())
    }

    /// Largest integer a prefix of `prefix_len` hex characters can hold.
    ///
    /// Saturates at `u64::MAX` for prefixes of 16 characters or more.
    pub fn max_prefix_value(&self) -> u64 {
        u32::try_from(4 * self.prefix_len)
            .ok()
            .and_then(|bits| 1u64.checked_shl(bits))
            .map_or(u64::MAX, |bound| bound - 1)
    }
}

/// Invalid parameter errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParamsError {
    /// Parameters written for a different algorithm version.
    #[error("unsupported algorithm version {0}")]
    UnsupportedVersion(u8),

    /// House edge outside [0, 1).
    #[error("house edge {0} must be in [0, 1)")]
    HouseEdge(f64),

    /// Prefix too long for exact f64 arithmetic, or empty.
    #[error("prefix length {0} must be in 1..=13")]
    PrefixLen(usize),

    /// Bounds are inverted, negative, non-finite or above `u32::MAX` hundredths.
    #[error("multiplier bounds [{min}, {max}] are invalid")]
    Bounds {
        /// Lower bound.
        min: f64,
        /// Upper bound.
        max: f64,
    },

    /// Contributions could never be accepted.
    #[error("max contribution length must be positive")]
    MaxContributionLen,
}
