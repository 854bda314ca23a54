//! Fixed-Point Multiplier
//!
//! Final multipliers are stored as an integer count of hundredths so that
//! equality checks during verification never compare raw floats.
//!
//! `2.54x` is stored as `254`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Hundredths per unit multiplier.
pub const MULTIPLIER_SCALE: u32 = 100;

/// Largest distance from a whole hundredth still read as float noise.
const HUNDREDTH_TOLERANCE: f64 = 1e-6;

/// A payout multiplier with two decimal places.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Multiplier(u32);

impl Multiplier {
    /// Create from a count of hundredths.
    pub const fn from_hundredths(hundredths: u32) -> Self {
        Self(hundredths)
    }

    /// Round a float to the nearest hundredth, halves rounding up.
    ///
    /// Returns `None` for negative, non-finite or out-of-range input.
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() || value < 0.0 {
            return None;
        }
        let scaled = round_half_up(value * MULTIPLIER_SCALE as f64);
        if scaled > u32::MAX as f64 {
            return None;
        }
        Some(Self(scaled as u32))
    }

    /// Read a published two-decimal value.
    ///
    /// Unlike [`Multiplier::from_f64`] nothing is rounded away: `1.294` is not
    /// a published multiplier and yields `None`.
    pub fn from_published(value: f64) -> Option<Self> {
        let scaled = value * MULTIPLIER_SCALE as f64;
        if (scaled - scaled.round()).abs() > HUNDREDTH_TOLERANCE {
            return None;
        }
        Self::from_f64(value)
    }

    /// Count of hundredths.
    pub fn hundredths(self) -> u32 {
        self.0
    }

    /// Float value (exact to two decimal places when printed).
    pub fn as_f64(self) -> f64 {
        self.0 as f64 / MULTIPLIER_SCALE as f64
    }
}

/// Round-half-up for non-negative values.
///
/// `f64::round` rounds halves away from zero, which is half-up for every
/// value this crate feeds it.
#[inline]
pub fn round_half_up(value: f64) -> f64 {
    value.round()
}

impl fmt::Display for Multiplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / MULTIPLIER_SCALE, self.0 % MULTIPLIER_SCALE)
    }
}

impl Serialize for Multiplier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

impl<'de> Deserialize<'de> for Multiplier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Self::from_published(value)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid multiplier {}", value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Multiplier::from_hundredths(254).to_string(), "2.54");
        assert_eq!(Multiplier::from_hundredths(100).to_string(), "1.00");
        assert_eq!(Multiplier::from_hundredths(999_900).to_string(), "9999.00");
        assert_eq!(Multiplier::from_hundredths(105).to_string(), "1.05");
    }

    #[test]
    fn test_from_f64_rounds_half_up() {
        // 1.125 is exact in binary, so this is a true half.
        assert_eq!(Multiplier::from_f64(1.125).map(|m| m.hundredths()), Some(113));
        assert_eq!(Multiplier::from_f64(1.1249).map(|m| m.hundredths()), Some(112));
        assert_eq!(Multiplier::from_f64(2.0).map(|m| m.hundredths()), Some(200));
    }

    #[test]
    fn test_from_f64_rejects_invalid() {
        assert!(Multiplier::from_f64(f64::NAN).is_none());
        assert!(Multiplier::from_f64(f64::INFINITY).is_none());
        assert!(Multiplier::from_f64(-1.0).is_none());
    }

    #[test]
    fn test_from_published_requires_two_decimals() {
        assert_eq!(Multiplier::from_published(1.29).map(|m| m.hundredths()), Some(129));
        assert_eq!(Multiplier::from_published(3.62).map(|m| m.hundredths()), Some(362));
        assert_eq!(Multiplier::from_published(9999.0).map(|m| m.hundredths()), Some(999_900));
        assert!(Multiplier::from_published(1.294).is_none());
        assert!(Multiplier::from_published(1.2851).is_none());
        assert!(Multiplier::from_published(f64::NAN).is_none());
    }

    #[test]
    fn test_json_rejects_extra_precision() {
        assert!(serde_json::from_str::<Multiplier>("1.294").is_err());
    }

    #[test]
    fn test_json_is_plain_number() {
        let json = serde_json::to_string(&Multiplier::from_hundredths(362)).unwrap();
        assert_eq!(json, "3.62");
        let back: Multiplier = serde_json::from_str(&json).unwrap();
        assert_eq!(back.hundredths(), 362);
    }
}
