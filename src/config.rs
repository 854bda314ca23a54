//! Engine Configuration
//!
//! Environment-driven configuration for the demo binary and any host that
//! embeds the engine. Unset or unparsable variables keep their defaults.

use std::str::FromStr;

use crate::fairness::params::{FairnessParams, ParamsError};

/// Default number of rounds for the simulation harness.
pub const DEFAULT_SIMULATION_ROUNDS: u32 = 100_000;

/// Default tracing filter.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Engine configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Fairness parameters for new rounds.
    pub params: FairnessParams,
    /// Rounds to run in the simulation harness.
    pub simulation_rounds: u32,
    /// `tracing_subscriber::EnvFilter` directive.
    pub log_filter: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            params: FairnessParams::default(),
            simulation_rounds: DEFAULT_SIMULATION_ROUNDS,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables.
    ///
    /// - `CRASH_FAIR_HOUSE_EDGE`
    /// - `CRASH_FAIR_PREFIX_LEN`
    /// - `CRASH_FAIR_MIN_MULTIPLIER`
    /// - `CRASH_FAIR_MAX_MULTIPLIER`
    /// - `CRASH_FAIR_MAX_SEED_LEN`
    /// - `CRASH_FAIR_SIMULATION_ROUNDS`
    /// - `CRASH_FAIR_LOG`
    pub fn from_env() -> Result<Self, ParamsError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ParamsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let base = defaults.params;

        let params = FairnessParams {
            house_edge: parsed(&lookup, "CRASH_FAIR_HOUSE_EDGE", base.house_edge),
            prefix_len: parsed(&lookup, "CRASH_FAIR_PREFIX_LEN", base.prefix_len),
            min_multiplier: parsed(&lookup, "CRASH_FAIR_MIN_MULTIPLIER", base.min_multiplier),
            max_multiplier: parsed(&lookup, "CRASH_FAIR_MAX_MULTIPLIER", base.max_multiplier),
            max_contribution_len: parsed(
                &lookup,
                "CRASH_FAIR_MAX_SEED_LEN",
                base.max_contribution_len,
            ),
            ..base
        };
        params.validate()?;

        Ok(Self {
            params,
            simulation_rounds: parsed(
                &lookup,
                "CRASH_FAIR_SIMULATION_ROUNDS",
                defaults.simulation_rounds,
            ),
            log_filter: lookup("CRASH_FAIR_LOG")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.log_filter),
        })
    }
}

fn parsed<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
