// src/rl/errors.rs
use thiserror::Error;

/// Invalid construction parameters. Always fatal: the policy is never built.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Action space must contain at least one dwell time")]
    EmptyActionSpace,

    #[error("Dwell time {0} is not a finite positive number of minutes")]
    InvalidAction(f64),

    #[error("Dwell time {0} appears more than once in the action space")]
    DuplicateAction(f64),

    #[error("{name} = {value} is out of range (expected {expected})")]
    OutOfRange {
        name: &'static str,
        value: f64,
        expected: &'static str,
    },
}

/// Rejected value-table updates. The table is left untouched.
#[derive(Debug, Error, PartialEq)]
pub enum PolicyError {
    #[error("Dwell time {0} is not part of the configured action space")]
    UnknownAction(f64),

    #[error("Reward {0} is not finite")]
    NonFiniteReward(f64),
}

/// Fails unless `value` is finite and inside `[lo, hi]`, with `lo` exclusive when `lo_open`.
pub(crate) fn check_range(
    name: &'static str,
    value: f64,
    lo: f64,
    lo_open: bool,
    hi: f64,
    expected: &'static str,
) -> Result<(), ConfigError> {
    let above_lo = if lo_open { value > lo } else { value >= lo };
    if value.is_finite() && above_lo && value <= hi {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            name,
            value,
            expected,
        })
    }
}
