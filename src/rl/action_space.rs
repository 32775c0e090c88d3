// src/rl/action_space.rs
use serde::{Deserialize, Serialize};

use super::errors::{check_range, ConfigError};

/// Dwell times used when nothing else is configured (minutes).
pub const DEFAULT_DWELL_TIMES: [f64; 4] = [5.0, 8.0, 10.0, 12.0];

// Tolerance used when matching a reported dwell time back to its arm.
const ACTION_MATCH_TOLERANCE: f64 = 1e-9;

const STEP_DIVISION_TOLERANCE: f64 = 1e-6;

/// Fixed, ordered set of candidate dwell durations in minutes.
/// Order matters: ties between equally valued actions go to the earlier one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct ActionSpace {
    dwell_times: Vec<f64>,
}

impl ActionSpace {
    pub fn new(dwell_times: Vec<f64>) -> Result<Self, ConfigError> {
        if dwell_times.is_empty() {
            return Err(ConfigError::EmptyActionSpace);
        }
        for (i, &dwell) in dwell_times.iter().enumerate() {
            if !dwell.is_finite() || dwell <= 0.0 {
                return Err(ConfigError::InvalidAction(dwell));
            }
            if dwell_times[..i]
                .iter()
                .any(|seen| (seen - dwell).abs() < ACTION_MATCH_TOLERANCE)
            {
                return Err(ConfigError::DuplicateAction(dwell));
            }
        }
        Ok(Self { dwell_times })
    }

    /// Evenly spaced grid from `start` to `end` inclusive, e.g. 5..=15 in 0.5 minute steps.
    pub fn linspace(start: f64, end: f64, steps: usize) -> Result<Self, ConfigError> {
        if steps == 0 {
            return Err(ConfigError::EmptyActionSpace);
        }
        if steps == 1 {
            return Self::new(vec![start]);
        }
        let step = (end - start) / (steps - 1) as f64;
        Self::new((0..steps).map(|i| start + step * i as f64).collect())
    }

    /// Grid from `start` to `end` inclusive in increments of `step`.
    /// The step must divide the range evenly; a range that would need a
    /// different spacing is rejected rather than silently adjusted.
    pub fn stepped(start: f64, end: f64, step: f64) -> Result<Self, ConfigError> {
        check_range("step", step, 0.0, true, f64::MAX, "> 0")?;
        if !(end >= start) {
            return Err(ConfigError::OutOfRange {
                name: "end",
                value: end,
                expected: "at least the start of the range",
            });
        }
        let intervals = (end - start) / step;
        if (intervals - intervals.round()).abs() > STEP_DIVISION_TOLERANCE {
            return Err(ConfigError::OutOfRange {
                name: "step",
                value: step,
                expected: "a step that divides the range evenly",
            });
        }
        Self::linspace(start, end, intervals.round() as usize + 1)
    }

    pub fn dwell_times(&self) -> &[f64] {
        &self.dwell_times
    }

    pub fn len(&self) -> usize {
        self.dwell_times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dwell_times.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.dwell_times.get(index).copied()
    }

    pub fn index_of(&self, dwell_minutes: f64) -> Option<usize> {
        self.dwell_times
            .iter()
            .position(|d| (d - dwell_minutes).abs() < ACTION_MATCH_TOLERANCE)
    }

    pub fn contains(&self, dwell_minutes: f64) -> bool {
        self.index_of(dwell_minutes).is_some()
    }
}

impl Default for ActionSpace {
    fn default() -> Self {
        Self {
            dwell_times: DEFAULT_DWELL_TIMES.to_vec(),
        }
    }
}

impl TryFrom<Vec<f64>> for ActionSpace {
    type Error = ConfigError;

    fn try_from(dwell_times: Vec<f64>) -> Result<Self, Self::Error> {
        Self::new(dwell_times)
    }
}

impl From<ActionSpace> for Vec<f64> {
    fn from(space: ActionSpace) -> Self {
        space.dwell_times
    }
}

/// Index of the largest value; the earliest index wins ties.
/// Returns 0 for an empty slice (callers never pass one: action spaces are non-empty).
pub(crate) fn argmax_first(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate().skip(1) {
        if *v > values[best] {
            best = i;
        }
    }
    best
}
