// src/models/state.rs
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of features in a [`StateVector`].
pub const STATE_FEATURE_COUNT: usize = 7;

/// Summary of attacker behaviour over one observation window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StateVector {
    pub total_connections: f64,
    pub unique_sources: f64,
    /// Mean gap between consecutive connections, seconds.
    pub avg_time_gap: f64,
    pub session_count: f64,
    /// Connections per second over the window duration.
    pub connection_rate: f64,
    /// Least-squares slope of cumulative connections against time.
    pub traffic_trend: f64,
    /// Events after the window midpoint divided by events before it.
    pub attack_sustainability: f64,
}

impl StateVector {
    /// Named features in a fixed (alphabetical) order. The discretized key uses the same order.
    pub fn features(&self) -> [(&'static str, f64); STATE_FEATURE_COUNT] {
        [
            ("attack_sustainability", self.attack_sustainability),
            ("avg_time_gap", self.avg_time_gap),
            ("connection_rate", self.connection_rate),
            ("session_count", self.session_count),
            ("total_connections", self.total_connections),
            ("traffic_trend", self.traffic_trend),
            ("unique_sources", self.unique_sources),
        ]
    }

    /// The lookup key for tabular policies. This is the only place rounding happens.
    pub fn discretize(&self) -> StateKey {
        let features = self.features();
        let mut hundredths = [0i64; STATE_FEATURE_COUNT];
        for (slot, (_, value)) in hundredths.iter_mut().zip(features.iter()) {
            *slot = to_hundredths(*value);
        }
        StateKey(hundredths)
    }
}

// Half away from zero. Non-finite values collapse to 0; `as` saturates out-of-range magnitudes.
fn to_hundredths(value: f64) -> i64 {
    if value.is_finite() {
        (value * 100.0).round() as i64
    } else {
        0
    }
}

/// A state vector rounded to two decimal places, stored as integer hundredths
/// so it can be hashed and compared exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StateKey([i64; STATE_FEATURE_COUNT]);

impl StateKey {
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.0.iter().map(|h| *h as f64 / 100.0)
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.values().map(|v| format!("{:.2}", v)).collect();
        write!(f, "({})", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_states_equal_after_rounding_share_a_key() {
        let a = StateVector {
            total_connections: 3.0,
            avg_time_gap: 12.3449,
            traffic_trend: 0.0101,
            ..Default::default()
        };
        let b = StateVector {
            total_connections: 3.0,
            avg_time_gap: 12.3412,
            traffic_trend: 0.0149,
            ..Default::default()
        };
        assert_eq!(a.discretize(), b.discretize());
    }

    #[test]
    fn test_states_differing_at_second_decimal_have_distinct_keys() {
        let a = StateVector {
            connection_rate: 0.12,
            ..Default::default()
        };
        let b = StateVector {
            connection_rate: 0.13,
            ..Default::default()
        };
        assert_ne!(a.discretize(), b.discretize());
    }

    #[test]
    fn test_non_finite_features_collapse_to_zero() {
        let a = StateVector {
            traffic_trend: f64::NAN,
            ..Default::default()
        };
        assert_eq!(a.discretize(), StateVector::default().discretize());
    }

    #[test]
    fn test_key_display() {
        let key = StateVector {
            total_connections: 2.0,
            ..Default::default()
        }
        .discretize();
        assert_eq!(
            key.to_string(),
            "(0.00, 0.00, 0.00, 0.00, 2.00, 0.00, 0.00)"
        );
    }
}
