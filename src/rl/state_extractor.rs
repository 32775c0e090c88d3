// src/rl/state_extractor.rs
use std::collections::HashSet;

use super::sessions::{count_sessions, DEFAULT_SESSION_GAP_SECONDS};
use crate::models::{ObservationWindow, StateVector};

/// Extracts the state vector for a window using the default 60s session gap.
pub fn extract_state(window: &ObservationWindow) -> StateVector {
    extract_state_with_gap(window, DEFAULT_SESSION_GAP_SECONDS)
}

/// Deterministic summary of a window. Empty windows produce the all-zero state.
pub fn extract_state_with_gap(window: &ObservationWindow, session_gap_seconds: f64) -> StateVector {
    let events = window.events();
    if events.is_empty() {
        return StateVector::default();
    }

    let mut times: Vec<f64> = events.iter().map(|e| e.time_offset_seconds).collect();
    times.sort_by(f64::total_cmp);

    let unique_sources = events
        .iter()
        .map(|e| e.src_address.as_str())
        .collect::<HashSet<_>>()
        .len();

    let duration = window.duration_seconds();
    let connection_rate = if duration > 0.0 {
        times.len() as f64 / duration
    } else {
        0.0
    };

    StateVector {
        total_connections: times.len() as f64,
        unique_sources: unique_sources as f64,
        avg_time_gap: mean_gap(&times),
        session_count: count_sessions(&times, session_gap_seconds) as f64,
        connection_rate,
        traffic_trend: cumulative_trend(&times),
        attack_sustainability: sustainability(&times, duration / 2.0),
    }
}

fn mean_gap(sorted: &[f64]) -> f64 {
    if sorted.len() < 2 {
        return 0.0;
    }
    let total: f64 = sorted.windows(2).map(|w| w[1] - w[0]).sum();
    total / (sorted.len() - 1) as f64
}

// Least-squares slope of cumulative connection count (1, 2, .., n) against time.
fn cumulative_trend(sorted: &[f64]) -> f64 {
    if sorted.len() < 2 {
        return 0.0;
    }
    let n = sorted.len() as f64;
    let mean_x = sorted.iter().sum::<f64>() / n;
    let mean_y = (n + 1.0) / 2.0;

    let mut covariance = 0.0;
    let mut variance = 0.0;
    for (i, x) in sorted.iter().enumerate() {
        let dx = x - mean_x;
        covariance += dx * ((i + 1) as f64 - mean_y);
        variance += dx * dx;
    }
    if variance <= f64::EPSILON {
        // every event at the same instant
        return 0.0;
    }
    covariance / variance
}

fn sustainability(sorted: &[f64], midpoint: f64) -> f64 {
    let before = sorted.iter().filter(|t| **t <= midpoint).count();
    if before == 0 {
        return 0.0;
    }
    let after = sorted.len() - before;
    after as f64 / before as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ConnectionEvent;

    fn window(times_and_sources: &[(f64, &str)]) -> ObservationWindow {
        ObservationWindow::new(
            times_and_sources
                .iter()
                .map(|(t, src)| ConnectionEvent::new(*t, src, Some(22)))
                .collect(),
        )
    }

    #[test]
    fn test_empty_window_is_all_zero() {
        assert_eq!(extract_state(&ObservationWindow::empty()), StateVector::default());
    }

    #[test]
    fn test_single_event() {
        let state = extract_state(&window(&[(42.0, "a")]));
        assert_eq!(state.total_connections, 1.0);
        assert_eq!(state.unique_sources, 1.0);
        assert_eq!(state.avg_time_gap, 0.0);
        assert_eq!(state.session_count, 1.0);
        assert_eq!(state.traffic_trend, 0.0);
    }

    #[test]
    fn test_basic_counts_and_gaps() {
        let state = extract_state(&window(&[(0.0, "a"), (10.0, "b"), (20.0, "a"), (200.0, "c")]));
        assert_eq!(state.total_connections, 4.0);
        assert_eq!(state.unique_sources, 3.0);
        assert!((state.avg_time_gap - 200.0 / 3.0).abs() < 1e-12);
        assert_eq!(state.session_count, 2.0);
        assert!((state.connection_rate - 4.0 / 200.0).abs() < 1e-12);
    }

    #[test]
    fn test_linear_arrivals_have_matching_trend() {
        // One connection every 10 seconds: slope of cumulative count is 0.1/s.
        let state = extract_state(&window(&[(0.0, "a"), (10.0, "a"), (20.0, "a"), (30.0, "a")]));
        assert!((state.traffic_trend - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_simultaneous_events_have_zero_trend() {
        let state = extract_state(&window(&[(5.0, "a"), (5.0, "b")]));
        assert_eq!(state.traffic_trend, 0.0);
    }

    #[test]
    fn test_sustainability_uses_midpoint() {
        // Duration 100s, midpoint 50s: two before, three after.
        let state = extract_state(&window(&[(0.0, "a"), (40.0, "a"), (60.0, "a"), (80.0, "a"), (100.0, "a")]));
        assert!((state.attack_sustainability - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_explicit_duration_drives_rate() {
        let w = window(&[(10.0, "a"), (20.0, "b")]).with_duration(600.0);
        let state = extract_state(&w);
        assert!((state.connection_rate - 2.0 / 600.0).abs() < 1e-12);
        // both events fall before the 300s midpoint
        assert_eq!(state.attack_sustainability, 0.0);
    }
}
