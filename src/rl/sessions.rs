// src/rl/sessions.rs
//
// Session splitting shared by the reward model and the feature extractor.
// A session is a maximal run of events whose consecutive gaps are all <= the
// gap threshold; a gap strictly larger than the threshold starts a new one.

use std::ops::Range;

/// Default inactivity gap separating two sessions, seconds.
pub const DEFAULT_SESSION_GAP_SECONDS: f64 = 60.0;

/// Splits ascending time offsets into sessions, returned as index ranges into `times`.
/// `times` must already be sorted.
pub fn session_ranges(times: &[f64], gap_seconds: f64) -> Vec<Range<usize>> {
    if times.is_empty() {
        return Vec::new();
    }
    let mut ranges = Vec::new();
    let mut start = 0;
    for i in 1..times.len() {
        if times[i] - times[i - 1] > gap_seconds {
            ranges.push(start..i);
            start = i;
        }
    }
    ranges.push(start..times.len());
    ranges
}

/// Number of sessions in an unsorted set of offsets.
pub fn count_sessions(times: &[f64], gap_seconds: f64) -> usize {
    let mut sorted = times.to_vec();
    sorted.sort_by(f64::total_cmp);
    session_ranges(&sorted, gap_seconds).len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_has_no_sessions() {
        assert!(session_ranges(&[], 60.0).is_empty());
        assert_eq!(count_sessions(&[], 60.0), 0);
    }

    #[test]
    fn test_gap_equal_to_threshold_stays_in_session() {
        let ranges = session_ranges(&[0.0, 60.0, 121.0, 130.0], 60.0);
        assert_eq!(ranges, vec![0..2, 2..4]);
    }

    #[test]
    fn test_count_sorts_first() {
        assert_eq!(count_sessions(&[430.0, 0.0, 10.0, 400.0], 60.0), 2);
    }
}
