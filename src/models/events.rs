// src/models/events.rs
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Address used when a record carries no usable source or destination.
pub const UNKNOWN_ADDRESS: &str = "unknown";

/// Two-letter ISO country code, always stored upper-case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CountryCode(String);

impl CountryCode {
    /// Accepts exactly two ASCII letters (any case). Anything else is not a country.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.len() == 2 && trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            Some(Self(trimmed.to_ascii_uppercase()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One observed inbound connection attempt, already sanitized.
/// Fields that could not be parsed on ingest are `None` and score neutrally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionEvent {
    pub time_offset_seconds: f64,
    pub src_address: String,
    pub src_port: Option<u16>,
    pub dst_address: String,
    pub dst_port: Option<u16>,
    pub src_asn: Option<u32>,
    pub src_country: Option<CountryCode>,
}

impl ConnectionEvent {
    /// Minimal event, mostly useful for tests and synthetic replays.
    pub fn new(time_offset_seconds: f64, src_address: &str, dst_port: Option<u16>) -> Self {
        Self {
            time_offset_seconds,
            src_address: src_address.to_string(),
            src_port: None,
            dst_address: UNKNOWN_ADDRESS.to_string(),
            dst_port,
            src_asn: None,
            src_country: None,
        }
    }

    pub fn with_destination(mut self, dst_address: &str) -> Self {
        self.dst_address = dst_address.to_string();
        self
    }

    pub fn with_origin(mut self, asn: Option<u32>, country: Option<&str>) -> Self {
        self.src_asn = asn;
        self.src_country = country.and_then(CountryCode::parse);
        self
    }
}

/// Ordered sequence of connection events for one decoy instance and one dwell attempt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObservationWindow {
    events: Vec<ConnectionEvent>,
    /// Explicit window length in seconds. When unset the latest event offset is used.
    duration_seconds: Option<f64>,
}

impl ObservationWindow {
    /// Builds a window, ordering events by time offset. Ties keep their input order.
    pub fn new(mut events: Vec<ConnectionEvent>) -> Self {
        events.sort_by(|a, b| a.time_offset_seconds.total_cmp(&b.time_offset_seconds));
        Self {
            events,
            duration_seconds: None,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_duration(mut self, duration_seconds: f64) -> Self {
        self.duration_seconds = Some(duration_seconds);
        self
    }

    pub fn events(&self) -> &[ConnectionEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Length of the window in seconds: the explicit duration if one was set,
    /// otherwise the offset of the latest event (0.0 when empty).
    pub fn duration_seconds(&self) -> f64 {
        self.duration_seconds.unwrap_or_else(|| {
            self.events
                .last()
                .map(|e| e.time_offset_seconds)
                .unwrap_or(0.0)
        })
    }

    /// The destination this window was captured on, if all events agree.
    pub fn destination(&self) -> Option<&str> {
        let first = self.events.first()?.dst_address.as_str();
        self.events
            .iter()
            .all(|e| e.dst_address == first)
            .then_some(first)
    }

    /// Events that a decoy torn down after `dwell_minutes` would have seen.
    pub fn truncated(&self, dwell_minutes: f64) -> Self {
        let cutoff = dwell_minutes * 60.0;
        let events = self
            .events
            .iter()
            .filter(|e| e.time_offset_seconds <= cutoff)
            .cloned()
            .collect();
        Self {
            events,
            duration_seconds: Some(cutoff),
        }
    }

    /// Events after the dwell boundary, with offsets rebased so the boundary is time zero.
    pub fn remainder_after(&self, dwell_minutes: f64) -> Self {
        let cutoff = dwell_minutes * 60.0;
        let events = self
            .events
            .iter()
            .filter(|e| e.time_offset_seconds > cutoff)
            .map(|e| {
                let mut rebased = e.clone();
                rebased.time_offset_seconds -= cutoff;
                rebased
            })
            .collect();
        let duration_seconds = self
            .duration_seconds
            .map(|d| (d - cutoff).max(0.0));
        Self {
            events,
            duration_seconds,
        }
    }

    /// Splits a mixed capture into one window per destination address.
    pub fn group_by_destination(events: Vec<ConnectionEvent>) -> BTreeMap<String, ObservationWindow> {
        let mut grouped: BTreeMap<String, Vec<ConnectionEvent>> = BTreeMap::new();
        for event in events {
            grouped
                .entry(event.dst_address.clone())
                .or_default()
                .push(event);
        }
        grouped
            .into_iter()
            .map(|(dst, events)| (dst, ObservationWindow::new(events)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(t: f64, src: &str) -> ConnectionEvent {
        ConnectionEvent::new(t, src, Some(22))
    }

    #[test]
    fn test_window_sorts_by_offset() {
        let window = ObservationWindow::new(vec![event(30.0, "a"), event(10.0, "b"), event(20.0, "c")]);
        let offsets: Vec<f64> = window.events().iter().map(|e| e.time_offset_seconds).collect();
        assert_eq!(offsets, vec![10.0, 20.0, 30.0]);
        assert_eq!(window.duration_seconds(), 30.0);
    }

    #[test]
    fn test_truncate_and_remainder_partition_the_window() {
        let window = ObservationWindow::new(vec![
            event(30.0, "a"),
            event(300.0, "b"),
            event(301.0, "c"),
            event(900.0, "d"),
        ]);
        let captured = window.truncated(5.0);
        let rest = window.remainder_after(5.0);

        assert_eq!(captured.len(), 2);
        assert_eq!(captured.duration_seconds(), 300.0);
        assert_eq!(rest.len(), 2);
        assert_eq!(rest.events()[0].time_offset_seconds, 1.0);
        assert_eq!(rest.events()[1].time_offset_seconds, 600.0);
    }

    #[test]
    fn test_group_by_destination() {
        let events = vec![
            event(5.0, "a").with_destination("10.0.0.2"),
            event(1.0, "b").with_destination("10.0.0.1"),
            event(2.0, "c").with_destination("10.0.0.2"),
        ];
        let grouped = ObservationWindow::group_by_destination(events);
        assert_eq!(grouped.len(), 2);
        let second = &grouped["10.0.0.2"];
        assert_eq!(second.len(), 2);
        assert_eq!(second.destination(), Some("10.0.0.2"));
        assert_eq!(second.events()[0].src_address, "c");
    }

    #[test]
    fn test_country_code_parsing() {
        assert_eq!(CountryCode::parse("ru").map(|c| c.to_string()), Some("RU".to_string()));
        assert!(CountryCode::parse("RUS").is_none());
        assert!(CountryCode::parse("1A").is_none());
        assert!(CountryCode::parse("").is_none());
    }
}
