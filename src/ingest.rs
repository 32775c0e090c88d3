// src/ingest.rs
//
// JSON-lines connection logs as written by the decoy capture tooling. Every
// field is sanitized on the way in so the feature extractor and reward model
// only ever see well-formed events.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::Deserialize;
use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::models::{ConnectionEvent, CountryCode, UNKNOWN_ADDRESS};

/// One line of the capture log before sanitizing. Accepts both the capture
/// tool's field names and the snake_case ones.
#[derive(Debug, Default, Deserialize)]
pub struct RawConnectionRecord {
    #[serde(default, alias = "TimeSinceStart", alias = "time_since_start")]
    pub time_offset_seconds: Option<Value>,
    #[serde(default, alias = "SrcIP", alias = "src_ip")]
    pub src_address: Option<Value>,
    #[serde(default, alias = "SrcPort")]
    pub src_port: Option<Value>,
    #[serde(default, alias = "DstIP", alias = "dst_ip")]
    pub dst_address: Option<Value>,
    #[serde(default, alias = "DstPort")]
    pub dst_port: Option<Value>,
    #[serde(default, alias = "ASN", alias = "asn")]
    pub src_asn: Option<Value>,
    #[serde(default, alias = "Country", alias = "country")]
    pub src_country: Option<Value>,
}

impl RawConnectionRecord {
    /// `None` when the record has no usable time offset.
    pub fn sanitize(self) -> Option<ConnectionEvent> {
        let time_offset_seconds = self
            .time_offset_seconds
            .as_ref()
            .and_then(as_f64)
            .filter(|t| t.is_finite() && *t >= 0.0)?;

        Some(ConnectionEvent {
            time_offset_seconds,
            src_address: address(self.src_address.as_ref()),
            src_port: self.src_port.as_ref().and_then(as_port),
            dst_address: address(self.dst_address.as_ref()),
            dst_port: self.dst_port.as_ref().and_then(as_port),
            src_asn: self.src_asn.as_ref().and_then(as_asn),
            src_country: self
                .src_country
                .as_ref()
                .and_then(Value::as_str)
                .and_then(CountryCode::parse),
        })
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

// Whole numbers only; 22.0 is accepted, 22.5 is not.
fn as_integer(value: &Value) -> Option<i64> {
    if let Some(i) = value.as_i64() {
        return Some(i);
    }
    let f = as_f64(value)?;
    (f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64).then(|| f as i64)
}

fn as_port(value: &Value) -> Option<u16> {
    as_integer(value).and_then(|p| u16::try_from(p).ok())
}

fn as_asn(value: &Value) -> Option<u32> {
    if let Some(s) = value.as_str() {
        // "AS4134" style
        let digits = s.trim().trim_start_matches("AS").trim_start_matches("as");
        return digits.parse().ok();
    }
    as_integer(value).and_then(|a| u32::try_from(a).ok())
}

fn address(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        _ => UNKNOWN_ADDRESS.to_string(),
    }
}

/// Parses every line of a JSON-lines capture. Blank lines are ignored;
/// malformed lines and events without a usable time offset are skipped with a warning.
pub fn parse_event_lines<R: BufRead>(reader: R) -> Result<Vec<ConnectionEvent>> {
    let mut events = Vec::new();
    let mut skipped = 0usize;

    for (index, line) in reader.lines().enumerate() {
        let line_number = index + 1;
        let line = line.with_context(|| format!("Failed to read line {}", line_number))?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str::<RawConnectionRecord>(trimmed) {
            Ok(record) => match record.sanitize() {
                Some(event) => events.push(event),
                None => {
                    skipped += 1;
                    warn!("Skipping line {}: missing or invalid time offset", line_number);
                }
            },
            Err(e) => {
                skipped += 1;
                warn!("Skipping malformed line {}: {}", line_number, e);
            }
        }
    }

    if skipped > 0 {
        info!("Parsed {} events, skipped {} lines", events.len(), skipped);
    } else {
        debug!("Parsed {} events", events.len());
    }
    Ok(events)
}

pub fn parse_event_log(path: impl AsRef<Path>) -> Result<Vec<ConnectionEvent>> {
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open event log {}", path.display()))?;
    let events = parse_event_lines(BufReader::new(file))
        .with_context(|| format!("Failed to parse event log {}", path.display()))?;
    info!("📥 Loaded {} connection events from {}", events.len(), path.display());
    Ok(events)
}
