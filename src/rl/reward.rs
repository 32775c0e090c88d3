// src/rl/reward.rs
//
// Reward for one dwell attempt: threat signal captured by the decoy minus a
// cost that grows with how long the decoy stayed up.
//
//   reward = alpha * unique_source_term
//          + beta  * session_term
//          + sustained_bonus
//          - gamma * duration_penalty
//
// The unique-source and session terms are both built from the same per-event
// attack score, so sustained single-attacker activity counts in both. They are
// weighted independently; set `beta` to 0 to score sources only.

use log::debug;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::errors::{check_range, ConfigError};
use super::sessions::{session_ranges, DEFAULT_SESSION_GAP_SECONDS};
use crate::models::{ConnectionEvent, ObservationWindow};

const BASE_ATTACK_SCORE: f64 = 1.0;
const NEUTRAL_MULTIPLIER: f64 = 1.0;
const SUSPICIOUS_COUNTRY_MULTIPLIER: f64 = 1.3;
const SUSPICIOUS_ASN_MULTIPLIER: f64 = 1.4;

/// Destination ports worth more than a generic probe. Unlisted ports score 1.0.
static DEFAULT_PORT_RISK: Lazy<BTreeMap<u16, f64>> = Lazy::new(|| {
    [
        (21, 1.4),   // ftp
        (22, 1.5),   // ssh
        (23, 1.8),   // telnet
        (25, 1.2),   // smtp
        (80, 1.2),   // http
        (443, 1.2),  // https
        (445, 1.8),  // smb
        (1433, 1.6), // mssql
        (3306, 1.6), // mysql
        (3389, 2.0), // rdp
        (5432, 1.6), // postgres
        (5900, 1.5), // vnc
        (6379, 1.5), // redis
        (8080, 1.1),
        (27017, 1.5), // mongodb
    ]
    .into_iter()
    .collect()
});

static DEFAULT_SUSPICIOUS_COUNTRIES: Lazy<BTreeSet<String>> = Lazy::new(|| {
    ["CN", "RU", "KP", "IR"]
        .into_iter()
        .map(str::to_string)
        .collect()
});

static DEFAULT_SUSPICIOUS_ASNS: Lazy<BTreeSet<u32>> = Lazy::new(|| {
    [
        4134,   // Chinanet
        4837,   // China Unicom
        9009,   // M247
        14061,  // DigitalOcean
        16276,  // OVH
        49870,  // Alsycon
        202425, // IP Volume
    ]
    .into_iter()
    .collect()
});

static DEFAULT_RISK_PROFILE: Lazy<RiskProfile> = Lazy::new(RiskProfile::default);

/// Lookup tables that turn a connection event into an attack score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskProfile {
    pub port_multipliers: BTreeMap<u16, f64>,
    pub suspicious_countries: BTreeSet<String>,
    pub suspicious_asns: BTreeSet<u32>,
    pub country_multiplier: f64,
    pub asn_multiplier: f64,
}

impl Default for RiskProfile {
    fn default() -> Self {
        Self {
            port_multipliers: DEFAULT_PORT_RISK.clone(),
            suspicious_countries: DEFAULT_SUSPICIOUS_COUNTRIES.clone(),
            suspicious_asns: DEFAULT_SUSPICIOUS_ASNS.clone(),
            country_multiplier: SUSPICIOUS_COUNTRY_MULTIPLIER,
            asn_multiplier: SUSPICIOUS_ASN_MULTIPLIER,
        }
    }
}

impl RiskProfile {
    pub fn port_multiplier(&self, port: Option<u16>) -> f64 {
        port.and_then(|p| self.port_multipliers.get(&p).copied())
            .unwrap_or(NEUTRAL_MULTIPLIER)
    }

    /// Base score times the port, country and ASN multipliers.
    /// Absent fields (including ones dropped as malformed on ingest) are neutral.
    pub fn attack_score(&self, event: &ConnectionEvent) -> f64 {
        let mut score = BASE_ATTACK_SCORE * self.port_multiplier(event.dst_port);
        if event
            .src_country
            .as_ref()
            .is_some_and(|c| self.suspicious_countries.contains(c.as_str()))
        {
            score *= self.country_multiplier;
        }
        if event
            .src_asn
            .is_some_and(|asn| self.suspicious_asns.contains(&asn))
        {
            score *= self.asn_multiplier;
        }
        score
    }
}

/// Weights of the reward terms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RewardWeights {
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
    pub session_gap_seconds: f64,
    pub sustain_threshold_minutes: f64,
    /// Penalty per minute of shortfall below the sustain threshold.
    pub extra_penalty_factor: f64,
    /// Scale of the after/before activity ratio bonus.
    pub bonus_factor: f64,
}

impl Default for RewardWeights {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            beta: 0.5,
            gamma: 0.2,
            session_gap_seconds: DEFAULT_SESSION_GAP_SECONDS,
            sustain_threshold_minutes: 5.0,
            extra_penalty_factor: 1.0,
            bonus_factor: 0.5,
        }
    }
}

impl RewardWeights {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("reward alpha", self.alpha, 0.0, false, f64::MAX, ">= 0")?;
        check_range("reward beta", self.beta, 0.0, false, f64::MAX, ">= 0")?;
        check_range("reward gamma", self.gamma, 0.0, false, f64::MAX, ">= 0")?;
        check_range(
            "session_gap_seconds",
            self.session_gap_seconds,
            0.0,
            true,
            f64::MAX,
            "> 0",
        )?;
        check_range(
            "sustain_threshold_minutes",
            self.sustain_threshold_minutes,
            0.0,
            false,
            f64::MAX,
            ">= 0",
        )?;
        check_range(
            "extra_penalty_factor",
            self.extra_penalty_factor,
            0.0,
            false,
            f64::MAX,
            ">= 0",
        )?;
        check_range("bonus_factor", self.bonus_factor, 0.0, false, f64::MAX, ">= 0")
    }
}

/// Every component of a reward, for logging and session records.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RewardBreakdown {
    pub unique_source_term: f64,
    pub session_term: f64,
    pub duration_penalty: f64,
    pub sustained_bonus: f64,
    pub total: f64,
}

/// Reward for keeping a decoy up `dwell_minutes`, scored with the built-in risk tables.
pub fn compute_reward(window: &ObservationWindow, dwell_minutes: f64, weights: &RewardWeights) -> f64 {
    compute_reward_breakdown(window, dwell_minutes, weights, &DEFAULT_RISK_PROFILE).total
}

/// Same as [`compute_reward`] with explicit risk tables, returning every term.
///
/// Events after `dwell_minutes` are ignored, so passing an untruncated window is safe.
pub fn compute_reward_breakdown(
    window: &ObservationWindow,
    dwell_minutes: f64,
    weights: &RewardWeights,
    risk: &RiskProfile,
) -> RewardBreakdown {
    let cutoff = dwell_minutes * 60.0;
    let events: Vec<&ConnectionEvent> = window
        .events()
        .iter()
        .filter(|e| e.time_offset_seconds <= cutoff)
        .collect();

    let unique_source_term = unique_source_term(&events, risk);
    let session_term = session_term(&events, risk, weights.session_gap_seconds);

    let mut duration_penalty = dwell_minutes;
    let mut sustained_bonus = 0.0;
    if dwell_minutes < weights.sustain_threshold_minutes {
        duration_penalty +=
            weights.extra_penalty_factor * (weights.sustain_threshold_minutes - dwell_minutes);
    } else {
        let threshold_seconds = weights.sustain_threshold_minutes * 60.0;
        let before = events
            .iter()
            .filter(|e| e.time_offset_seconds <= threshold_seconds)
            .count();
        let after = events.len() - before;
        if before > 0 {
            sustained_bonus = weights.bonus_factor * (after as f64 / before as f64);
        }
    }

    let total = weights.alpha * unique_source_term + weights.beta * session_term + sustained_bonus
        - weights.gamma * duration_penalty;

    debug!(
        "Reward for {:.2} min over {} events: unique={:.3}, sessions={:.3}, bonus={:.3}, penalty={:.3}, total={:.3}",
        dwell_minutes,
        events.len(),
        unique_source_term,
        session_term,
        sustained_bonus,
        duration_penalty,
        total
    );

    RewardBreakdown {
        unique_source_term,
        session_term,
        duration_penalty,
        sustained_bonus,
        total,
    }
}

// Sum over distinct sources of the highest score each source reached.
fn unique_source_term(events: &[&ConnectionEvent], risk: &RiskProfile) -> f64 {
    let mut best_by_source: BTreeMap<&str, f64> = BTreeMap::new();
    for event in events {
        let score = risk.attack_score(event);
        best_by_source
            .entry(event.src_address.as_str())
            .and_modify(|best| *best = best.max(score))
            .or_insert(score);
    }
    best_by_source.values().sum()
}

// Sum over every session of every source of the highest score in that session.
fn session_term(events: &[&ConnectionEvent], risk: &RiskProfile, gap_seconds: f64) -> f64 {
    let mut by_source: BTreeMap<&str, Vec<&ConnectionEvent>> = BTreeMap::new();
    for event in events {
        by_source
            .entry(event.src_address.as_str())
            .or_default()
            .push(event);
    }

    let mut total = 0.0;
    for source_events in by_source.values_mut() {
        source_events.sort_by(|a, b| a.time_offset_seconds.total_cmp(&b.time_offset_seconds));
        let times: Vec<f64> = source_events.iter().map(|e| e.time_offset_seconds).collect();
        for range in session_ranges(&times, gap_seconds) {
            total += source_events[range]
                .iter()
                .map(|e| risk.attack_score(e))
                .fold(f64::MIN, f64::max);
        }
    }
    total
}
