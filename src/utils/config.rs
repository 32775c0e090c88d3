// src/utils/config.rs
use log::{info, warn};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::rl::action_space::DEFAULT_DWELL_TIMES;
use crate::rl::errors::ConfigError;
use crate::rl::policy::{Policy, PolicyKind, PolicyParams};
use crate::rl::q_agent::{DEFAULT_Q_ALPHA, DEFAULT_Q_EPSILON, DEFAULT_Q_GAMMA};
use crate::rl::reward::RewardWeights;
use crate::rl::ucb::DEFAULT_EXPLORATION_WIDTH;
use crate::rl::ActionSpace;

const DEFAULT_MODEL_PATH: &str = "logs/dwell_policy.json";
const DEFAULT_SESSION_LOG_DIR: &str = "logs";

/// Engine configuration, read from the environment (and `.env`).
///
/// Values that fail to parse fall back to their defaults with a warning.
/// Values that parse but are out of range are rejected by [`EngineConfig::validate`].
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub policy: PolicyKind,
    pub dwell_times: Vec<f64>,
    pub epsilon: f64,
    pub alpha: f64,
    pub gamma: f64,
    pub ucb_c: f64,
    pub seed: Option<u64>,
    /// Where the learned policy is saved. `None` disables persistence.
    pub model_path: Option<PathBuf>,
    pub session_log_dir: PathBuf,
    pub progress_enabled: bool,
    pub reward_weights: RewardWeights,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            policy: PolicyKind::QLearning,
            dwell_times: DEFAULT_DWELL_TIMES.to_vec(),
            epsilon: DEFAULT_Q_EPSILON,
            alpha: DEFAULT_Q_ALPHA,
            gamma: DEFAULT_Q_GAMMA,
            ucb_c: DEFAULT_EXPLORATION_WIDTH,
            seed: None,
            model_path: Some(PathBuf::from(DEFAULT_MODEL_PATH)),
            session_log_dir: PathBuf::from(DEFAULT_SESSION_LOG_DIR),
            progress_enabled: true,
            reward_weights: RewardWeights::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup; `from_env` uses the process environment.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let weights = defaults.reward_weights;

        let model_path = match lookup("DWELL_MODEL_PATH") {
            Some(path) if path.trim().is_empty() || path.trim() == "none" => None,
            Some(path) => Some(PathBuf::from(path.trim())),
            None => defaults.model_path,
        };

        Self {
            policy: parse_or(&lookup, "DWELL_POLICY", defaults.policy),
            dwell_times: parse_dwell_times(&lookup).unwrap_or(defaults.dwell_times),
            epsilon: parse_or(&lookup, "DWELL_EPSILON", defaults.epsilon),
            alpha: parse_or(&lookup, "DWELL_ALPHA", defaults.alpha),
            gamma: parse_or(&lookup, "DWELL_GAMMA", defaults.gamma),
            ucb_c: parse_or(&lookup, "DWELL_UCB_C", defaults.ucb_c),
            seed: lookup("DWELL_SEED").and_then(|raw| match raw.trim().parse::<u64>() {
                Ok(seed) => Some(seed),
                Err(_) => {
                    warn!("Ignoring unparsable DWELL_SEED='{}'", raw);
                    None
                }
            }),
            model_path,
            session_log_dir: lookup("SESSION_LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.session_log_dir),
            progress_enabled: parse_or(&lookup, "PROGRESS_ENABLED", defaults.progress_enabled),
            reward_weights: RewardWeights {
                alpha: parse_or(&lookup, "REWARD_ALPHA", weights.alpha),
                beta: parse_or(&lookup, "REWARD_BETA", weights.beta),
                gamma: parse_or(&lookup, "REWARD_GAMMA", weights.gamma),
                session_gap_seconds: parse_or(
                    &lookup,
                    "REWARD_SESSION_GAP_SECONDS",
                    weights.session_gap_seconds,
                ),
                sustain_threshold_minutes: parse_or(
                    &lookup,
                    "REWARD_SUSTAIN_THRESHOLD_MINUTES",
                    weights.sustain_threshold_minutes,
                ),
                extra_penalty_factor: parse_or(
                    &lookup,
                    "REWARD_EXTRA_PENALTY_FACTOR",
                    weights.extra_penalty_factor,
                ),
                bonus_factor: parse_or(&lookup, "REWARD_BONUS_FACTOR", weights.bonus_factor),
            },
        }
    }

    pub fn policy_params(&self) -> Result<PolicyParams, ConfigError> {
        Ok(PolicyParams {
            kind: self.policy,
            actions: ActionSpace::new(self.dwell_times.clone())?,
            epsilon: self.epsilon,
            alpha: self.alpha,
            gamma: self.gamma,
            c: self.ucb_c,
            seed: self.seed,
        })
    }

    /// Checks every range by building the configured policy once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Policy::build(&self.policy_params()?)?;
        self.reward_weights.validate()
    }

    pub fn log_config(&self) {
        info!("🍯 Dwell policy: {}", self.policy);
        info!("   Dwell times (min): {:?}", self.dwell_times);
        match self.policy {
            PolicyKind::EpsilonGreedy => {
                info!("   epsilon={}, alpha={}", self.epsilon, self.alpha)
            }
            PolicyKind::Ucb => info!("   c={}", self.ucb_c),
            PolicyKind::QLearning => info!(
                "   epsilon={}, alpha={}, gamma={}",
                self.epsilon, self.alpha, self.gamma
            ),
        }
        match self.seed {
            Some(seed) => info!("   Seed: {}", seed),
            None => info!("   Seed: from entropy"),
        }
        match &self.model_path {
            Some(path) => info!("   Model path: {}", path.display()),
            None => warn!("   No model path; learned values will not be persisted"),
        }
        let w = &self.reward_weights;
        info!(
            "   Reward weights: alpha={}, beta={}, gamma={}, session_gap={}s, sustain_threshold={}min, extra_penalty={}, bonus={}",
            w.alpha,
            w.beta,
            w.gamma,
            w.session_gap_seconds,
            w.sustain_threshold_minutes,
            w.extra_penalty_factor,
            w.bonus_factor
        );
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Ignoring unparsable {}='{}'; using default", key, raw);
            default
        }),
        None => default,
    }
}

fn parse_dwell_times<F>(lookup: &F) -> Option<Vec<f64>>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup("DWELL_ACTIONS")?;
    let parsed: Result<Vec<f64>, _> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse::<f64>)
        .collect();
    match parsed {
        Ok(times) => Some(times),
        Err(_) => {
            warn!("Ignoring unparsable DWELL_ACTIONS='{}'; using default", raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_nothing_set() {
        let config = EngineConfig::from_lookup(lookup_from(&[]));
        assert_eq!(config, EngineConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_reads_policy_and_actions() {
        let config = EngineConfig::from_lookup(lookup_from(&[
            ("DWELL_POLICY", "ucb"),
            ("DWELL_ACTIONS", "3, 6.5 ,9"),
            ("DWELL_UCB_C", "2.0"),
            ("DWELL_SEED", "17"),
            ("DWELL_MODEL_PATH", "none"),
            ("REWARD_BETA", "0.0"),
        ]));
        assert_eq!(config.policy, PolicyKind::Ucb);
        assert_eq!(config.dwell_times, vec![3.0, 6.5, 9.0]);
        assert_eq!(config.ucb_c, 2.0);
        assert_eq!(config.seed, Some(17));
        assert_eq!(config.model_path, None);
        assert_eq!(config.reward_weights.beta, 0.0);
    }

    #[test]
    fn test_unparsable_values_fall_back() {
        let config = EngineConfig::from_lookup(lookup_from(&[
            ("DWELL_EPSILON", "lots"),
            ("DWELL_ACTIONS", "5,ten"),
            ("DWELL_POLICY", "sarsa"),
        ]));
        assert_eq!(config.epsilon, DEFAULT_Q_EPSILON);
        assert_eq!(config.dwell_times, DEFAULT_DWELL_TIMES.to_vec());
        assert_eq!(config.policy, PolicyKind::QLearning);
    }

    #[test]
    fn test_out_of_range_values_fail_validation() {
        let config = EngineConfig::from_lookup(lookup_from(&[("DWELL_EPSILON", "1.5")]));
        assert!(matches!(config.validate(), Err(ConfigError::OutOfRange { name: "epsilon", .. })));

        let config = EngineConfig::from_lookup(lookup_from(&[("DWELL_ACTIONS", "")]));
        assert_eq!(config.validate(), Err(ConfigError::EmptyActionSpace));

        let config = EngineConfig::from_lookup(lookup_from(&[("REWARD_SESSION_GAP_SECONDS", "-1")]));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_env() {
        env::set_var("DWELL_POLICY", "epsilon_greedy");
        env::set_var("DWELL_ALPHA", "0.25");

        let config = EngineConfig::from_env();
        assert_eq!(config.policy, PolicyKind::EpsilonGreedy);
        assert_eq!(config.alpha, 0.25);

        // Cleanup
        env::remove_var("DWELL_POLICY");
        env::remove_var("DWELL_ALPHA");
    }
}
