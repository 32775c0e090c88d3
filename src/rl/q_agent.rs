// src/rl/q_agent.rs
use log::debug;
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::action_space::{argmax_first, ActionSpace};
use super::errors::{check_range, ConfigError, PolicyError};
use super::policy::policy_rng;
use super::value_table::QTable;
use crate::models::{StateKey, StateVector};

pub const DEFAULT_Q_ALPHA: f64 = 0.1;
pub const DEFAULT_Q_GAMMA: f64 = 0.9;
pub const DEFAULT_Q_EPSILON: f64 = 0.1;

/// Tabular one-step Q-learning over discretized state vectors.
///
/// Rows are created on first sight of a state with every action at 0.0.
/// Selection creates the row for the state it looks at, so a state that has
/// been acted in always has an entry in the table.
#[derive(Debug, Clone)]
pub struct QAgent {
    actions: ActionSpace,
    q_table: QTable,
    alpha: f64,
    gamma: f64,
    epsilon: f64,
    rng: StdRng,
}

/// Persisted form of a [`QAgent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QAgentSnapshot {
    pub alpha: f64,
    pub gamma: f64,
    pub epsilon: f64,
    pub actions: ActionSpace,
    pub q_table: QTable,
}

impl QAgent {
    pub fn new(actions: ActionSpace, alpha: f64, gamma: f64, epsilon: f64) -> Result<Self, ConfigError> {
        Self::with_seed(actions, alpha, gamma, epsilon, None)
    }

    pub fn with_seed(
        actions: ActionSpace,
        alpha: f64,
        gamma: f64,
        epsilon: f64,
        seed: Option<u64>,
    ) -> Result<Self, ConfigError> {
        validate(alpha, gamma, epsilon)?;
        Ok(Self {
            q_table: QTable::new(actions.len()),
            actions,
            alpha,
            gamma,
            epsilon,
            rng: policy_rng(seed),
        })
    }

    pub fn from_snapshot(snapshot: QAgentSnapshot, seed: Option<u64>) -> Result<Self, ConfigError> {
        let QAgentSnapshot {
            alpha,
            gamma,
            epsilon,
            actions,
            q_table,
        } = snapshot;
        validate(alpha, gamma, epsilon)?;
        if q_table.action_count() != actions.len() {
            return Err(ConfigError::OutOfRange {
                name: "q_table action_count",
                value: q_table.action_count() as f64,
                expected: "the number of configured dwell times",
            });
        }
        Ok(Self {
            actions,
            q_table,
            alpha,
            gamma,
            epsilon,
            rng: policy_rng(seed),
        })
    }

    pub fn snapshot(&self) -> QAgentSnapshot {
        QAgentSnapshot {
            alpha: self.alpha,
            gamma: self.gamma,
            epsilon: self.epsilon,
            actions: self.actions.clone(),
            q_table: self.q_table.clone(),
        }
    }

    pub fn actions(&self) -> &ActionSpace {
        &self.actions
    }

    pub fn q_table(&self) -> &QTable {
        &self.q_table
    }

    /// Value of `dwell_minutes` in `state`, if that state has a row.
    pub fn q_value(&self, state: &StateVector, dwell_minutes: f64) -> Option<f64> {
        let index = self.actions.index_of(dwell_minutes)?;
        self.q_table
            .get(&state.discretize())
            .and_then(|row| row.get(index).copied())
    }

    pub fn select_action(&mut self, state: &StateVector) -> f64 {
        let key = state.discretize();
        let row = self.q_table.get_or_create(key);

        if self.rng.gen_bool(self.epsilon) {
            let dwell = self.actions.dwell_times()[self.rng.gen_range(0..self.actions.len())];
            debug!("Exploring: selected random dwell time {:.2} minutes", dwell);
            dwell
        } else {
            let dwell = self.actions.dwell_times()[argmax_first(row)];
            debug!("Exploiting: selected dwell time {:.2} minutes for state {}", dwell, key);
            dwell
        }
    }

    /// `Q[s][a] += alpha * (reward + gamma * max(Q[s']) - Q[s][a])`
    pub fn update(
        &mut self,
        state: &StateVector,
        dwell_minutes: f64,
        reward: f64,
        next_state: &StateVector,
    ) -> Result<(), PolicyError> {
        if !reward.is_finite() {
            return Err(PolicyError::NonFiniteReward(reward));
        }
        let index = self
            .actions
            .index_of(dwell_minutes)
            .ok_or(PolicyError::UnknownAction(dwell_minutes))?;

        let key = state.discretize();
        let next_key = next_state.discretize();
        let best_next = max_value(self.q_table.get_or_create(next_key));

        let row = self.q_table.get_or_create(key);
        let current = row[index];
        let updated = current + self.alpha * (reward + self.gamma * best_next - current);
        row[index] = updated;

        debug!(
            "Updated Q-value for state {}, action {:.2}: {:.3} -> {:.3}",
            key, dwell_minutes, current, updated
        );
        Ok(())
    }

    pub fn state_count(&self) -> usize {
        self.q_table.len()
    }

    pub fn stats_display(&self) -> String {
        let mut output = format!(
            "Q-Learning Agent (alpha={:.2}, gamma={:.2}, epsilon={:.2}) Statistics:\n  States visited: {}\n",
            self.alpha,
            self.gamma,
            self.epsilon,
            self.q_table.len()
        );
        let mut rows: Vec<(&StateKey, &[f64])> = self.q_table.rows().collect();
        rows.sort_by(|a, b| a.0.cmp(b.0));
        for (key, values) in rows {
            let formatted: Vec<String> = self
                .actions
                .dwell_times()
                .iter()
                .zip(values)
                .map(|(d, q)| format!("{:.2}m={:.3}", d, q))
                .collect();
            output.push_str(&format!("  {} -> {}\n", key, formatted.join(", ")));
        }
        output
    }
}

fn max_value(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

fn validate(alpha: f64, gamma: f64, epsilon: f64) -> Result<(), ConfigError> {
    check_range("alpha", alpha, 0.0, true, 1.0, "(0, 1]")?;
    check_range("gamma", gamma, 0.0, false, 1.0, "[0, 1]")?;
    check_range("epsilon", epsilon, 0.0, false, 1.0, "[0, 1]")
}
