// src/rl/ucb.rs
use log::debug;
use serde::{Deserialize, Serialize};

use super::action_space::{argmax_first, ActionSpace};
use super::errors::{check_range, ConfigError, PolicyError};
use super::value_table::{ArmEstimate, BanditTable};

pub const DEFAULT_EXPLORATION_WIDTH: f64 = 1.0;

/// Upper-confidence-bound bandit.
///
/// Every arm is tried once (in action-space order) before any score is
/// computed. After that the arm maximising
/// `estimate + c * sqrt(ln(total) / count)` wins, earliest arm on ties.
/// Estimates are plain running means.
#[derive(Debug, Clone)]
pub struct UcbBandit {
    actions: ActionSpace,
    table: BanditTable,
    c: f64,
    total_count: u64,
}

/// Persisted form of a [`UcbBandit`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UcbSnapshot {
    pub c: f64,
    pub total_count: u64,
    pub arms: Vec<ArmEstimate>,
}

impl UcbBandit {
    pub fn new(actions: ActionSpace, c: f64) -> Result<Self, ConfigError> {
        validate(c)?;
        Ok(Self {
            table: BanditTable::new(&actions),
            actions,
            c,
            total_count: 0,
        })
    }

    pub fn from_snapshot(snapshot: UcbSnapshot) -> Result<Self, ConfigError> {
        let UcbSnapshot { c, total_count, arms } = snapshot;
        validate(c)?;
        let actions = ActionSpace::new(arms.iter().map(|a| a.dwell_minutes).collect())?;
        let mut table = BanditTable::new(&actions);
        for (i, arm) in arms.into_iter().enumerate() {
            if let Some(slot) = table.arm_mut(i) {
                *slot = arm;
            }
        }
        Ok(Self {
            actions,
            table,
            c,
            total_count,
        })
    }

    pub fn snapshot(&self) -> UcbSnapshot {
        UcbSnapshot {
            c: self.c,
            total_count: self.total_count,
            arms: self.table.arms().to_vec(),
        }
    }

    pub fn actions(&self) -> &ActionSpace {
        &self.actions
    }

    pub fn table(&self) -> &BanditTable {
        &self.table
    }

    /// Number of selections made so far.
    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    pub fn select_action(&mut self) -> f64 {
        self.total_count += 1;

        if let Some(untried) = self.table.arms().iter().find(|a| a.count == 0) {
            debug!(
                "Selecting {:.2} minutes because it has not been tried yet.",
                untried.dwell_minutes
            );
            return untried.dwell_minutes;
        }

        let ln_total = (self.total_count as f64).ln();
        let scores: Vec<f64> = self
            .table
            .arms()
            .iter()
            .map(|arm| arm.estimate + self.c * (ln_total / arm.count as f64).sqrt())
            .collect();
        let chosen = self.table.arms()[argmax_first(&scores)].dwell_minutes;
        debug!("UCB scores {:?}; selected {:.2} minutes", scores, chosen);
        chosen
    }

    pub fn update(&mut self, dwell_minutes: f64, reward: f64) -> Result<(), PolicyError> {
        if !reward.is_finite() {
            return Err(PolicyError::NonFiniteReward(reward));
        }
        let index = self
            .actions
            .index_of(dwell_minutes)
            .ok_or(PolicyError::UnknownAction(dwell_minutes))?;
        let arm = self
            .table
            .arm_mut(index)
            .ok_or(PolicyError::UnknownAction(dwell_minutes))?;
        arm.count += 1;
        arm.estimate += (reward - arm.estimate) / arm.count as f64;
        debug!(
            "Updated estimate for {:.2} minutes: {:.3} (count {})",
            arm.dwell_minutes, arm.estimate, arm.count
        );
        Ok(())
    }

    pub fn stats_display(&self) -> String {
        format!(
            "UCB Bandit (c={:.2}, selections={}) Statistics:\n{}",
            self.c,
            self.total_count,
            self.table.stats_display()
        )
    }
}

fn validate(c: f64) -> Result<(), ConfigError> {
    check_range("c", c, 0.0, true, f64::MAX, "> 0")
}
