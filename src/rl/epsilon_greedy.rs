// src/rl/epsilon_greedy.rs
use log::debug;
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::action_space::{argmax_first, ActionSpace};
use super::errors::{check_range, ConfigError, PolicyError};
use super::policy::policy_rng;
use super::value_table::{ArmEstimate, BanditTable};

pub const DEFAULT_EPSILON: f64 = 0.1;
pub const DEFAULT_ALPHA: f64 = 0.1;

/// State-less bandit that explores with probability `epsilon` and otherwise
/// picks the arm with the best estimate.
///
/// Estimates are an exponential moving average with step `alpha`, so recent
/// rewards weigh more than old ones when the attack landscape drifts.
#[derive(Debug, Clone)]
pub struct EpsilonGreedyBandit {
    actions: ActionSpace,
    table: BanditTable,
    epsilon: f64,
    alpha: f64,
    rng: StdRng,
}

/// Persisted form of an [`EpsilonGreedyBandit`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpsilonGreedySnapshot {
    pub epsilon: f64,
    pub alpha: f64,
    pub arms: Vec<ArmEstimate>,
}

impl EpsilonGreedyBandit {
    pub fn new(actions: ActionSpace, epsilon: f64, alpha: f64) -> Result<Self, ConfigError> {
        Self::with_seed(actions, epsilon, alpha, None)
    }

    /// Seeded construction so exploration is reproducible. `None` seeds from entropy.
    pub fn with_seed(
        actions: ActionSpace,
        epsilon: f64,
        alpha: f64,
        seed: Option<u64>,
    ) -> Result<Self, ConfigError> {
        validate(epsilon, alpha)?;
        Ok(Self {
            table: BanditTable::new(&actions),
            actions,
            epsilon,
            alpha,
            rng: policy_rng(seed),
        })
    }

    pub fn from_snapshot(snapshot: EpsilonGreedySnapshot, seed: Option<u64>) -> Result<Self, ConfigError> {
        let EpsilonGreedySnapshot { epsilon, alpha, arms } = snapshot;
        validate(epsilon, alpha)?;
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
            epsilon,
            alpha,
            rng: policy_rng(seed),
        })
    }

    pub fn snapshot(&self) -> EpsilonGreedySnapshot {
        EpsilonGreedySnapshot {
            epsilon: self.epsilon,
            alpha: self.alpha,
            arms: self.table.arms().to_vec(),
        }
    }

    pub fn actions(&self) -> &ActionSpace {
        &self.actions
    }

    pub fn table(&self) -> &BanditTable {
        &self.table
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn select_action(&mut self) -> f64 {
        if self.rng.gen_bool(self.epsilon) {
            let index = self.rng.gen_range(0..self.actions.len());
            let dwell = self.table.arms()[index].dwell_minutes;
            debug!("Exploring: selected random dwell time {:.2} minutes", dwell);
            dwell
        } else {
            let index = argmax_first(&self.table.estimates());
            let dwell = self.table.arms()[index].dwell_minutes;
            debug!("Exploiting: selected best dwell time {:.2} minutes", dwell);
            dwell
        }
    }

    pub fn update(&mut self, dwell_minutes: f64, reward: f64) -> Result<(), PolicyError> {
        if !reward.is_finite() {
            return Err(PolicyError::NonFiniteReward(reward));
        }
        let index = self
            .actions
            .index_of(dwell_minutes)
            .ok_or(PolicyError::UnknownAction(dwell_minutes))?;
        let alpha = self.alpha;
        let arm = self
            .table
            .arm_mut(index)
            .ok_or(PolicyError::UnknownAction(dwell_minutes))?;
        arm.count += 1;
        arm.estimate += alpha * (reward - arm.estimate);
        debug!(
            "Updated estimate for {:.2} minutes: {:.3} (count {})",
            arm.dwell_minutes, arm.estimate, arm.count
        );
        Ok(())
    }

    pub fn stats_display(&self) -> String {
        format!(
            "Epsilon-Greedy Bandit (epsilon={:.2}, alpha={:.2}) Statistics:\n{}",
            self.epsilon,
            self.alpha,
            self.table.stats_display()
        )
    }
}

fn validate(epsilon: f64, alpha: f64) -> Result<(), ConfigError> {
    check_range("epsilon", epsilon, 0.0, false, 1.0, "[0, 1]")?;
    check_range("alpha", alpha, 0.0, true, 1.0, "(0, 1]")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bandit(epsilon: f64, alpha: f64) -> EpsilonGreedyBandit {
        let actions = ActionSpace::new(vec![5.0, 8.0, 10.0]).unwrap();
        EpsilonGreedyBandit::with_seed(actions, epsilon, alpha, Some(7)).unwrap()
    }

    #[test]
    fn test_zero_epsilon_always_exploits() {
        let mut b = bandit(0.0, 1.0);
        b.update(5.0, 1.0).unwrap();
        b.update(8.0, 5.0).unwrap();
        b.update(10.0, 2.0).unwrap();
        for _ in 0..50 {
            assert_eq!(b.select_action(), 8.0);
        }
    }

    #[test]
    fn test_ties_go_to_first_action() {
        let mut b = bandit(0.0, 0.1);
        assert_eq!(b.select_action(), 5.0);
    }

    #[test]
    fn test_update_is_exponential_moving_average() {
        let mut b = bandit(0.0, 0.5);
        b.update(8.0, 4.0).unwrap();
        b.update(8.0, 0.0).unwrap();
        let arm = b.table().arm(1).unwrap();
        assert_eq!(arm.count, 2);
        // 0 -> 2.0 -> 1.0
        assert!((arm.estimate - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_full_exploration_covers_every_arm() {
        let mut b = bandit(1.0, 0.1);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            let dwell = b.select_action();
            assert!(b.actions().contains(dwell));
            seen.insert(dwell.to_bits());
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn test_rejects_bad_hyperparameters() {
        let actions = ActionSpace::default();
        assert!(EpsilonGreedyBandit::new(actions.clone(), 1.5, 0.1).is_err());
        assert!(EpsilonGreedyBandit::new(actions.clone(), 0.1, 0.0).is_err());
        assert!(EpsilonGreedyBandit::new(actions, f64::NAN, 0.1).is_err());
    }

    #[test]
    fn test_unknown_action_and_nan_reward_leave_table_untouched() {
        let mut b = bandit(0.0, 0.1);
        assert_eq!(b.update(7.0, 1.0), Err(PolicyError::UnknownAction(7.0)));
        assert!(matches!(b.update(5.0, f64::NAN), Err(PolicyError::NonFiniteReward(_))));
        assert!(b.table().arms().iter().all(|a| a.count == 0));
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut b = bandit(0.2, 0.3);
        b.update(10.0, 0.123456789).unwrap();
        let restored = EpsilonGreedyBandit::from_snapshot(b.snapshot(), Some(1)).unwrap();
        assert_eq!(restored.snapshot(), b.snapshot());
    }
}
