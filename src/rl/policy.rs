// src/rl/policy.rs
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::action_space::ActionSpace;
use super::epsilon_greedy::{EpsilonGreedyBandit, EpsilonGreedySnapshot};
use super::errors::{ConfigError, PolicyError};
use super::q_agent::{QAgent, QAgentSnapshot};
use super::ucb::{UcbBandit, UcbSnapshot};
use crate::models::StateVector;

pub(crate) fn policy_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    EpsilonGreedy,
    Ucb,
    QLearning,
}

impl PolicyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyKind::EpsilonGreedy => "epsilon_greedy",
            PolicyKind::Ucb => "ucb",
            PolicyKind::QLearning => "q_learning",
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolicyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "epsilon_greedy" | "epsilon-greedy" | "egreedy" => Ok(PolicyKind::EpsilonGreedy),
            "ucb" => Ok(PolicyKind::Ucb),
            "q_learning" | "q-learning" | "qlearning" | "q" => Ok(PolicyKind::QLearning),
            other => Err(format!("Unknown policy '{}'", other)),
        }
    }
}

/// Hyperparameters for building any of the policies. Fields a policy does not use are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyParams {
    pub kind: PolicyKind,
    pub actions: ActionSpace,
    pub epsilon: f64,
    pub alpha: f64,
    pub gamma: f64,
    pub c: f64,
    pub seed: Option<u64>,
}

impl Default for PolicyParams {
    fn default() -> Self {
        Self {
            kind: PolicyKind::QLearning,
            actions: ActionSpace::default(),
            epsilon: super::q_agent::DEFAULT_Q_EPSILON,
            alpha: super::q_agent::DEFAULT_Q_ALPHA,
            gamma: super::q_agent::DEFAULT_Q_GAMMA,
            c: super::ucb::DEFAULT_EXPLORATION_WIDTH,
            seed: None,
        }
    }
}

/// One completed decision cycle as seen by a policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition<'a> {
    pub state: &'a StateVector,
    pub dwell_minutes: f64,
    pub reward: f64,
    pub next_state: &'a StateVector,
}

/// Common face of the dwell-time policies. Bandits ignore the state.
pub trait DwellPolicy {
    fn kind(&self) -> PolicyKind;

    fn action_space(&self) -> &ActionSpace;

    /// Always returns a member of [`DwellPolicy::action_space`].
    fn choose_dwell(&mut self, state: &StateVector) -> f64;

    fn learn(&mut self, transition: &Transition<'_>) -> Result<(), PolicyError>;

    fn stats_display(&self) -> String;
}

impl DwellPolicy for EpsilonGreedyBandit {
    fn kind(&self) -> PolicyKind {
        PolicyKind::EpsilonGreedy
    }

    fn action_space(&self) -> &ActionSpace {
        self.actions()
    }

    fn choose_dwell(&mut self, _state: &StateVector) -> f64 {
        self.select_action()
    }

    fn learn(&mut self, transition: &Transition<'_>) -> Result<(), PolicyError> {
        self.update(transition.dwell_minutes, transition.reward)
    }

    fn stats_display(&self) -> String {
        EpsilonGreedyBandit::stats_display(self)
    }
}

impl DwellPolicy for UcbBandit {
    fn kind(&self) -> PolicyKind {
        PolicyKind::Ucb
    }

    fn action_space(&self) -> &ActionSpace {
        self.actions()
    }

    fn choose_dwell(&mut self, _state: &StateVector) -> f64 {
        self.select_action()
    }

    fn learn(&mut self, transition: &Transition<'_>) -> Result<(), PolicyError> {
        self.update(transition.dwell_minutes, transition.reward)
    }

    fn stats_display(&self) -> String {
        UcbBandit::stats_display(self)
    }
}

impl DwellPolicy for QAgent {
    fn kind(&self) -> PolicyKind {
        PolicyKind::QLearning
    }

    fn action_space(&self) -> &ActionSpace {
        self.actions()
    }

    fn choose_dwell(&mut self, state: &StateVector) -> f64 {
        self.select_action(state)
    }

    fn learn(&mut self, transition: &Transition<'_>) -> Result<(), PolicyError> {
        self.update(
            transition.state,
            transition.dwell_minutes,
            transition.reward,
            transition.next_state,
        )
    }

    fn stats_display(&self) -> String {
        QAgent::stats_display(self)
    }
}

/// Any of the three policies, chosen at runtime.
#[derive(Debug, Clone)]
pub enum Policy {
    EpsilonGreedy(EpsilonGreedyBandit),
    Ucb(UcbBandit),
    QLearning(QAgent),
}

/// Serializable state of a [`Policy`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum PolicySnapshot {
    EpsilonGreedy(EpsilonGreedySnapshot),
    Ucb(UcbSnapshot),
    QLearning(QAgentSnapshot),
}

impl PolicySnapshot {
    pub fn kind(&self) -> PolicyKind {
        match self {
            PolicySnapshot::EpsilonGreedy(_) => PolicyKind::EpsilonGreedy,
            PolicySnapshot::Ucb(_) => PolicyKind::Ucb,
            PolicySnapshot::QLearning(_) => PolicyKind::QLearning,
        }
    }

    /// Replaces the saved hyperparameters with the ones in `params`, keeping every
    /// learned value. Returns `(name, saved, configured)` for each one that changed.
    pub fn apply_hyperparameters(&mut self, params: &PolicyParams) -> Vec<(&'static str, f64, f64)> {
        let mut changed = Vec::new();
        let mut set = |name: &'static str, slot: &mut f64, configured: f64| {
            if slot.to_bits() != configured.to_bits() {
                changed.push((name, *slot, configured));
                *slot = configured;
            }
        };
        match self {
            PolicySnapshot::EpsilonGreedy(s) => {
                set("epsilon", &mut s.epsilon, params.epsilon);
                set("alpha", &mut s.alpha, params.alpha);
            }
            PolicySnapshot::Ucb(s) => set("c", &mut s.c, params.c),
            PolicySnapshot::QLearning(s) => {
                set("alpha", &mut s.alpha, params.alpha);
                set("gamma", &mut s.gamma, params.gamma);
                set("epsilon", &mut s.epsilon, params.epsilon);
            }
        }
        changed
    }
}

impl Policy {
    pub fn build(params: &PolicyParams) -> Result<Self, ConfigError> {
        let actions = params.actions.clone();
        Ok(match params.kind {
            PolicyKind::EpsilonGreedy => Policy::EpsilonGreedy(EpsilonGreedyBandit::with_seed(
                actions,
                params.epsilon,
                params.alpha,
                params.seed,
            )?),
            PolicyKind::Ucb => Policy::Ucb(UcbBandit::new(actions, params.c)?),
            PolicyKind::QLearning => Policy::QLearning(QAgent::with_seed(
                actions,
                params.alpha,
                params.gamma,
                params.epsilon,
                params.seed,
            )?),
        })
    }

    pub fn from_snapshot(snapshot: PolicySnapshot, seed: Option<u64>) -> Result<Self, ConfigError> {
        Ok(match snapshot {
            PolicySnapshot::EpsilonGreedy(s) => {
                Policy::EpsilonGreedy(EpsilonGreedyBandit::from_snapshot(s, seed)?)
            }
            PolicySnapshot::Ucb(s) => Policy::Ucb(UcbBandit::from_snapshot(s)?),
            PolicySnapshot::QLearning(s) => Policy::QLearning(QAgent::from_snapshot(s, seed)?),
        })
    }

    pub fn snapshot(&self) -> PolicySnapshot {
        match self {
            Policy::EpsilonGreedy(p) => PolicySnapshot::EpsilonGreedy(p.snapshot()),
            Policy::Ucb(p) => PolicySnapshot::Ucb(p.snapshot()),
            Policy::QLearning(p) => PolicySnapshot::QLearning(p.snapshot()),
        }
    }

    fn inner(&self) -> &dyn DwellPolicy {
        match self {
            Policy::EpsilonGreedy(p) => p as &dyn DwellPolicy,
            Policy::Ucb(p) => p as &dyn DwellPolicy,
            Policy::QLearning(p) => p as &dyn DwellPolicy,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn DwellPolicy {
        match self {
            Policy::EpsilonGreedy(p) => p as &mut dyn DwellPolicy,
            Policy::Ucb(p) => p as &mut dyn DwellPolicy,
            Policy::QLearning(p) => p as &mut dyn DwellPolicy,
        }
    }
}

impl DwellPolicy for Policy {
    fn kind(&self) -> PolicyKind {
        self.inner().kind()
    }

    fn action_space(&self) -> &ActionSpace {
        self.inner().action_space()
    }

    fn choose_dwell(&mut self, state: &StateVector) -> f64 {
        self.inner_mut().choose_dwell(state)
    }

    fn learn(&mut self, transition: &Transition<'_>) -> Result<(), PolicyError> {
        self.inner_mut().learn(transition)
    }

    fn stats_display(&self) -> String {
        self.inner().stats_display()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn params(kind: PolicyKind) -> PolicyParams {
        PolicyParams {
            kind,
            seed: Some(11),
            ..Default::default()
        }
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!("UCB".parse::<PolicyKind>(), Ok(PolicyKind::Ucb));
        assert_eq!("epsilon-greedy".parse::<PolicyKind>(), Ok(PolicyKind::EpsilonGreedy));
        assert_eq!("q_learning".parse::<PolicyKind>(), Ok(PolicyKind::QLearning));
        assert!("sarsa".parse::<PolicyKind>().is_err());
    }

    #[test]
    fn test_build_each_kind() {
        for kind in [PolicyKind::EpsilonGreedy, PolicyKind::Ucb, PolicyKind::QLearning] {
            let policy = Policy::build(&params(kind)).unwrap();
            assert_eq!(policy.kind(), kind);
            assert_eq!(policy.snapshot().kind(), kind);
        }
    }

    #[test]
    fn test_apply_hyperparameters_keeps_learned_values() {
        let mut policy = Policy::build(&PolicyParams {
            epsilon: 0.5,
            ..params(PolicyKind::EpsilonGreedy)
        })
        .unwrap();
        let state = StateVector::default();
        policy
            .learn(&Transition { state: &state, dwell_minutes: 8.0, reward: 2.0, next_state: &state })
            .unwrap();
        let mut snapshot = policy.snapshot();
        let before = snapshot.clone();

        let changed = snapshot.apply_hyperparameters(&PolicyParams {
            epsilon: 0.0,
            ..params(PolicyKind::EpsilonGreedy)
        });
        assert_eq!(changed, vec![("epsilon", 0.5, 0.0)]);

        let (PolicySnapshot::EpsilonGreedy(after), PolicySnapshot::EpsilonGreedy(before)) = (snapshot, before) else {
            panic!("expected epsilon-greedy snapshots");
        };
        assert_eq!(after.epsilon, 0.0);
        assert_eq!(after.arms, before.arms);
    }

    #[test]
    fn test_snapshot_json_is_tagged() {
        let policy = Policy::build(&params(PolicyKind::Ucb)).unwrap();
        let json = serde_json::to_value(policy.snapshot()).unwrap();
        assert_eq!(json["policy"], "ucb");
    }

    proptest! {
        #[test]
        fn prop_choice_is_always_a_configured_action(
            dwells in proptest::collection::btree_set(1u32..120, 1..8),
            rewards in proptest::collection::vec(-50.0f64..50.0, 0..40),
            total in 0.0f64..1000.0,
            kind_index in 0usize..3,
        ) {
            let kind = [PolicyKind::EpsilonGreedy, PolicyKind::Ucb, PolicyKind::QLearning][kind_index];
            let actions = ActionSpace::new(dwells.iter().map(|d| *d as f64).collect()).unwrap();
            let mut policy = Policy::build(&PolicyParams {
                kind,
                actions: actions.clone(),
                epsilon: 0.3,
                seed: Some(5),
                ..Default::default()
            })
            .unwrap();
            let state = StateVector { total_connections: total, ..Default::default() };
            for reward in rewards {
                let dwell = policy.choose_dwell(&state);
                prop_assert!(actions.contains(dwell));
                policy
                    .learn(&Transition { state: &state, dwell_minutes: dwell, reward, next_state: &state })
                    .unwrap();
            }
            prop_assert!(actions.contains(policy.choose_dwell(&state)));
        }
    }
}
