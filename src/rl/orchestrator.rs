// src/rl/orchestrator.rs
use anyhow::{bail, Context, Result};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use super::policy::{DwellPolicy, Policy, Transition};
use super::policy_store::PolicyStore;
use super::reward::{compute_reward_breakdown, RewardBreakdown, RewardWeights, RiskProfile};
use super::state_extractor::extract_state_with_gap;
use crate::models::{ObservationWindow, StateVector};
use crate::utils::config::EngineConfig;

/// The dwell chosen for a window, together with the state it was chosen in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DwellDecision {
    pub state: StateVector,
    pub dwell_minutes: f64,
}

/// Everything learned from one completed cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CycleOutcome {
    pub decision: DwellDecision,
    pub reward: RewardBreakdown,
    pub next_state: StateVector,
    /// Version written to the policy store, if one is attached.
    pub saved_version: Option<u32>,
}

/// Ties the feature extractor, reward model and policy together and persists
/// the policy after every update. One decision in flight at a time.
pub struct DwellOrchestrator {
    policy: Policy,
    weights: RewardWeights,
    risk: RiskProfile,
    store: Option<PolicyStore>,
}

impl DwellOrchestrator {
    pub fn new(
        policy: Policy,
        weights: RewardWeights,
        risk: RiskProfile,
        store: Option<PolicyStore>,
    ) -> Self {
        Self {
            policy,
            weights,
            risk,
            store,
        }
    }

    /// Builds the configured policy, restoring learned values from the model path
    /// when a saved policy exists there.
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        config.validate().context("Invalid engine configuration")?;
        let params = config
            .policy_params()
            .context("Invalid dwell time configuration")?;

        let mut store = config.model_path.as_ref().map(PolicyStore::new);
        let loaded = match store.as_mut() {
            Some(store) => store.load()?,
            None => None,
        };

        let policy = match loaded {
            Some(stored) => {
                if stored.policy.kind() != params.kind {
                    bail!(
                        "Saved policy is {} but {} is configured; move the model file or change DWELL_POLICY",
                        stored.policy.kind(),
                        params.kind
                    );
                }
                let mut snapshot = stored.policy;
                for (name, saved, configured) in snapshot.apply_hyperparameters(&params) {
                    warn!(
                        "Saved policy used {}={}; continuing with configured {}={}",
                        name, saved, name, configured
                    );
                }
                let policy = Policy::from_snapshot(snapshot, params.seed)
                    .context("Saved policy has invalid parameters")?;
                if policy.action_space() != &params.actions {
                    bail!(
                        "Saved policy dwell times {:?} differ from configured {:?}",
                        policy.action_space().dwell_times(),
                        params.actions.dwell_times()
                    );
                }
                policy
            }
            None => Policy::build(&params).context("Failed to build policy")?,
        };

        info!(
            "DwellOrchestrator ready: {} policy over dwell times {:?}",
            policy.kind(),
            policy.action_space().dwell_times()
        );
        Ok(Self::new(policy, config.reward_weights, RiskProfile::default(), store))
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn weights(&self) -> &RewardWeights {
        &self.weights
    }

    pub fn risk(&self) -> &RiskProfile {
        &self.risk
    }

    pub fn extract_state(&self, window: &ObservationWindow) -> StateVector {
        extract_state_with_gap(window, self.weights.session_gap_seconds)
    }

    /// Summarises the window and asks the policy for a dwell time.
    pub fn decide(&mut self, window: &ObservationWindow) -> DwellDecision {
        let state = self.extract_state(window);
        let dwell_minutes = self.policy.choose_dwell(&state);
        info!(
            "Selected dwell time {:.2} minutes ({} policy, {} events observed)",
            dwell_minutes,
            self.policy.kind(),
            window.len()
        );
        DwellDecision {
            state,
            dwell_minutes,
        }
    }

    /// Scores what the decoy captured during the chosen dwell, updates the policy
    /// and persists it. `next_window` is the traffic the next decision will see.
    pub fn record_outcome(
        &mut self,
        decision: &DwellDecision,
        captured: &ObservationWindow,
        next_window: &ObservationWindow,
    ) -> Result<CycleOutcome> {
        let reward = compute_reward_breakdown(
            &captured.truncated(decision.dwell_minutes),
            decision.dwell_minutes,
            &self.weights,
            &self.risk,
        );
        let next_state = self.extract_state(next_window);

        self.policy
            .learn(&Transition {
                state: &decision.state,
                dwell_minutes: decision.dwell_minutes,
                reward: reward.total,
                next_state: &next_state,
            })
            .with_context(|| {
                format!(
                    "Failed to update {} policy for dwell {:.2}",
                    self.policy.kind(),
                    decision.dwell_minutes
                )
            })?;
        debug!(
            "Reward for {:.2} minutes: {:.3} (captured {} events)",
            decision.dwell_minutes,
            reward.total,
            captured.len()
        );

        let saved_version = self.save()?;
        Ok(CycleOutcome {
            decision: *decision,
            reward,
            next_state,
            saved_version,
        })
    }

    /// Writes the current policy to the attached store, if any.
    pub fn save(&mut self) -> Result<Option<u32>> {
        match self.store.as_mut() {
            Some(store) => {
                let version = store
                    .save(self.policy.snapshot())
                    .context("Failed to persist policy")?;
                Ok(Some(version))
            }
            None => {
                debug!("No policy store attached; skipping save");
                Ok(None)
            }
        }
    }

    pub fn stats_display(&self) -> String {
        self.policy.stats_display()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ConnectionEvent;
    use crate::rl::action_space::ActionSpace;
    use crate::rl::policy::{PolicyKind, PolicyParams};
    use tempfile::TempDir;

    fn greedy_q(store: Option<PolicyStore>) -> DwellOrchestrator {
        let policy = Policy::build(&PolicyParams {
            kind: PolicyKind::QLearning,
            actions: ActionSpace::new(vec![5.0, 10.0]).unwrap(),
            epsilon: 0.0,
            alpha: 0.5,
            gamma: 0.0,
            seed: Some(1),
            ..Default::default()
        })
        .unwrap();
        DwellOrchestrator::new(policy, RewardWeights::default(), RiskProfile::default(), store)
    }

    fn capture() -> ObservationWindow {
        ObservationWindow::new(vec![
            ConnectionEvent::new(10.0, "1.1.1.1", Some(3389)),
            ConnectionEvent::new(20.0, "2.2.2.2", Some(22)),
        ])
    }

    #[test]
    fn test_cycle_updates_and_persists() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("policy.json");
        let mut orchestrator = greedy_q(Some(PolicyStore::new(&path)));

        let decision = orchestrator.decide(&ObservationWindow::empty());
        assert_eq!(decision.dwell_minutes, 5.0);

        let outcome = orchestrator
            .record_outcome(&decision, &capture(), &ObservationWindow::empty())
            .unwrap();
        assert_eq!(outcome.saved_version, Some(1));
        assert!(path.exists());

        let Policy::QLearning(agent) = orchestrator.policy() else {
            panic!("expected a Q-learning policy");
        };
        let expected = 0.5 * outcome.reward.total;
        assert_eq!(agent.q_value(&decision.state, 5.0), Some(expected));
    }

    #[test]
    fn test_reward_ignores_traffic_after_dwell() {
        let mut orchestrator = greedy_q(None);
        let decision = DwellDecision {
            state: StateVector::default(),
            dwell_minutes: 5.0,
        };
        let mut late = capture().events().to_vec();
        late.push(ConnectionEvent::new(900.0, "3.3.3.3", Some(3389)));
        let with_late = orchestrator
            .record_outcome(&decision, &ObservationWindow::new(late), &ObservationWindow::empty())
            .unwrap();
        let without = orchestrator
            .record_outcome(&decision, &capture(), &ObservationWindow::empty())
            .unwrap();
        assert_eq!(with_late.reward, without.reward);
    }
}
