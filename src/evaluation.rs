// src/evaluation.rs
//
// Offline analysis: exhaustive dwell sweeps over recorded windows and
// summaries of what a trained policy has learned.

use log::debug;
use serde::Serialize;
use std::collections::HashMap;

use crate::models::ObservationWindow;
use crate::rl::policy::Policy;
use crate::rl::q_agent::QAgent;
use crate::rl::reward::{compute_reward_breakdown, RewardBreakdown, RewardWeights, RiskProfile};
use crate::rl::ActionSpace;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SweepPoint {
    pub dwell_minutes: f64,
    pub reward: RewardBreakdown,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepResult {
    pub points: Vec<SweepPoint>,
    /// First dwell with the highest total reward. `None` only for an empty sweep.
    pub best: Option<SweepPoint>,
}

/// Scores every dwell in `dwells` against the same recorded window.
pub fn sweep_dwell_times(
    window: &ObservationWindow,
    dwells: &ActionSpace,
    weights: &RewardWeights,
    risk: &RiskProfile,
) -> SweepResult {
    let points: Vec<SweepPoint> = dwells
        .dwell_times()
        .iter()
        .map(|&dwell_minutes| SweepPoint {
            dwell_minutes,
            reward: compute_reward_breakdown(
                &window.truncated(dwell_minutes),
                dwell_minutes,
                weights,
                risk,
            ),
        })
        .collect();

    let mut best: Option<SweepPoint> = None;
    for point in &points {
        if best.map_or(true, |b| point.reward.total > b.reward.total) {
            best = Some(*point);
        }
    }
    if let Some(b) = best {
        debug!(
            "Sweep over {} dwell times: best {:.2} min ({:.3})",
            points.len(),
            b.dwell_minutes,
            b.reward.total
        );
    }
    SweepResult { points, best }
}

/// Learned value of one dwell time, averaged over every state that has a row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DwellValue {
    pub dwell_minutes: f64,
    pub value: f64,
    /// States (Q-learning) or selections (bandits) behind the value.
    pub samples: u64,
}

/// Average Q-value per dwell over all visited states, highest first.
/// Empty when the agent has not visited any state.
pub fn average_values_by_dwell(agent: &QAgent) -> Vec<DwellValue> {
    let dwell_times = agent.actions().dwell_times();
    let mut sums: HashMap<usize, (f64, u64)> = HashMap::new();
    for (_, values) in agent.q_table().rows() {
        for (index, value) in values.iter().enumerate() {
            let entry = sums.entry(index).or_insert((0.0, 0));
            entry.0 += value;
            entry.1 += 1;
        }
    }

    let mut averages: Vec<DwellValue> = sums
        .into_iter()
        .filter_map(|(index, (sum, count))| {
            dwell_times.get(index).map(|&dwell_minutes| DwellValue {
                dwell_minutes,
                value: sum / count as f64,
                samples: count,
            })
        })
        .collect();
    sort_descending(&mut averages);
    averages
}

/// Per-dwell values for any policy: Q-averages for the agent, estimates for the bandits.
pub fn policy_values(policy: &Policy) -> Vec<DwellValue> {
    let mut values = match policy {
        Policy::QLearning(agent) => return average_values_by_dwell(agent),
        Policy::EpsilonGreedy(bandit) => bandit.table().arms().to_vec(),
        Policy::Ucb(bandit) => bandit.table().arms().to_vec(),
    }
    .into_iter()
    .map(|arm| DwellValue {
        dwell_minutes: arm.dwell_minutes,
        value: arm.estimate,
        samples: arm.count,
    })
    .collect::<Vec<_>>();
    sort_descending(&mut values);
    values
}

/// Human-readable lines for a value report. A policy with nothing learned gets
/// a single line saying so and no table header.
pub fn value_report_lines(values: &[DwellValue]) -> Vec<String> {
    if values.is_empty() {
        return vec!["  No states visited yet.".to_string()];
    }
    let mut lines = vec!["Average value by dwell time:".to_string()];
    lines.extend(values.iter().map(|value| {
        format!(
            "  Dwell Time: {:.2} min → Avg value: {:.3} ({} samples)",
            value.dwell_minutes, value.value, value.samples
        )
    }));
    lines
}

// Ties keep dwell order.
fn sort_descending(values: &mut [DwellValue]) {
    values.sort_by(|a, b| {
        b.value
            .total_cmp(&a.value)
            .then(a.dwell_minutes.total_cmp(&b.dwell_minutes))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConnectionEvent, StateVector};
    use crate::rl::policy::{DwellPolicy, PolicyKind, PolicyParams, Transition};

    #[test]
    fn test_sweep_picks_first_maximum() {
        // Nothing captured: every reward is pure penalty, so the shortest dwell
        // past the sustain threshold wins.
        let dwells = ActionSpace::linspace(5.0, 15.0, 21).unwrap();
        let result = sweep_dwell_times(
            &ObservationWindow::empty(),
            &dwells,
            &RewardWeights::default(),
            &RiskProfile::default(),
        );
        assert_eq!(result.points.len(), 21);
        assert_eq!(result.best.map(|b| b.dwell_minutes), Some(5.0));
    }

    #[test]
    fn test_sweep_rewards_longer_dwell_for_late_traffic() {
        let events = (0..6)
            .map(|i| ConnectionEvent::new(540.0 + i as f64 * 5.0, &format!("198.51.100.{}", i), Some(3389)))
            .collect();
        let window = ObservationWindow::new(events);
        let dwells = ActionSpace::new(vec![5.0, 10.0]).unwrap();
        let result = sweep_dwell_times(&window, &dwells, &RewardWeights::default(), &RiskProfile::default());
        assert_eq!(result.best.map(|b| b.dwell_minutes), Some(10.0));
    }

    #[test]
    fn test_average_values_sorted_descending() {
        let actions = ActionSpace::new(vec![5.0, 10.0]).unwrap();
        let mut agent = QAgent::with_seed(actions, 1.0, 0.0, 0.0, Some(3)).unwrap();
        let a = StateVector::default();
        let b = StateVector {
            total_connections: 4.0,
            ..Default::default()
        };
        agent.update(&a, 10.0, 4.0, &a).unwrap();
        agent.update(&b, 10.0, 2.0, &a).unwrap();
        agent.update(&b, 5.0, 1.0, &a).unwrap();

        let averages = average_values_by_dwell(&agent);
        assert_eq!(averages.len(), 2);
        assert_eq!(averages[0].dwell_minutes, 10.0);
        assert_eq!(averages[0].value, 3.0);
        assert_eq!(averages[1].dwell_minutes, 5.0);
        assert_eq!(averages[1].value, 0.5);
        assert_eq!(averages[1].samples, 2);
    }

    #[test]
    fn test_untrained_agent_reports_nothing() {
        let agent = QAgent::new(ActionSpace::default(), 0.1, 0.9, 0.1).unwrap();
        assert!(average_values_by_dwell(&agent).is_empty());
    }

    #[test]
    fn test_empty_report_has_no_header() {
        let agent = QAgent::new(ActionSpace::default(), 0.1, 0.9, 0.1).unwrap();
        let lines = value_report_lines(&average_values_by_dwell(&agent));
        assert_eq!(lines, vec!["  No states visited yet.".to_string()]);
    }

    #[test]
    fn test_report_lists_every_dwell() {
        let values = [DwellValue {
            dwell_minutes: 8.0,
            value: 1.25,
            samples: 3,
        }];
        let lines = value_report_lines(&values);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "Average value by dwell time:");
        assert!(lines[1].contains("8.00 min"));
    }

    #[test]
    fn test_bandit_values_include_counts() {
        let mut policy = Policy::build(&PolicyParams {
            kind: PolicyKind::Ucb,
            actions: ActionSpace::new(vec![5.0, 8.0]).unwrap(),
            ..Default::default()
        })
        .unwrap();
        let state = StateVector::default();
        for reward in [1.0, 3.0] {
            let dwell = policy.choose_dwell(&state);
            policy
                .learn(&Transition {
                    state: &state,
                    dwell_minutes: dwell,
                    reward,
                    next_state: &state,
                })
                .unwrap();
        }
        let values = policy_values(&policy);
        assert_eq!(values[0].dwell_minutes, 8.0);
        assert_eq!(values[0].value, 3.0);
        assert_eq!(values[0].samples, 1);
    }
}
