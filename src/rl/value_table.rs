// src/rl/value_table.rs
//
// Value storage owned by the policies. Tables only ever gain entries; they
// are mutated through the owning policy's update and nowhere else.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::action_space::ActionSpace;
use crate::models::StateKey;

/// Initial value of every action, for bandit arms and fresh Q-table rows alike.
pub const INITIAL_VALUE: f64 = 0.0;

/// Selection count and running estimate for one dwell time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArmEstimate {
    pub dwell_minutes: f64,
    pub count: u64,
    pub estimate: f64,
}

/// Per-action estimates for the state-less bandits, in action-space order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BanditTable {
    arms: Vec<ArmEstimate>,
}

impl BanditTable {
    pub fn new(actions: &ActionSpace) -> Self {
        Self {
            arms: actions
                .dwell_times()
                .iter()
                .map(|&dwell_minutes| ArmEstimate {
                    dwell_minutes,
                    count: 0,
                    estimate: INITIAL_VALUE,
                })
                .collect(),
        }
    }

    pub fn arms(&self) -> &[ArmEstimate] {
        &self.arms
    }

    pub fn estimates(&self) -> Vec<f64> {
        self.arms.iter().map(|a| a.estimate).collect()
    }

    pub fn arm(&self, index: usize) -> Option<&ArmEstimate> {
        self.arms.get(index)
    }

    pub(crate) fn arm_mut(&mut self, index: usize) -> Option<&mut ArmEstimate> {
        self.arms.get_mut(index)
    }

    /// Action space implied by the stored arms; `None` if the arms are not a valid space.
    pub fn action_space(&self) -> Option<ActionSpace> {
        ActionSpace::new(self.arms.iter().map(|a| a.dwell_minutes).collect()).ok()
    }

    pub fn stats_display(&self) -> String {
        let mut output = String::from("  Dwell (min) | Count | Estimate\n");
        output.push_str("  ------------|-------|---------\n");
        for arm in &self.arms {
            output.push_str(&format!(
                "  {:>11.2} | {:>5} | {:.3}\n",
                arm.dwell_minutes, arm.count, arm.estimate
            ));
        }
        output
    }
}

/// State-conditioned action values for the tabular agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "QTableRepr", try_from = "QTableRepr")]
pub struct QTable {
    action_count: usize,
    rows: HashMap<StateKey, Vec<f64>>,
}

impl QTable {
    pub fn new(action_count: usize) -> Self {
        Self {
            action_count,
            rows: HashMap::new(),
        }
    }

    pub fn action_count(&self) -> usize {
        self.action_count
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Read-only lookup. Never creates a row.
    pub fn get(&self, key: &StateKey) -> Option<&[f64]> {
        self.rows.get(key).map(Vec::as_slice)
    }

    /// Row for `key`, inserting one with every action at [`INITIAL_VALUE`] if absent.
    pub fn get_or_create(&mut self, key: StateKey) -> &mut Vec<f64> {
        let action_count = self.action_count;
        self.rows
            .entry(key)
            .or_insert_with(|| vec![INITIAL_VALUE; action_count])
    }

    pub fn rows(&self) -> impl Iterator<Item = (&StateKey, &[f64])> {
        self.rows.iter().map(|(k, v)| (k, v.as_slice()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct QTableEntry {
    state: StateKey,
    values: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct QTableRepr {
    action_count: usize,
    entries: Vec<QTableEntry>,
}

impl From<QTable> for QTableRepr {
    fn from(table: QTable) -> Self {
        let mut entries: Vec<QTableEntry> = table
            .rows
            .into_iter()
            .map(|(state, values)| QTableEntry { state, values })
            .collect();
        // stable file contents between saves
        entries.sort_by(|a, b| a.state.cmp(&b.state));
        Self {
            action_count: table.action_count,
            entries,
        }
    }
}

impl TryFrom<QTableRepr> for QTable {
    type Error = String;

    fn try_from(repr: QTableRepr) -> Result<Self, Self::Error> {
        let mut rows = HashMap::with_capacity(repr.entries.len());
        for entry in repr.entries {
            if entry.values.len() != repr.action_count {
                return Err(format!(
                    "Q-table row {} has {} values, expected {}",
                    entry.state,
                    entry.values.len(),
                    repr.action_count
                ));
            }
            if rows.insert(entry.state, entry.values).is_some() {
                return Err(format!("Q-table row {} appears twice", entry.state));
            }
        }
        Ok(Self {
            action_count: repr.action_count,
            rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StateVector;

    #[test]
    fn test_get_does_not_create_rows() {
        let mut table = QTable::new(3);
        let key = StateVector::default().discretize();
        assert!(table.get(&key).is_none());
        assert!(table.is_empty());

        assert_eq!(table.get_or_create(key), &vec![0.0, 0.0, 0.0]);
        assert_eq!(table.len(), 1);
        assert!(table.get(&key).is_some());
    }

    #[test]
    fn test_q_table_json_rejects_ragged_rows() {
        let key = StateVector::default().discretize();
        let json = serde_json::json!({
            "action_count": 2,
            "entries": [{ "state": key, "values": [1.0] }]
        });
        let parsed: Result<QTable, _> = serde_json::from_value(json);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_bandit_table_starts_at_zero() {
        let table = BanditTable::new(&ActionSpace::default());
        assert_eq!(table.arms().len(), 4);
        assert!(table.arms().iter().all(|a| a.count == 0 && a.estimate == 0.0));
        assert_eq!(table.action_space(), Some(ActionSpace::default()));
    }
}
