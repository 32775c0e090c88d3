// src/rl/policy_store.rs
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::policy::PolicySnapshot;

/// On-disk envelope around a policy's value table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredPolicy {
    /// Incremented on every save.
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    pub policy: PolicySnapshot,
}

/// JSON file holding one policy. Writes go to a sibling temp file that is then
/// renamed over the target, so readers never see a half-written table.
#[derive(Debug, Clone)]
pub struct PolicyStore {
    path: PathBuf,
    version: u32,
}

impl PolicyStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            version: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Version of the last policy loaded or saved through this store.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// `Ok(None)` when nothing has been saved yet. A file that exists but cannot
    /// be read or parsed is an error: learned values are never silently dropped.
    pub fn load(&mut self) -> Result<Option<StoredPolicy>> {
        if !self.path.exists() {
            info!(
                "No saved policy at {}; starting with an empty value table.",
                self.path.display()
            );
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read saved policy {}", self.path.display()))?;
        let stored: StoredPolicy = serde_json::from_str(&content)
            .with_context(|| format!("Saved policy {} is corrupt", self.path.display()))?;
        self.version = stored.version;
        info!(
            "Loaded {} policy (v{}) saved at {} from {}",
            stored.policy.kind(),
            stored.version,
            stored.saved_at,
            self.path.display()
        );
        Ok(Some(stored))
    }

    pub fn save(&mut self, snapshot: PolicySnapshot) -> Result<u32> {
        let stored = StoredPolicy {
            version: self.version + 1,
            saved_at: Utc::now(),
            policy: snapshot,
        };
        let content =
            serde_json::to_string_pretty(&stored).context("Failed to serialize policy")?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &self.path).with_context(|| {
            format!(
                "Failed to move {} over {}",
                tmp_path.display(),
                self.path.display()
            )
        })?;

        self.version = stored.version;
        debug!(
            "Saved {} policy v{} to {}",
            stored.policy.kind(),
            stored.version,
            self.path.display()
        );
        Ok(stored.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StateVector;
    use crate::rl::action_space::ActionSpace;
    use crate::rl::policy::{DwellPolicy, Policy, PolicyKind, PolicyParams, Transition};
    use tempfile::TempDir;

    fn trained(kind: PolicyKind) -> Policy {
        let mut policy = Policy::build(&PolicyParams {
            kind,
            actions: ActionSpace::new(vec![5.0, 7.5, 10.0]).unwrap(),
            epsilon: 0.5,
            seed: Some(42),
            ..Default::default()
        })
        .unwrap();
        let mut state = StateVector::default();
        for i in 0..25 {
            let next = StateVector {
                total_connections: (i % 4) as f64,
                avg_time_gap: 1.0 / (i as f64 + 3.0),
                ..Default::default()
            };
            let dwell = policy.choose_dwell(&state);
            let reward = (i as f64 * 0.7315).sin() * 3.0 + 1.0 / 3.0;
            policy
                .learn(&Transition {
                    state: &state,
                    dwell_minutes: dwell,
                    reward,
                    next_state: &next,
                })
                .unwrap();
            state = next;
        }
        policy
    }

    #[test]
    fn test_missing_file_starts_empty() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = PolicyStore::new(temp_dir.path().join("policy.json"));
        assert!(store.load().unwrap().is_none());
        assert_eq!(store.version(), 0);
    }

    #[test]
    fn test_round_trip_is_exact_for_every_policy() {
        let temp_dir = TempDir::new().unwrap();
        for kind in [PolicyKind::EpsilonGreedy, PolicyKind::Ucb, PolicyKind::QLearning] {
            let path = temp_dir.path().join(format!("{}.json", kind));
            let snapshot = trained(kind).snapshot();

            let mut store = PolicyStore::new(&path);
            assert_eq!(store.save(snapshot.clone()).unwrap(), 1);

            let mut reopened = PolicyStore::new(&path);
            let loaded = reopened.load().unwrap().unwrap();
            assert_eq!(loaded.version, 1);
            // PartialEq on f64 fields: bit-for-bit for every finite value
            assert_eq!(loaded.policy, snapshot);
            assert!(!path.with_extension("tmp").exists());
        }
    }

    #[test]
    fn test_version_increments_across_saves() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("policy.json");
        let mut store = PolicyStore::new(&path);
        let snapshot = trained(PolicyKind::Ucb).snapshot();
        store.save(snapshot.clone()).unwrap();
        store.save(snapshot).unwrap();

        let mut reopened = PolicyStore::new(&path);
        assert_eq!(reopened.load().unwrap().unwrap().version, 2);
        assert_eq!(reopened.version(), 2);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("policy.json");
        fs::write(&path, "{ not json").unwrap();
        let mut store = PolicyStore::new(&path);
        let err = store.load().unwrap_err();
        assert!(err.to_string().contains("corrupt"));
    }
}
