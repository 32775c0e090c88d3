// src/controller/session_log.rs
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::models::StateVector;
use crate::rl::orchestrator::CycleOutcome;
use crate::rl::policy::PolicyKind;
use crate::rl::reward::RewardBreakdown;

pub const SESSION_LOG_FILE: &str = "controller_log.jsonl";

/// One completed decoy session as written to the controller log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub destination: String,
    pub policy: PolicyKind,
    pub dwell_minutes: f64,
    pub reward: RewardBreakdown,
    pub state: StateVector,
    pub next_state: StateVector,
}

impl SessionRecord {
    pub fn new(destination: &str, policy: PolicyKind, outcome: &CycleOutcome) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            destination: destination.to_string(),
            policy,
            dwell_minutes: outcome.decision.dwell_minutes,
            reward: outcome.reward,
            state: outcome.decision.state,
            next_state: outcome.next_state,
        }
    }
}

/// Append-only JSON-lines log of session records.
#[derive(Debug, Clone)]
pub struct SessionLog {
    path: PathBuf,
}

impl SessionLog {
    /// Opens `controller_log.jsonl` inside `dir`, creating the directory if needed.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create session log directory {}", dir.display()))?;
        Ok(Self {
            path: dir.join(SESSION_LOG_FILE),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn append(&self, record: &SessionRecord) -> Result<()> {
        let mut line = serde_json::to_string(record).context("Failed to serialize session record")?;
        line.push('\n');
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("Failed to open session log {}", self.path.display()))?;
        file.write_all(line.as_bytes())
            .await
            .with_context(|| format!("Failed to append to session log {}", self.path.display()))?;
        file.flush().await?;
        debug!("Logged session {} for {}", record.session_id, record.destination);
        Ok(())
    }

    pub async fn read_all(&self) -> Result<Vec<SessionRecord>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read session log {}", self.path.display()))
            }
        };
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .enumerate()
            .map(|(i, line)| {
                serde_json::from_str(line).with_context(|| {
                    format!("Invalid session record {} in {}", i + 1, self.path.display())
                })
            })
            .collect()
    }
}
