// src/controller/control_loop.rs
use anyhow::{Context, Result};
use log::{info, warn};
use std::collections::BTreeMap;

use super::environment::{EnvironmentController, ReplayEnvironment};
use super::session_log::{SessionLog, SessionRecord};
use crate::models::{ConnectionEvent, ObservationWindow};
use crate::rl::orchestrator::{CycleOutcome, DwellOrchestrator};
use crate::rl::policy::DwellPolicy;
use crate::utils::progress::progress_bar;

/// Observe, decide, run the decoy for the chosen dwell, learn, persist and log.
pub async fn run_cycle<E: EnvironmentController>(
    orchestrator: &mut DwellOrchestrator,
    environment: &mut E,
    destination: &str,
    session_log: Option<&SessionLog>,
) -> Result<CycleOutcome> {
    let window = environment
        .observe()
        .await
        .with_context(|| format!("Failed to observe traffic for {}", destination))?;
    let decision = orchestrator.decide(&window);

    let dwell = environment
        .run_dwell(decision.dwell_minutes)
        .await
        .with_context(|| {
            format!(
                "Decoy for {} failed during {:.2} minute dwell",
                destination, decision.dwell_minutes
            )
        })?;

    let outcome = orchestrator.record_outcome(&decision, &dwell.captured, &dwell.next_window)?;

    if let Some(log) = session_log {
        let record = SessionRecord::new(destination, orchestrator.policy().kind(), &outcome);
        log.append(&record).await?;
    }
    Ok(outcome)
}

/// Results of replaying a capture, one entry per destination.
#[derive(Debug, Clone, Default)]
pub struct ReplaySummary {
    pub outcomes: BTreeMap<String, CycleOutcome>,
}

impl ReplaySummary {
    pub fn cycles(&self) -> usize {
        self.outcomes.len()
    }

    pub fn total_reward(&self) -> f64 {
        self.outcomes.values().map(|o| o.reward.total).sum()
    }

    pub fn average_reward(&self) -> f64 {
        if self.outcomes.is_empty() {
            0.0
        } else {
            self.total_reward() / self.outcomes.len() as f64
        }
    }
}

/// Treats each destination in the capture as one decoy instance and runs a
/// cycle for each, in address order.
pub async fn run_replay(
    orchestrator: &mut DwellOrchestrator,
    events: Vec<ConnectionEvent>,
    session_log: Option<&SessionLog>,
    progress_enabled: bool,
) -> Result<ReplaySummary> {
    let groups = ObservationWindow::group_by_destination(events);
    if groups.is_empty() {
        warn!("No events to replay");
        return Ok(ReplaySummary::default());
    }
    info!("🔁 Replaying {} decoy instances", groups.len());

    let pb = progress_bar(groups.len() as u64, progress_enabled, "Replaying decoy instances")?;
    let mut summary = ReplaySummary::default();

    for (destination, window) in groups {
        pb.set_message(destination.clone());
        let mut environment = ReplayEnvironment::new(window);
        let outcome = run_cycle(orchestrator, &mut environment, &destination, session_log).await?;
        info!(
            "{}: dwell {:.2} min, reward {:.3}",
            destination, outcome.decision.dwell_minutes, outcome.reward.total
        );
        summary.outcomes.insert(destination, outcome);
        pb.inc(1);
    }

    pb.finish_with_message("Replay complete");
    info!(
        "✅ Replay complete: {} cycles, average reward {:.3}",
        summary.cycles(),
        summary.average_reward()
    );
    Ok(summary)
}
