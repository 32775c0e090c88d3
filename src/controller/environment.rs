// src/controller/environment.rs
use anyhow::Result;
use log::debug;
use std::future::Future;

use crate::models::ObservationWindow;

/// What a decoy saw while it was up, plus the traffic that followed teardown.
#[derive(Debug, Clone, PartialEq)]
pub struct DwellOutcome {
    pub captured: ObservationWindow,
    pub next_window: ObservationWindow,
}

/// Something that can stand up a decoy, keep it alive for a dwell time and
/// report what it captured. Cloud and lab deployments implement this; the
/// replay environment drives the engine from recorded traffic.
pub trait EnvironmentController {
    /// Traffic observed before the next decision.
    fn observe(&mut self) -> impl Future<Output = Result<ObservationWindow>> + Send;

    fn run_dwell(&mut self, dwell_minutes: f64)
        -> impl Future<Output = Result<DwellOutcome>> + Send;
}

/// Replays one recorded destination: a decoy kept for `d` minutes captures the
/// events up to `d` and the rest becomes the follow-up window.
#[derive(Debug, Clone)]
pub struct ReplayEnvironment {
    recording: ObservationWindow,
}

impl ReplayEnvironment {
    pub fn new(recording: ObservationWindow) -> Self {
        Self { recording }
    }

    pub fn recording(&self) -> &ObservationWindow {
        &self.recording
    }
}

impl EnvironmentController for ReplayEnvironment {
    async fn observe(&mut self) -> Result<ObservationWindow> {
        Ok(self.recording.clone())
    }

    async fn run_dwell(&mut self, dwell_minutes: f64) -> Result<DwellOutcome> {
        let captured = self.recording.truncated(dwell_minutes);
        let next_window = self.recording.remainder_after(dwell_minutes);
        debug!(
            "Replayed {:.2} min: {} events captured, {} after teardown",
            dwell_minutes,
            captured.len(),
            next_window.len()
        );
        Ok(DwellOutcome {
            captured,
            next_window,
        })
    }
}
