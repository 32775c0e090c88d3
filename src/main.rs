// src/main.rs
use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::path::PathBuf;
use std::time::Instant;

use dwell_lib::controller::{run_replay, SessionLog};
use dwell_lib::ingest::parse_event_log;
use dwell_lib::rl::orchestrator::DwellOrchestrator;
use dwell_lib::rl::policy::PolicyKind;
use dwell_lib::utils::config::EngineConfig;
use dwell_lib::utils::env::load_env;

#[derive(Parser)]
#[command(author, version, about = "Replays a decoy capture through the dwell-time policy", long_about = None)]
struct Args {
    /// JSON-lines connection log to replay
    event_log: PathBuf,

    /// Policy to train (epsilon_greedy, ucb, q_learning)
    #[arg(long)]
    policy: Option<PolicyKind>,

    /// Comma-separated dwell times in minutes
    #[arg(long, value_delimiter = ',')]
    actions: Option<Vec<f64>>,

    /// Seed for reproducible exploration
    #[arg(long)]
    seed: Option<u64>,

    /// Where to load and save the learned policy
    #[arg(long)]
    model_path: Option<PathBuf>,

    /// Train without reading or writing a saved policy
    #[arg(long)]
    no_persist: bool,

    /// Directory for controller_log.jsonl
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Hide the progress bar
    #[arg(long)]
    no_progress: bool,
}

impl Args {
    fn apply(self, config: &mut EngineConfig) -> PathBuf {
        if let Some(policy) = self.policy {
            config.policy = policy;
        }
        if let Some(actions) = self.actions {
            config.dwell_times = actions;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if let Some(path) = self.model_path {
            config.model_path = Some(path);
        }
        if self.no_persist {
            config.model_path = None;
        }
        if let Some(dir) = self.log_dir {
            config.session_log_dir = dir;
        }
        if self.no_progress {
            config.progress_enabled = false;
        }
        self.event_log
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));
    load_env();
    let start_time = Instant::now();

    let args = Args::parse();
    let mut config = EngineConfig::from_env();
    let event_log = args.apply(&mut config);
    config.log_config();

    let mut orchestrator =
        DwellOrchestrator::from_config(&config).context("Failed to initialize dwell orchestrator")?;
    let session_log = SessionLog::open(&config.session_log_dir)?;
    info!("📝 Session records go to {}", session_log.path().display());

    let events = parse_event_log(&event_log)?;
    let summary = run_replay(
        &mut orchestrator,
        events,
        Some(&session_log),
        config.progress_enabled,
    )
    .await?;

    info!("{}", orchestrator.stats_display());
    info!(
        "🏁 Finished {} cycles in {:.2?} (total reward {:.3})",
        summary.cycles(),
        start_time.elapsed(),
        summary.total_reward()
    );
    Ok(())
}
