// src/bin/dwell_sweep.rs
use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use std::path::PathBuf;

use dwell_lib::evaluation::sweep_dwell_times;
use dwell_lib::ingest::parse_event_log;
use dwell_lib::models::ObservationWindow;
use dwell_lib::rl::reward::RiskProfile;
use dwell_lib::rl::ActionSpace;
use dwell_lib::utils::config::EngineConfig;
use dwell_lib::utils::env::load_env;

#[derive(Parser)]
#[command(author, version, about = "Scores every dwell time in a range against each recorded decoy", long_about = None)]
struct SweepArgs {
    /// JSON-lines connection log
    event_log: PathBuf,

    #[arg(long, default_value_t = 5.0)]
    start: f64,

    #[arg(long, default_value_t = 15.0)]
    end: f64,

    #[arg(long, default_value_t = 0.5)]
    step: f64,

    /// Print every dwell, not just the best one
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));
    load_env();
    let args = SweepArgs::parse();

    let dwells = ActionSpace::stepped(args.start, args.end, args.step).with_context(|| {
        format!(
            "Invalid sweep range {}..={} step {}",
            args.start, args.end, args.step
        )
    })?;

    let config = EngineConfig::from_env();
    config
        .reward_weights
        .validate()
        .context("Invalid reward weights")?;
    let risk = RiskProfile::default();

    let events = parse_event_log(&args.event_log)?;
    let groups = ObservationWindow::group_by_destination(events);
    if groups.is_empty() {
        warn!("No events in {}", args.event_log.display());
        return Ok(());
    }

    info!(
        "🔎 Sweeping {} dwell times ({:.1}..={:.1} min) over {} decoy instances",
        dwells.len(),
        args.start,
        args.end,
        groups.len()
    );
    for (destination, window) in &groups {
        let result = sweep_dwell_times(window, &dwells, &config.reward_weights, &risk);
        if args.verbose {
            for point in &result.points {
                info!(
                    "  {} dwell {:.1} min → reward {:.3}",
                    destination, point.dwell_minutes, point.reward.total
                );
            }
        }
        if let Some(best) = result.best {
            info!(
                "🏆 {}: best dwell {:.1} min with reward {:.3} ({} events)",
                destination,
                best.dwell_minutes,
                best.reward.total,
                window.len()
            );
        }
    }
    Ok(())
}
