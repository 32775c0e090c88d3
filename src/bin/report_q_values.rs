// src/bin/report_q_values.rs
use anyhow::{bail, Result};
use clap::Parser;
use std::path::PathBuf;

use dwell_lib::evaluation::{policy_values, value_report_lines};
use dwell_lib::rl::policy::{DwellPolicy, Policy};
use dwell_lib::rl::policy_store::PolicyStore;
use dwell_lib::utils::config::EngineConfig;
use dwell_lib::utils::env::load_env;

#[derive(Parser)]
#[command(author, version, about = "Prints the learned value of each dwell time", long_about = None)]
struct ReportArgs {
    /// Saved policy file; defaults to DWELL_MODEL_PATH
    #[arg(long)]
    model_path: Option<PathBuf>,

    /// Print per-state Q-values as well
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));
    load_env();
    let args = ReportArgs::parse();

    let path = match args.model_path.or(EngineConfig::from_env().model_path) {
        Some(path) => path,
        None => bail!("No model path given and DWELL_MODEL_PATH disables persistence"),
    };
    let mut store = PolicyStore::new(&path);
    let Some(stored) = store.load()? else {
        bail!("No saved policy at {}", path.display());
    };
    let policy = Policy::from_snapshot(stored.policy, None)?;

    println!(
        "\n📊 {} policy v{} (saved {})",
        policy.kind(),
        stored.version,
        stored.saved_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    let values = policy_values(&policy);
    for line in value_report_lines(&values) {
        println!("{}", line);
    }
    if values.is_empty() {
        return Ok(());
    }

    if args.verbose {
        if let Policy::QLearning(agent) = &policy {
            println!("\nPer-state Q-values:");
            let mut rows: Vec<_> = agent.q_table().rows().collect();
            rows.sort_by(|a, b| a.0.cmp(b.0));
            for (state, row) in rows {
                println!("  {} → {:?}", state, row);
            }
        } else {
            println!("\n{}", policy.stats_display());
        }
    }
    Ok(())
}
