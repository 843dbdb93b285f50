//! Headless ACP experiment runner
//!
//! Loads a TOML config (or uses defaults), runs the experiment, prints a
//! JSON summary and optionally writes the full results.

use std::path::PathBuf;

use acp_sim::core::config::{ExperimentMode, SimulationConfig};
use acp_sim::core::error::Result;
use acp_sim::experiment::run_experiment;
use clap::Parser;
use serde::Serialize;

/// Run an ACP vs pessimistic defender experiment
#[derive(Parser, Debug)]
#[command(name = "acp_experiment")]
#[command(about = "Compare an ACP defender against a pessimistic defender")]
struct Args {
    /// TOML configuration file
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Override the number of episodes
    #[arg(long)]
    episodes: Option<u64>,

    /// Override the master random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Run every episode id against both defenders (common random numbers)
    #[arg(long)]
    paired: bool,

    /// Write the full results as JSON to this path
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,
}

/// Printed summary
#[derive(Serialize)]
struct Summary {
    acp_episodes: usize,
    traditional_episodes: usize,
    acp_mean_reward: Option<f64>,
    traditional_mean_reward: Option<f64>,
    cohens_d: Option<f64>,
    p_value: Option<f64>,
    achieved_power: Option<f64>,
    acp_restore_rate: f64,
    traditional_restore_rate: f64,
    confidence_degradation: f64,
    mean_latency_exploitations: f64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("acp_sim=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => SimulationConfig::load(path)?,
        None => SimulationConfig::default(),
    };
    if let Some(episodes) = args.episodes {
        config.num_episodes = episodes;
    }
    if let Some(seed) = args.seed {
        config.random_seed = seed;
    }
    if args.paired {
        config.mode = ExperimentMode::Paired;
    }
    config.validate()?;

    let output = run_experiment(&config)?;

    let stats = output.statistics.as_ref();
    let summary = Summary {
        acp_episodes: output.acp.episodes,
        traditional_episodes: output.traditional.episodes,
        acp_mean_reward: stats.map(|s| s.acp.mean),
        traditional_mean_reward: stats.map(|s| s.traditional.mean),
        cohens_d: stats.map(|s| s.cohens_d),
        p_value: stats.map(|s| s.t_test.p_value),
        achieved_power: stats.map(|s| s.power.achieved_power),
        acp_restore_rate: output.acp.restore_rate,
        traditional_restore_rate: output.traditional.restore_rate,
        confidence_degradation: output.confidence_degradation,
        mean_latency_exploitations: output.acp.mean_latency_exploitations,
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);

    if let Some(path) = &args.output {
        output.save_json(path)?;
        tracing::info!(path = %path.display(), "wrote results");
    }

    Ok(())
}
