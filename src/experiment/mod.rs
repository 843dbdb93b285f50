//! Experiment orchestration and result types

pub mod output;
pub mod runner;

pub use output::{EpisodeResult, ExperimentOutput, VariantAggregate};
pub use runner::{episode_plan, run_experiment, run_single_episode};
