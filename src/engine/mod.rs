//! Episode engine: the two-agent step protocol, rewards and metrics

pub mod episode;
pub mod metrics;
pub mod rewards;

pub use episode::{DefenseResult, EpisodeEngine, StepEvent, StepOutcome};
pub use metrics::EngineMetrics;
pub use rewards::AttackResult;
