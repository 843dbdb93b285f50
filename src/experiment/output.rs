//! Serializable experiment results

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::analysis::statistics::StatisticalSummary;
use crate::core::config::SimulationConfig;
use crate::core::error::Result;
use crate::core::types::ActionType;
use crate::defender::DefenderKind;
use crate::network::topology::TopologyMetrics;

/// Everything recorded about one episode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeResult {
    pub episode_id: u64,
    pub defender: DefenderKind,
    pub seed: u64,
    /// Sum of per-step defender rewards
    pub total_reward: f64,
    pub attacker_reward: f64,
    pub steps: u32,
    /// Defender actions in order
    pub actions: Vec<ActionType>,
    pub attacker_actions: Vec<ActionType>,
    pub rewards_per_step: Vec<f64>,
    pub action_counts: BTreeMap<ActionType, u32>,
    pub final_attacker_confidence: f64,
    pub attacker_confidence_trajectory: Vec<f64>,
    /// Nodes successfully deceived over the episode
    pub deception_count: u32,
    pub cognitive_latency_exploitations: u32,
    pub restore_node_count: u32,
    pub final_compromised_ratio: f64,
    pub cognitive_latencies: Vec<f64>,
    pub topology_metrics: TopologyMetrics,
}

/// Aggregates over all episodes of one defender variant
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariantAggregate {
    pub episodes: usize,
    pub rewards: Vec<f64>,
    pub action_counts: BTreeMap<ActionType, u64>,
    pub action_distribution: BTreeMap<ActionType, f64>,
    pub mean_final_confidence: f64,
    /// RestoreNode share of all defender actions
    pub restore_rate: f64,
    pub mean_latency_exploitations: f64,
    pub mean_compromised_ratio: f64,
    pub total_deceptions: u64,
}

fn mean_of(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

impl VariantAggregate {
    pub fn from_results(results: &[EpisodeResult]) -> Self {
        let mut action_counts: BTreeMap<ActionType, u64> = BTreeMap::new();
        for result in results {
            for (action, count) in &result.action_counts {
                *action_counts.entry(*action).or_insert(0) += *count as u64;
            }
        }

        let total_actions: u64 = action_counts.values().sum();
        let action_distribution = if total_actions == 0 {
            BTreeMap::new()
        } else {
            action_counts
                .iter()
                .map(|(action, count)| (*action, *count as f64 / total_actions as f64))
                .collect()
        };
        let restores = action_counts.get(&ActionType::RestoreNode).copied().unwrap_or(0);

        Self {
            episodes: results.len(),
            rewards: results.iter().map(|r| r.total_reward).collect(),
            restore_rate: if total_actions == 0 {
                0.0
            } else {
                restores as f64 / total_actions as f64
            },
            action_counts,
            action_distribution,
            mean_final_confidence: mean_of(results.iter().map(|r| r.final_attacker_confidence)),
            mean_latency_exploitations: mean_of(
                results.iter().map(|r| r.cognitive_latency_exploitations as f64),
            ),
            mean_compromised_ratio: mean_of(results.iter().map(|r| r.final_compromised_ratio)),
            total_deceptions: results.iter().map(|r| r.deception_count as u64).sum(),
        }
    }
}

/// Complete record of one experiment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentOutput {
    pub config: SimulationConfig,
    pub acp_results: Vec<EpisodeResult>,
    pub traditional_results: Vec<EpisodeResult>,
    pub acp: VariantAggregate,
    pub traditional: VariantAggregate,
    /// How much lower the attacker's final confidence is against ACP, in percent
    pub confidence_degradation: f64,
    /// Traditional restore rate over ACP restore rate; None when ACP never restores
    pub restore_rate_ratio: Option<f64>,
    /// Present when both variants have at least two episodes
    pub statistics: Option<StatisticalSummary>,
}

impl ExperimentOutput {
    pub fn new(
        config: SimulationConfig,
        acp_results: Vec<EpisodeResult>,
        traditional_results: Vec<EpisodeResult>,
        statistics: Option<StatisticalSummary>,
    ) -> Self {
        let acp = VariantAggregate::from_results(&acp_results);
        let traditional = VariantAggregate::from_results(&traditional_results);

        let acp_conf = if acp.episodes > 0 { acp.mean_final_confidence } else { 0.0 };
        let trad_conf = if traditional.episodes > 0 {
            traditional.mean_final_confidence
        } else {
            1.0
        };
        let confidence_degradation = if trad_conf > 0.0 {
            (1.0 - acp_conf / trad_conf) * 100.0
        } else {
            0.0
        };
        let restore_rate_ratio = if acp.restore_rate > 0.0 {
            Some(traditional.restore_rate / acp.restore_rate)
        } else {
            None
        };

        Self {
            config,
            acp_results,
            traditional_results,
            acp,
            traditional,
            confidence_degradation,
            restore_rate_ratio,
            statistics,
        }
    }

    pub fn acp_rewards(&self) -> &[f64] {
        &self.acp.rewards
    }

    pub fn traditional_rewards(&self) -> &[f64] {
        &self.traditional.rewards
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn save_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_json_pretty()?)?;
        Ok(())
    }
}
