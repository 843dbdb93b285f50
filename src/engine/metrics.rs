//! Per-episode engine bookkeeping

use serde::{Deserialize, Serialize};

use crate::core::types::Tick;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineMetrics {
    /// Steps in which at least one deception landed inside the latency window
    pub cognitive_latency_exploitations: u32,
    /// Time of every step with a successful deception
    pub acp_deceptions: Vec<Tick>,
    /// Time of every `RestoreNode` step
    pub expensive_actions: Vec<Tick>,
    /// Sampled attacker processing delay, one per step
    pub cognitive_latencies: Vec<f64>,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn record_latency(&mut self, latency: f64) {
        self.cognitive_latencies.push(latency);
    }

    pub fn record_deception(&mut self, time: Tick) {
        self.cognitive_latency_exploitations += 1;
        self.acp_deceptions.push(time);
    }

    pub fn record_expensive_action(&mut self, time: Tick) {
        self.expensive_actions.push(time);
    }

    pub fn mean_latency(&self) -> Option<f64> {
        if self.cognitive_latencies.is_empty() {
            return None;
        }
        Some(self.cognitive_latencies.iter().sum::<f64>() / self.cognitive_latencies.len() as f64)
    }
}
