//! Instance-based learning attacker
//!
//! Decisions blend remembered outcomes per action type, weighted by a
//! softmax over instance activations. Activation combines power-law recency
//! decay, the confidence tag of the memory, and Gaussian noise:
//!
//! `A = ln(max(Δt^-d, ε)) * confidence + σ·N(0,1)`
//!
//! Deception lowers the confidence tag of memories formed while it was
//! active, which both flattens their influence and drags down the attacker's
//! `overall_confidence`.

use std::cmp::Reverse;
use std::collections::BTreeSet;

use ordered_float::OrderedFloat;
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use crate::attacker::instance::{Instance, LearningRecord, Situation};
use crate::core::config::SimulationConfig;
use crate::core::types::{ActionType, NodeId, SimRng, Tick};
use crate::network::environment::Observation;

/// Memory size that triggers pruning
pub const MEMORY_CAPACITY: usize = 150;
/// Memory size kept after pruning
pub const MEMORY_RETAINED: usize = 100;
/// Recent instances averaged into the confidence update
pub const CONFIDENCE_WINDOW: usize = 20;
/// Weight of the previous value in the confidence moving average
pub const CONFIDENCE_MOMENTUM: f64 = 0.9;
/// Chance of ignoring memory and acting at random
pub const EXPLORATION_RATE: f64 = 0.10;

const ACTIVATION_FLOOR: f64 = 1e-10;
const SOFTMAX_EPSILON: f64 = 1e-10;
const SOFTMAX_CLIP: f64 = 100.0;
/// Placeholder values for never-tried actions are drawn from ±this range
const UNSEEN_VALUE_SPREAD: f64 = 2.0;

/// Cognitive parameters of the attacker
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttackerParams {
    pub decay_rate: f64,
    pub noise: f64,
    pub learning_rate: f64,
}

impl Default for AttackerParams {
    fn default() -> Self {
        Self {
            decay_rate: 0.8,
            noise: 0.1,
            learning_rate: 1.0,
        }
    }
}

impl From<&SimulationConfig> for AttackerParams {
    fn from(config: &SimulationConfig) -> Self {
        Self {
            decay_rate: config.decay_rate,
            noise: config.noise,
            learning_rate: config.learning_rate,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CognitiveAttacker {
    params: AttackerParams,
    memory: Vec<Instance>,
    known_nodes: BTreeSet<NodeId>,
    compromised_nodes: BTreeSet<NodeId>,
    overall_confidence: f64,
    learning_history: Vec<LearningRecord>,
}

impl CognitiveAttacker {
    pub fn new(params: AttackerParams) -> Self {
        Self {
            params,
            memory: Vec::new(),
            known_nodes: BTreeSet::new(),
            compromised_nodes: BTreeSet::new(),
            overall_confidence: 1.0,
            learning_history: Vec::new(),
        }
    }

    pub fn params(&self) -> &AttackerParams {
        &self.params
    }

    pub fn memory(&self) -> &[Instance] {
        &self.memory
    }

    pub fn known_nodes(&self) -> &BTreeSet<NodeId> {
        &self.known_nodes
    }

    pub fn compromised_nodes(&self) -> &BTreeSet<NodeId> {
        &self.compromised_nodes
    }

    pub fn overall_confidence(&self) -> f64 {
        self.overall_confidence
    }

    pub fn learning_history(&self) -> &[LearningRecord] {
        &self.learning_history
    }

    /// Add a node to the attacker's map. Returns true if it was new.
    pub fn discover(&mut self, node: NodeId) -> bool {
        self.known_nodes.insert(node)
    }

    pub fn mark_compromised(&mut self, node: NodeId) {
        self.compromised_nodes.insert(node);
    }

    /// How strongly `instance` is recalled at time `now`
    pub fn activation(&self, instance: &Instance, now: Tick, rng: &mut SimRng) -> f64 {
        if now <= instance.timestamp {
            return 0.0;
        }
        let elapsed = (now - instance.timestamp) as f64;
        let base = elapsed.powf(-self.params.decay_rate).max(ACTIVATION_FLOOR).ln();
        let z: f64 = rng.sample(StandardNormal);
        base * instance.confidence + self.params.noise * z
    }

    /// Pick the attacker action with the highest blended value
    pub fn select_action(&self, now: Tick, rng: &mut SimRng) -> ActionType {
        if self.memory.is_empty() {
            // Nothing to recall yet: explore
            return ActionType::Scan;
        }

        let values = self.blended_values(now, rng);

        let mut best = ActionType::Scan;
        let mut best_value = f64::NEG_INFINITY;
        for (action, value) in ActionType::ATTACKER.iter().zip(values) {
            if value > best_value {
                best = *action;
                best_value = value;
            }
        }

        if rng.gen::<f64>() < EXPLORATION_RATE {
            best = ActionType::ATTACKER[rng.gen_range(0..ActionType::ATTACKER.len())];
        }

        best
    }

    /// Expected outcome per attacker action, in `ActionType::ATTACKER` order
    fn blended_values(&self, now: Tick, rng: &mut SimRng) -> [f64; 3] {
        let mut values = [0.0; 3];
        for (slot, action) in ActionType::ATTACKER.iter().enumerate() {
            let recalled: Vec<&Instance> =
                self.memory.iter().filter(|inst| inst.action == *action).collect();

            values[slot] = if recalled.is_empty() {
                rng.gen_range(-UNSEEN_VALUE_SPREAD..UNSEEN_VALUE_SPREAD)
            } else {
                let activations: Vec<f64> =
                    recalled.iter().map(|inst| self.activation(inst, now, rng)).collect();
                stable_softmax(&activations)
                    .iter()
                    .zip(&recalled)
                    .map(|(w, inst)| w * inst.outcome)
                    .sum()
            };
        }
        values
    }

    /// Store one experience and update the confidence signal
    ///
    /// A `confidence` below full trust marks the memory as poisoned,
    /// independent of how `learning_rate` rescales it.
    pub fn learn(
        &mut self,
        situation: Situation,
        action: ActionType,
        outcome: f64,
        timestamp: Tick,
        confidence: f64,
        rng: &mut SimRng,
    ) {
        let poisoned = confidence < 1.0;
        let confidence = (confidence * self.params.learning_rate).clamp(0.0, 1.0);

        self.memory.push(
            Instance::new(situation, action, outcome, timestamp, confidence).with_poisoned(poisoned),
        );
        self.learning_history.push(LearningRecord {
            timestamp,
            action,
            outcome,
            confidence,
        });

        let window = &self.memory[self.memory.len().saturating_sub(CONFIDENCE_WINDOW)..];
        let recent = window.iter().map(|inst| inst.confidence).sum::<f64>() / window.len() as f64;
        self.overall_confidence = (CONFIDENCE_MOMENTUM * self.overall_confidence
            + (1.0 - CONFIDENCE_MOMENTUM) * recent)
            .clamp(0.0, 1.0);

        if self.memory.len() > MEMORY_CAPACITY {
            self.prune(timestamp, rng);
        }
    }

    /// Keep the `MEMORY_RETAINED` instances with the highest
    /// activation-times-confidence at `now`
    fn prune(&mut self, now: Tick, rng: &mut SimRng) {
        let before = self.memory.len();
        let mut ranked: Vec<(f64, Instance)> = std::mem::take(&mut self.memory)
            .into_iter()
            .map(|inst| {
                let importance = self.activation(&inst, now, rng) * inst.confidence;
                (importance, inst)
            })
            .collect();
        ranked.sort_by_key(|(importance, _)| Reverse(OrderedFloat(*importance)));
        ranked.truncate(MEMORY_RETAINED);
        self.memory = ranked.into_iter().map(|(_, inst)| inst).collect();

        tracing::trace!(before, after = self.memory.len(), now, "pruned attacker memory");
    }

    pub fn encode_situation(&self, observation: &Observation) -> Situation {
        Situation {
            known_count: self.known_nodes.len() as u32,
            compromised_count: self.compromised_nodes.len() as u32,
            alert_permille: (observation.alert_level * 1000.0).round() as u32,
            time_bin: observation.time / 10,
        }
    }
}

/// Softmax with max-shift, exponent clipping, and an epsilon denominator
pub fn stable_softmax(values: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = values
        .iter()
        .map(|v| (v - max).clamp(-SOFTMAX_CLIP, SOFTMAX_CLIP).exp())
        .collect();
    let total: f64 = exps.iter().sum::<f64>() + SOFTMAX_EPSILON;
    exps.into_iter().map(|e| e / total).collect()
}
