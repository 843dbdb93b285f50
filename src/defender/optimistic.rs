//! Optimistic defender built on Asymmetric Cognitive Projection
//!
//! The defender knows the whole network; the attacker only knows what it has
//! scanned. Deceptions are planted only on nodes outside the attacker's map,
//! so they cannot be checked against prior experience. `RestoreNode` is never
//! chosen.

use std::collections::{BTreeMap, BTreeSet};

use rand::Rng;

use crate::core::types::{ActionType, NodeId, SimRng, Tick};
use crate::defender::{Criticality, DeceptionEvent, DeceptionRecord, Defender, DefenderKind, DefenderState};
use crate::network::environment::Observation;

pub const DECEPTION_RATE: f64 = 0.45;
pub const HONEYPOT_RATE: f64 = 0.35;
pub const PATCH_RATE: f64 = 0.7;
/// Deception needs more than this many attacker-unknown nodes
pub const DECEPTION_MIN_UNKNOWN: usize = 5;
/// Honeypots need more than this many attacker-unknown nodes
pub const HONEYPOT_MIN_UNKNOWN: usize = 3;

#[derive(Debug, Clone)]
pub struct OptimisticAcpDefender {
    acp_strength: f64,
    state: DefenderState,
}

impl OptimisticAcpDefender {
    pub fn new(acp_strength: f64) -> Self {
        Self {
            acp_strength: acp_strength.clamp(0.0, 1.0),
            state: DefenderState::default(),
        }
    }

    pub fn acp_strength(&self) -> f64 {
        self.acp_strength
    }
}

impl Defender for OptimisticAcpDefender {
    fn kind(&self) -> DefenderKind {
        DefenderKind::OptimisticAcp
    }

    fn select_action(
        &mut self,
        observation: &Observation,
        attacker_known: &BTreeSet<NodeId>,
        rng: &mut SimRng,
    ) -> ActionType {
        let unknown = (0..observation.num_nodes as u32)
            .filter(|id| !attacker_known.contains(&NodeId(*id)))
            .count();

        let action = if unknown > DECEPTION_MIN_UNKNOWN && rng.gen::<f64>() < DECEPTION_RATE {
            ActionType::AcpDeception
        } else if unknown > HONEYPOT_MIN_UNKNOWN && rng.gen::<f64>() < HONEYPOT_RATE {
            ActionType::DeployHoneypot
        } else if observation.compromised_count > 0 {
            if rng.gen::<f64>() < PATCH_RATE {
                ActionType::Patch
            } else {
                ActionType::Isolate
            }
        } else {
            ActionType::Monitor
        };

        self.state.record_action(action);
        action
    }

    fn deploy_acp_deception(
        &mut self,
        targets: &[NodeId],
        now: Tick,
        attacker_known: &BTreeSet<NodeId>,
        rng: &mut SimRng,
    ) -> BTreeMap<NodeId, DeceptionRecord> {
        let mut results = BTreeMap::new();

        for &node in targets {
            if attacker_known.contains(&node) || rng.gen::<f64>() >= self.acp_strength {
                continue;
            }

            let record = DeceptionRecord {
                false_vulnerability: rng.gen_range(0.85..0.98),
                false_value: rng.gen_range(0.75..0.95),
                false_criticality: Criticality::ALL[rng.gen_range(0..Criticality::ALL.len())],
                timestamp: now,
                success: true,
            };

            self.state.deception_attempts += 1;
            self.state.deception_history.push(DeceptionEvent {
                node,
                time: now,
                criticality: record.false_criticality,
            });
            results.insert(node, record);
        }

        if !results.is_empty() {
            self.state.deception_successes += results.len() as u64;
            tracing::debug!(deceived = results.len(), time = now, "planted ACP deception");
        }

        results
    }

    fn state(&self) -> &DefenderState {
        &self.state
    }
}
