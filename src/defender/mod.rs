//! Defender policies
//!
//! Two policies share one trait: the pessimistic defender reacts to
//! worst-case assumptions with expensive restores, the optimistic (ACP)
//! defender spends the attacker's cognitive latency window planting
//! deceptions on nodes the attacker has not yet seen.

pub mod optimistic;
pub mod pessimistic;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::config::SimulationConfig;
use crate::core::types::{ActionType, NodeId, SimRng, Tick};
use crate::network::environment::Observation;

pub use optimistic::OptimisticAcpDefender;
pub use pessimistic::PessimisticDefender;

/// Perceived importance planted by a deception
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criticality {
    Critical,
    High,
    Important,
}

impl Criticality {
    pub const ALL: [Criticality; 3] = [Criticality::Critical, Criticality::High, Criticality::Important];
}

/// False information planted on one node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeceptionRecord {
    pub false_vulnerability: f64,
    pub false_value: f64,
    pub false_criticality: Criticality,
    pub timestamp: Tick,
    pub success: bool,
}

/// Entry in the defender's deception log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeceptionEvent {
    pub node: NodeId,
    pub time: Tick,
    pub criticality: Criticality,
}

/// Bookkeeping shared by both defender variants
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DefenderState {
    pub action_history: Vec<ActionType>,
    pub deception_attempts: u64,
    pub deception_successes: u64,
    pub deception_history: Vec<DeceptionEvent>,
}

impl DefenderState {
    pub fn record_action(&mut self, action: ActionType) {
        self.action_history.push(action);
    }

    /// Fraction of history per action type. Empty history gives an empty map.
    pub fn action_distribution(&self) -> BTreeMap<ActionType, f64> {
        let mut counts: BTreeMap<ActionType, u64> = BTreeMap::new();
        for action in &self.action_history {
            *counts.entry(*action).or_insert(0) += 1;
        }
        let total = self.action_history.len() as f64;
        counts
            .into_iter()
            .map(|(action, count)| (action, count as f64 / total))
            .collect()
    }
}

/// A defender policy
///
/// All randomness comes from the episode RNG passed in.
pub trait Defender: Send {
    fn kind(&self) -> DefenderKind;

    /// Choose this step's action and append it to the action history
    fn select_action(
        &mut self,
        observation: &Observation,
        attacker_known: &BTreeSet<NodeId>,
        rng: &mut SimRng,
    ) -> ActionType;

    /// Attempt to plant deceptions on `targets`, returning the ones that
    /// landed keyed by node
    fn deploy_acp_deception(
        &mut self,
        targets: &[NodeId],
        now: Tick,
        attacker_known: &BTreeSet<NodeId>,
        rng: &mut SimRng,
    ) -> BTreeMap<NodeId, DeceptionRecord>;

    fn state(&self) -> &DefenderState;

    fn action_distribution(&self) -> BTreeMap<ActionType, f64> {
        self.state().action_distribution()
    }
}

/// The two defender variants under comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefenderKind {
    /// Worst-case reactive defender ("traditional")
    Pessimistic,
    /// Deception-first defender exploiting cognitive latency
    OptimisticAcp,
}

impl DefenderKind {
    pub fn build(self, config: &SimulationConfig) -> Box<dyn Defender> {
        match self {
            DefenderKind::Pessimistic => Box::new(PessimisticDefender::new()),
            DefenderKind::OptimisticAcp => Box::new(OptimisticAcpDefender::new(config.acp_strength)),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DefenderKind::Pessimistic => "traditional",
            DefenderKind::OptimisticAcp => "acp",
        }
    }
}

impl fmt::Display for DefenderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
