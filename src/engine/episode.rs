//! Turn-based episode engine
//!
//! Each step: observe -> latency window -> defender acts -> attacker acts ->
//! attacker learns -> rewards -> termination check.
//!
//! The defender resolves inside the attacker's cognitive latency window, so
//! any deception it plants taints the memory the attacker forms this step.

use std::collections::BTreeMap;

use ahash::AHashSet;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::attacker::memory::CognitiveAttacker;
use crate::core::config::SimulationConfig;
use crate::core::error::{AcpError, Result};
use crate::core::types::{ActionType, NodeId, NodeState, Role, SimRng, Tick};
use crate::defender::{DeceptionRecord, Defender};
use crate::engine::metrics::EngineMetrics;
use crate::engine::rewards::{
    self, AttackResult, EXPLOIT_FAILURE_VALUE, EXPLOIT_VALUE, PROPAGATE_SUCCESS_RATE,
    PROPAGATE_VALUE, SCAN_VALUE,
};
use crate::network::environment::{Network, Observation};
use crate::network::topology::generate_topology;
use crate::network::vulnerability::VulnerabilitySampler;

/// Episode ends once more than this fraction of nodes is compromised
pub const COMPROMISE_LIMIT: f64 = 0.7;
/// Episode ends once time exceeds this
pub const TIME_LIMIT: Tick = 50;
/// Most nodes one deception can target
pub const MAX_DECEPTION_TARGETS: usize = 5;
/// Most nodes one restore brings back
pub const RESTORE_BATCH: usize = 3;
/// Patch only nodes above this vulnerability
pub const PATCH_THRESHOLD: f64 = 0.5;
/// Learning confidence drawn when deception landed this step
pub const POISONED_CONFIDENCE: (f64, f64) = (0.3, 0.5);

/// A state change made during a step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StepEvent {
    Deceived { node: NodeId },
    Patched { node: NodeId },
    Isolated { node: NodeId },
    HoneypotDeployed { node: NodeId },
    Restored { node: NodeId },
    Discovered { node: NodeId },
    Compromised { node: NodeId, via: ActionType },
}

impl StepEvent {
    /// The node whose state this event changed, if any
    pub fn mutated_node(&self) -> Option<NodeId> {
        match self {
            StepEvent::Patched { node }
            | StepEvent::Isolated { node }
            | StepEvent::HoneypotDeployed { node }
            | StepEvent::Restored { node }
            | StepEvent::Compromised { node, .. } => Some(*node),
            StepEvent::Deceived { .. } | StepEvent::Discovered { .. } => None,
        }
    }
}

/// Result of the defender phase
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DefenseResult {
    pub success: bool,
    pub deceptions: BTreeMap<NodeId, DeceptionRecord>,
    pub restored: usize,
}

/// Everything one `step` produced
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    /// Post-step observation
    pub observation: Observation,
    pub attacker_reward: f64,
    pub defender_reward: f64,
    pub done: bool,
    pub attack: AttackResult,
    pub defense: DefenseResult,
    pub cognitive_latency: f64,
    pub learning_confidence: f64,
    pub events: Vec<StepEvent>,
}

pub struct EpisodeEngine {
    config: SimulationConfig,
    network: Network,
    time: Tick,
    metrics: EngineMetrics,
}

impl EpisodeEngine {
    /// Validate the config, then build the topology and vulnerabilities
    pub fn new(config: &SimulationConfig, rng: &mut SimRng) -> Result<Self> {
        config.validate()?;
        let sampler = VulnerabilitySampler::new(config.vulnerability_distribution)?;
        let topology = generate_topology(
            config.topology_type,
            config.num_nodes as usize,
            config.connectivity,
            rng,
        );
        let network = Network::new(topology, sampler, rng);

        Ok(Self {
            config: config.clone(),
            network,
            time: 0,
            metrics: EngineMetrics::new(),
        })
    }

    /// Fresh episode on the same (or a regenerated) topology
    pub fn reset(&mut self, rng: &mut SimRng) -> Observation {
        if self.config.regenerate_topology {
            let topology = generate_topology(
                self.config.topology_type,
                self.config.num_nodes as usize,
                self.config.connectivity,
                rng,
            );
            self.network.replace_topology(topology, rng);
        } else {
            self.network.reset(rng);
        }
        self.time = 0;
        self.metrics.clear();
        self.observe()
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn time(&self) -> Tick {
        self.time
    }

    pub fn metrics(&self) -> &EngineMetrics {
        &self.metrics
    }

    pub fn observe(&self) -> Observation {
        self.network.observe(self.time)
    }

    pub fn is_terminated(&self) -> bool {
        let compromised = self.network.count(NodeState::Compromised) as f64;
        compromised > self.network.node_count() as f64 * COMPROMISE_LIMIT || self.time > TIME_LIMIT
    }

    /// Advance one protocol step
    pub fn step(
        &mut self,
        attacker_action: ActionType,
        defender_action: ActionType,
        attacker: &mut CognitiveAttacker,
        defender: &mut dyn Defender,
        rng: &mut SimRng,
    ) -> Result<StepOutcome> {
        if attacker_action.role() != Role::Attacker {
            return Err(AcpError::RoleMismatch {
                action: attacker_action,
                expected: Role::Attacker,
            });
        }
        if defender_action.role() != Role::Defender {
            return Err(AcpError::RoleMismatch {
                action: defender_action,
                expected: Role::Defender,
            });
        }

        let mut events = Vec::new();
        let mut touched: AHashSet<NodeId> = AHashSet::new();

        // ===== PHASE 1: OBSERVE =====
        self.time += 1;
        let observation = self.observe();

        // ===== PHASE 2: LATENCY WINDOW =====
        let (lo, hi) = self.config.latency_window;
        let cognitive_latency = rng.gen_range(lo..=hi);
        self.metrics.record_latency(cognitive_latency);

        // ===== PHASE 3: DEFENDER =====
        let defense = if defender_action == ActionType::AcpDeception {
            self.phase_deception(attacker, defender, rng, &mut events)
        } else {
            self.phase_defend(defender_action, rng, &mut touched, &mut events)
        };

        // ===== PHASE 4: ATTACKER =====
        let attack = self.phase_attack(attacker_action, attacker, rng, &touched, &mut events);

        // ===== PHASE 5: LEARNING =====
        let learning_confidence = if defense.deceptions.is_empty() {
            1.0
        } else {
            rng.gen_range(POISONED_CONFIDENCE.0..POISONED_CONFIDENCE.1)
        };
        let situation = attacker.encode_situation(&observation);
        attacker.learn(
            situation,
            attacker_action,
            attack.value,
            self.time,
            learning_confidence,
            rng,
        );

        // ===== PHASE 6: REWARDS =====
        let attacker_reward = rewards::attacker_reward(attacker_action, &attack);
        let defender_reward = rewards::defender_reward(
            defender_action,
            defense.success,
            defense.deceptions.len(),
            self.network.count(NodeState::Clean),
            self.network.count(NodeState::Compromised),
        );
        if defender_action == ActionType::RestoreNode {
            self.metrics.record_expensive_action(self.time);
        }

        // ===== PHASE 7: TERMINATION =====
        let done = self.is_terminated();

        tracing::trace!(
            time = self.time,
            attacker = %attacker_action,
            defender = %defender_action,
            attack_success = attack.success,
            defense_success = defense.success,
            done,
            "step resolved"
        );

        Ok(StepOutcome {
            observation: self.observe(),
            attacker_reward,
            defender_reward,
            done,
            attack,
            defense,
            cognitive_latency,
            learning_confidence,
            events,
        })
    }

    fn phase_deception(
        &mut self,
        attacker: &CognitiveAttacker,
        defender: &mut dyn Defender,
        rng: &mut SimRng,
        events: &mut Vec<StepEvent>,
    ) -> DefenseResult {
        let known = attacker.known_nodes();
        let targets: Vec<NodeId> = self
            .network
            .topology()
            .nodes()
            .filter(|node| !known.contains(node))
            .take(MAX_DECEPTION_TARGETS)
            .collect();
        if targets.is_empty() {
            return DefenseResult::default();
        }

        let deceptions = defender.deploy_acp_deception(&targets, self.time, known, rng);
        if !deceptions.is_empty() {
            self.metrics.record_deception(self.time);
            events.extend(deceptions.keys().map(|&node| StepEvent::Deceived { node }));
            tracing::debug!(
                time = self.time,
                deceived = deceptions.len(),
                "deception landed in latency window"
            );
        }

        DefenseResult {
            success: !deceptions.is_empty(),
            deceptions,
            restored: 0,
        }
    }

    fn phase_defend(
        &mut self,
        action: ActionType,
        rng: &mut SimRng,
        touched: &mut AHashSet<NodeId>,
        events: &mut Vec<StepEvent>,
    ) -> DefenseResult {
        let mut result = DefenseResult::default();

        match action {
            ActionType::Monitor => result.success = true,
            ActionType::Patch => {
                let candidates: Vec<NodeId> = self
                    .network
                    .nodes()
                    .iter()
                    .filter(|n| n.state == NodeState::Clean && n.vulnerability() > PATCH_THRESHOLD)
                    .map(|n| n.id)
                    .collect();
                if let Some(&target) = candidates.choose(rng) {
                    if let Some(node) = self.network.node_mut(target) {
                        let halved = node.vulnerability() * 0.5;
                        node.set_vulnerability(halved);
                        node.state = NodeState::Patched;
                    }
                    touched.insert(target);
                    events.push(StepEvent::Patched { node: target });
                    result.success = true;
                }
            }
            ActionType::Isolate => {
                let candidates = self.network.nodes_in_state(NodeState::Compromised);
                if let Some(&target) = candidates.choose(rng) {
                    self.network.set_state(target, NodeState::Isolated);
                    touched.insert(target);
                    events.push(StepEvent::Isolated { node: target });
                    result.success = true;
                }
            }
            ActionType::DeployHoneypot => {
                let candidates = self.network.nodes_in_state(NodeState::Clean);
                if let Some(&target) = candidates.choose(rng) {
                    self.network.set_state(target, NodeState::Honeypot);
                    touched.insert(target);
                    events.push(StepEvent::HoneypotDeployed { node: target });
                    result.success = true;
                }
            }
            ActionType::RestoreNode => {
                let compromised = self.network.nodes_in_state(NodeState::Compromised);
                for &target in compromised.iter().take(RESTORE_BATCH) {
                    self.network.set_state(target, NodeState::Clean);
                    self.network.resample_vulnerability(target, rng);
                    touched.insert(target);
                    events.push(StepEvent::Restored { node: target });
                    result.restored += 1;
                }
                result.success = result.restored > 0;
                if result.success {
                    tracing::debug!(time = self.time, restored = result.restored, "restored nodes");
                }
            }
            // Handled by `phase_deception`
            ActionType::AcpDeception => {}
            ActionType::Scan | ActionType::Exploit | ActionType::Propagate => {}
        }

        result
    }

    fn phase_attack(
        &mut self,
        action: ActionType,
        attacker: &mut CognitiveAttacker,
        rng: &mut SimRng,
        touched: &AHashSet<NodeId>,
        events: &mut Vec<StepEvent>,
    ) -> AttackResult {
        match action {
            ActionType::Scan => self.scan(attacker, rng, events),
            ActionType::Exploit => self.exploit(attacker, rng, touched, events),
            ActionType::Propagate => self.propagate(attacker, rng, touched, events),
            _ => AttackResult::default(),
        }
    }

    fn scan(
        &mut self,
        attacker: &mut CognitiveAttacker,
        rng: &mut SimRng,
        events: &mut Vec<StepEvent>,
    ) -> AttackResult {
        let discovered = if attacker.known_nodes().is_empty() {
            // Entry point
            let all: Vec<NodeId> = self.network.topology().nodes().collect();
            all.choose(rng).copied()
        } else {
            let known: Vec<NodeId> = attacker.known_nodes().iter().copied().collect();
            known.choose(rng).and_then(|&from| {
                let fresh: Vec<NodeId> = self
                    .network
                    .topology()
                    .neighbors(from)
                    .into_iter()
                    .filter(|n| !attacker.known_nodes().contains(n))
                    .collect();
                fresh.choose(rng).copied()
            })
        };

        match discovered {
            Some(node) => {
                attacker.discover(node);
                events.push(StepEvent::Discovered { node });
                AttackResult {
                    success: true,
                    value: SCAN_VALUE,
                }
            }
            None => AttackResult::default(),
        }
    }

    fn exploit(
        &mut self,
        attacker: &mut CognitiveAttacker,
        rng: &mut SimRng,
        touched: &AHashSet<NodeId>,
        events: &mut Vec<StepEvent>,
    ) -> AttackResult {
        let exploitable: Vec<NodeId> = attacker
            .known_nodes()
            .iter()
            .copied()
            .filter(|n| !touched.contains(n) && self.network.state(*n) == Some(NodeState::Clean))
            .collect();

        let Some(&target) = exploitable.choose(rng) else {
            return AttackResult::default();
        };
        let vulnerability = self.network.node(target).map_or(0.0, |n| n.vulnerability());

        if rng.gen::<f64>() < vulnerability {
            self.network.set_state(target, NodeState::Compromised);
            attacker.mark_compromised(target);
            events.push(StepEvent::Compromised {
                node: target,
                via: ActionType::Exploit,
            });
            AttackResult {
                success: true,
                value: EXPLOIT_VALUE,
            }
        } else {
            AttackResult {
                success: false,
                value: EXPLOIT_FAILURE_VALUE,
            }
        }
    }

    fn propagate(
        &mut self,
        attacker: &mut CognitiveAttacker,
        rng: &mut SimRng,
        touched: &AHashSet<NodeId>,
        events: &mut Vec<StepEvent>,
    ) -> AttackResult {
        let footholds: Vec<NodeId> = attacker.compromised_nodes().iter().copied().collect();
        let Some(&source) = footholds.choose(rng) else {
            return AttackResult::default();
        };

        let targets: Vec<NodeId> = self
            .network
            .topology()
            .neighbors(source)
            .into_iter()
            .filter(|n| {
                !attacker.compromised_nodes().contains(n)
                    && !touched.contains(n)
                    && self.network.state(*n) == Some(NodeState::Clean)
            })
            .collect();
        let Some(&target) = targets.choose(rng) else {
            return AttackResult::default();
        };

        if rng.gen::<f64>() < PROPAGATE_SUCCESS_RATE {
            self.network.set_state(target, NodeState::Compromised);
            attacker.mark_compromised(target);
            if attacker.discover(target) {
                events.push(StepEvent::Discovered { node: target });
            }
            events.push(StepEvent::Compromised {
                node: target,
                via: ActionType::Propagate,
            });
            AttackResult {
                success: true,
                value: PROPAGATE_VALUE,
            }
        } else {
            AttackResult::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attacker::memory::AttackerParams;
    use crate::core::config::VulnerabilityDistribution;
    use crate::defender::{OptimisticAcpDefender, PessimisticDefender};
    use rand::SeedableRng;

    fn config() -> SimulationConfig {
        SimulationConfig::builder()
            .num_nodes(20)
            .connectivity(0.6)
            .random_seed(42)
            .build()
            .unwrap()
    }

    fn setup() -> (EpisodeEngine, CognitiveAttacker, SimRng) {
        setup_seeded(42)
    }

    fn setup_seeded(seed: u64) -> (EpisodeEngine, CognitiveAttacker, SimRng) {
        let mut rng = SimRng::seed_from_u64(seed);
        let engine = EpisodeEngine::new(&config(), &mut rng).unwrap();
        let attacker = CognitiveAttacker::new(AttackerParams::default());
        (engine, attacker, rng)
    }

    fn set_vulnerability(engine: &mut EpisodeEngine, id: u32, value: f64) {
        if let Some(node) = engine.network.node_mut(NodeId(id)) {
            node.set_vulnerability(value);
        }
    }

    #[test]
    fn test_rejects_swapped_roles() {
        let (mut engine, mut attacker, mut rng) = setup();
        let mut defender = PessimisticDefender::new();

        let err = engine
            .step(ActionType::Patch, ActionType::Monitor, &mut attacker, &mut defender, &mut rng)
            .unwrap_err();
        assert!(matches!(
            err,
            AcpError::RoleMismatch {
                action: ActionType::Patch,
                expected: Role::Attacker
            }
        ));

        let err = engine
            .step(ActionType::Scan, ActionType::Exploit, &mut attacker, &mut defender, &mut rng)
            .unwrap_err();
        assert!(matches!(err, AcpError::RoleMismatch { expected: Role::Defender, .. }));
        assert_eq!(engine.time(), 0);
    }

    #[test]
    fn test_first_scan_finds_entry_point() {
        let (mut engine, mut attacker, mut rng) = setup();
        let mut defender = PessimisticDefender::new();
        let outcome = engine
            .step(ActionType::Scan, ActionType::Monitor, &mut attacker, &mut defender, &mut rng)
            .unwrap();

        assert!(outcome.attack.success);
        assert_eq!(attacker.known_nodes().len(), 1);
        assert_eq!(outcome.attacker_reward, -0.5 + SCAN_VALUE);
        // Monitor succeeds on an all-clean network: -0.1 + 20 * 0.4 + 1.0
        assert!((outcome.defender_reward - 8.9).abs() < 1e-9);
        assert_eq!(outcome.learning_confidence, 1.0);
        assert_eq!(attacker.memory().len(), 1);
    }

    #[test]
    fn test_latency_recorded_within_window() {
        let (mut engine, mut attacker, mut rng) = setup();
        let mut defender = PessimisticDefender::new();
        for _ in 0..10 {
            let outcome = engine
                .step(ActionType::Scan, ActionType::Monitor, &mut attacker, &mut defender, &mut rng)
                .unwrap();
            assert!((0.3..=0.8).contains(&outcome.cognitive_latency));
        }
        assert_eq!(engine.metrics().cognitive_latencies.len(), 10);
    }

    #[test]
    fn test_restore_brings_back_lowest_ids_first() {
        let (mut engine, mut attacker, mut rng) = setup();
        for id in [2, 5, 7, 11] {
            engine.network.set_state(NodeId(id), NodeState::Compromised);
        }
        let mut defender = PessimisticDefender::new();
        let outcome = engine
            .step(ActionType::Scan, ActionType::RestoreNode, &mut attacker, &mut defender, &mut rng)
            .unwrap();

        assert_eq!(outcome.defense.restored, 3);
        assert_eq!(
            engine.network().nodes_in_state(NodeState::Compromised),
            vec![NodeId(11)]
        );
        assert_eq!(engine.metrics().expensive_actions, vec![1]);
    }

    #[test]
    fn test_failed_restore_is_silent_no_op() {
        let (mut engine, mut attacker, mut rng) = setup();
        let mut defender = PessimisticDefender::new();
        let outcome = engine
            .step(ActionType::Scan, ActionType::RestoreNode, &mut attacker, &mut defender, &mut rng)
            .unwrap();
        assert!(!outcome.defense.success);
        // -6 + 20 * 0.4, no bonus
        assert!((outcome.defender_reward - 2.0).abs() < 1e-9);
        assert_eq!(engine.metrics().expensive_actions.len(), 1);
    }

    #[test]
    fn test_deception_poisons_learning() {
        let (mut engine, mut attacker, mut rng) = setup();
        let mut defender = OptimisticAcpDefender::new(1.0);
        let outcome = engine
            .step(ActionType::Scan, ActionType::AcpDeception, &mut attacker, &mut defender, &mut rng)
            .unwrap();

        assert_eq!(outcome.defense.deceptions.len(), MAX_DECEPTION_TARGETS);
        let targets: Vec<NodeId> = outcome.defense.deceptions.keys().copied().collect();
        assert_eq!(targets, (0..5).map(NodeId).collect::<Vec<_>>());
        assert!((0.3..0.5).contains(&outcome.learning_confidence));
        assert!(attacker.memory()[0].is_poisoned());
        assert_eq!(engine.metrics().cognitive_latency_exploitations, 1);
        assert_eq!(engine.metrics().acp_deceptions, vec![1]);
    }

    #[test]
    fn test_defender_touched_nodes_are_not_mutated_again() {
        for seed in 0..30 {
            let mut rng = SimRng::seed_from_u64(seed);
            let mut engine = EpisodeEngine::new(&config(), &mut rng).unwrap();
            let mut attacker = CognitiveAttacker::new(AttackerParams::default());
            let mut defender = OptimisticAcpDefender::new(0.65);
            for id in 0..20 {
                attacker.discover(NodeId(id));
            }
            let attacks = [ActionType::Exploit, ActionType::Propagate];
            let defenses = [
                ActionType::Patch,
                ActionType::DeployHoneypot,
                ActionType::Isolate,
                ActionType::RestoreNode,
            ];
            for step in 0..30 {
                let outcome = engine
                    .step(
                        attacks[step % 2],
                        defenses[step % 4],
                        &mut attacker,
                        &mut defender,
                        &mut rng,
                    )
                    .unwrap();
                let mut seen = AHashSet::new();
                for node in outcome.events.iter().filter_map(StepEvent::mutated_node) {
                    assert!(seen.insert(node), "node {} mutated twice in one step", node);
                }
                if outcome.done {
                    break;
                }
            }
        }
    }

    // ========================================================================
    // Per-action effects
    // ========================================================================

    #[test]
    fn test_patch_halves_vulnerability() {
        let (mut engine, mut attacker, mut rng) = setup();
        for id in 0..20 {
            set_vulnerability(&mut engine, id, 0.2);
        }
        set_vulnerability(&mut engine, 3, 0.8);
        let mut defender = PessimisticDefender::new();

        let outcome = engine
            .step(ActionType::Scan, ActionType::Patch, &mut attacker, &mut defender, &mut rng)
            .unwrap();

        assert!(outcome.defense.success);
        let node = engine.network().node(NodeId(3)).unwrap();
        assert_eq!(node.state, NodeState::Patched);
        assert!((node.vulnerability() - 0.4).abs() < 1e-12);
        assert!(outcome.events.contains(&StepEvent::Patched { node: NodeId(3) }));
        // -1.5 + 19 clean * 0.4 + 4
        assert!((outcome.defender_reward - 10.1).abs() < 1e-9);
    }

    #[test]
    fn test_patch_without_exposed_nodes_is_no_op() {
        let (mut engine, mut attacker, mut rng) = setup();
        for id in 0..20 {
            set_vulnerability(&mut engine, id, 0.5);
        }
        let mut defender = PessimisticDefender::new();
        let outcome = engine
            .step(ActionType::Scan, ActionType::Patch, &mut attacker, &mut defender, &mut rng)
            .unwrap();
        assert!(!outcome.defense.success);
        assert_eq!(engine.network().count(NodeState::Patched), 0);
    }

    #[test]
    fn test_default_config_patch_finds_targets() {
        let mut patched = 0;
        for seed in 0..10 {
            let config = SimulationConfig::default();
            let mut rng = SimRng::seed_from_u64(seed);
            let mut engine = EpisodeEngine::new(&config, &mut rng).unwrap();
            let mut attacker = CognitiveAttacker::new(AttackerParams::from(&config));
            let mut defender = PessimisticDefender::new();
            let outcome = engine
                .step(ActionType::Scan, ActionType::Patch, &mut attacker, &mut defender, &mut rng)
                .unwrap();
            if outcome.defense.success {
                patched += 1;
            }
        }
        assert!(patched > 5, "default config patched {} / 10", patched);

        // A constant 0.5 leaves nothing above the threshold
        let flat = SimulationConfig::builder()
            .vulnerability_distribution(VulnerabilityDistribution::Uniform)
            .build()
            .unwrap();
        let mut rng = SimRng::seed_from_u64(0);
        let mut engine = EpisodeEngine::new(&flat, &mut rng).unwrap();
        let mut attacker = CognitiveAttacker::new(AttackerParams::from(&flat));
        let mut defender = PessimisticDefender::new();
        let outcome = engine
            .step(ActionType::Scan, ActionType::Patch, &mut attacker, &mut defender, &mut rng)
            .unwrap();
        assert!(!outcome.defense.success);
    }

    #[test]
    fn test_isolate_quarantines_compromised_node() {
        let (mut engine, mut attacker, mut rng) = setup();
        engine.network.set_state(NodeId(4), NodeState::Compromised);
        let mut defender = PessimisticDefender::new();

        let outcome = engine
            .step(ActionType::Scan, ActionType::Isolate, &mut attacker, &mut defender, &mut rng)
            .unwrap();

        assert!(outcome.defense.success);
        assert_eq!(engine.network().state(NodeId(4)), Some(NodeState::Isolated));
        assert_eq!(engine.network().count(NodeState::Compromised), 0);
        assert!(outcome.events.contains(&StepEvent::Isolated { node: NodeId(4) }));
    }

    #[test]
    fn test_honeypot_lands_on_clean_node() {
        let (mut engine, mut attacker, mut rng) = setup();
        for id in (0..20).filter(|&id| id != 6) {
            engine.network.set_state(NodeId(id), NodeState::Patched);
        }
        let mut defender = OptimisticAcpDefender::new(0.65);

        let outcome = engine
            .step(ActionType::Scan, ActionType::DeployHoneypot, &mut attacker, &mut defender, &mut rng)
            .unwrap();

        assert!(outcome.defense.success);
        assert_eq!(engine.network().state(NodeId(6)), Some(NodeState::Honeypot));
        assert!(outcome.events.contains(&StepEvent::HoneypotDeployed { node: NodeId(6) }));
    }

    #[test]
    fn test_exploit_on_fully_exposed_node_compromises() {
        let (mut engine, mut attacker, mut rng) = setup();
        attacker.discover(NodeId(2));
        set_vulnerability(&mut engine, 2, 1.0);
        let mut defender = PessimisticDefender::new();

        let outcome = engine
            .step(ActionType::Exploit, ActionType::Monitor, &mut attacker, &mut defender, &mut rng)
            .unwrap();

        assert!(outcome.attack.success);
        assert_eq!(engine.network().state(NodeId(2)), Some(NodeState::Compromised));
        assert!(attacker.compromised_nodes().contains(&NodeId(2)));
        assert_eq!(outcome.attack.value, EXPLOIT_VALUE);
        assert_eq!(outcome.attacker_reward, -2.0 + EXPLOIT_VALUE);
        assert_eq!(attacker.memory()[0].outcome, EXPLOIT_VALUE);
    }

    #[test]
    fn test_failed_exploit_teaches_but_does_not_pay() {
        let (mut engine, mut attacker, mut rng) = setup();
        attacker.discover(NodeId(2));
        set_vulnerability(&mut engine, 2, 0.0);
        let mut defender = PessimisticDefender::new();

        let outcome = engine
            .step(ActionType::Exploit, ActionType::Monitor, &mut attacker, &mut defender, &mut rng)
            .unwrap();

        assert!(!outcome.attack.success);
        assert_eq!(engine.network().state(NodeId(2)), Some(NodeState::Clean));
        assert_eq!(outcome.attacker_reward, -2.0);
        assert_eq!(attacker.memory()[0].outcome, EXPLOIT_FAILURE_VALUE);
    }

    #[test]
    fn test_propagate_outcomes() {
        let (mut hits, mut misses) = (0, 0);
        for seed in 0..40 {
            let (mut engine, mut attacker, mut rng) = setup_seeded(seed);
            engine.network.set_state(NodeId(0), NodeState::Compromised);
            attacker.discover(NodeId(0));
            attacker.mark_compromised(NodeId(0));
            let mut defender = PessimisticDefender::new();

            let outcome = engine
                .step(ActionType::Propagate, ActionType::Monitor, &mut attacker, &mut defender, &mut rng)
                .unwrap();

            if outcome.attack.success {
                hits += 1;
                let target = outcome
                    .events
                    .iter()
                    .find_map(|e| match e {
                        StepEvent::Compromised {
                            node,
                            via: ActionType::Propagate,
                        } => Some(*node),
                        _ => None,
                    })
                    .unwrap();
                assert!(engine.network().topology().has_edge(NodeId(0), target));
                assert_eq!(engine.network().state(target), Some(NodeState::Compromised));
                assert!(attacker.known_nodes().contains(&target));
                assert_eq!(outcome.attacker_reward, -1.0 + PROPAGATE_VALUE);
            } else {
                misses += 1;
                assert_eq!(outcome.attack.value, 0.0);
                assert_eq!(outcome.attacker_reward, -1.0);
                assert_eq!(engine.network().count(NodeState::Compromised), 1);
                assert_eq!(attacker.memory()[0].outcome, 0.0);
            }
        }
        assert!(hits > 0 && misses > 0, "hits {} misses {}", hits, misses);
    }

    #[test]
    fn test_scan_expands_from_known_nodes() {
        let (mut engine, mut attacker, mut rng) = setup();
        attacker.discover(NodeId(0));
        let mut defender = PessimisticDefender::new();

        for _ in 0..15 {
            let before = attacker.known_nodes().clone();
            let outcome = engine
                .step(ActionType::Scan, ActionType::Monitor, &mut attacker, &mut defender, &mut rng)
                .unwrap();
            for event in &outcome.events {
                if let StepEvent::Discovered { node } = event {
                    assert!(!before.contains(node));
                    assert!(
                        before
                            .iter()
                            .any(|&known| engine.network().topology().has_edge(known, *node)),
                        "{} is not adjacent to any known node",
                        node
                    );
                }
            }
        }
        assert!(attacker.known_nodes().len() > 1);
    }

    #[test]
    fn test_terminates_on_time_limit() {
        let (mut engine, mut attacker, mut rng) = setup();
        let mut defender = PessimisticDefender::new();
        let mut steps = 0;
        loop {
            steps += 1;
            let outcome = engine
                .step(ActionType::Scan, ActionType::Monitor, &mut attacker, &mut defender, &mut rng)
                .unwrap();
            if outcome.done {
                break;
            }
        }
        assert_eq!(steps, TIME_LIMIT + 1);
    }

    #[test]
    fn test_reset_clears_state() {
        let (mut engine, mut attacker, mut rng) = setup();
        let mut defender = OptimisticAcpDefender::new(1.0);
        engine
            .step(ActionType::Scan, ActionType::AcpDeception, &mut attacker, &mut defender, &mut rng)
            .unwrap();
        engine.network.set_state(NodeId(0), NodeState::Compromised);

        let edges = engine.network().topology().edge_count();
        let obs = engine.reset(&mut rng);
        assert_eq!(obs.time, 0);
        assert_eq!(obs.compromised_count, 0);
        assert_eq!(engine.metrics(), &EngineMetrics::default());
        assert_eq!(engine.network().topology().edge_count(), edges);
    }
}
