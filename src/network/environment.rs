//! Mutable per-episode network state layered over an immutable topology

use serde::{Deserialize, Serialize};

use crate::core::types::{NodeId, NodeState, SimRng, Tick};
use crate::network::topology::Topology;
use crate::network::vulnerability::VulnerabilitySampler;

/// A single host in the simulated network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub state: NodeState,
    vulnerability: f64,
}

impl Node {
    pub fn new(id: NodeId, vulnerability: f64) -> Self {
        Self {
            id,
            state: NodeState::Clean,
            vulnerability: vulnerability.clamp(0.0, 1.0),
        }
    }

    /// Probability an exploit attempt succeeds (0.0 to 1.0)
    pub fn vulnerability(&self) -> f64 {
        self.vulnerability
    }

    pub fn set_vulnerability(&mut self, value: f64) {
        self.vulnerability = value.clamp(0.0, 1.0);
    }
}

/// What both agents see at the start of a step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub num_nodes: usize,
    pub compromised_count: usize,
    pub clean_count: usize,
    /// Compromised fraction (0.0 to 1.0)
    pub alert_level: f64,
    /// Clean fraction (0.0 to 1.0)
    pub network_health: f64,
    pub time: Tick,
}

/// Topology plus live node states and vulnerabilities
#[derive(Debug, Clone)]
pub struct Network {
    topology: Topology,
    sampler: VulnerabilitySampler,
    nodes: Vec<Node>,
}

impl Network {
    /// Build a network with all nodes clean and freshly sampled vulnerabilities
    pub fn new(topology: Topology, sampler: VulnerabilitySampler, rng: &mut SimRng) -> Self {
        let mut network = Self {
            topology,
            sampler,
            nodes: Vec::new(),
        };
        network.reset(rng);
        network
    }

    /// Return every node to Clean with a fresh vulnerability draw
    pub fn reset(&mut self, rng: &mut SimRng) {
        let vulns = self.sampler.assign(&self.topology, rng);
        self.nodes = vulns
            .into_iter()
            .enumerate()
            .map(|(i, v)| Node::new(NodeId(i as u32), v))
            .collect();
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn replace_topology(&mut self, topology: Topology, rng: &mut SimRng) {
        self.topology = topology;
        self.reset(rng);
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index())
    }

    pub fn state(&self, id: NodeId) -> Option<NodeState> {
        self.node(id).map(|n| n.state)
    }

    pub fn set_state(&mut self, id: NodeId, state: NodeState) {
        if let Some(node) = self.node_mut(id) {
            node.state = state;
        }
    }

    /// Redraw one node's vulnerability from the configured distribution
    pub fn resample_vulnerability(&mut self, id: NodeId, rng: &mut SimRng) {
        if id.index() >= self.nodes.len() {
            return;
        }
        let value = self.sampler.sample(&self.topology, id, rng);
        self.nodes[id.index()].set_vulnerability(value);
    }

    /// Ids of all nodes in `state`, ascending
    pub fn nodes_in_state(&self, state: NodeState) -> Vec<NodeId> {
        self.nodes.iter().filter(|n| n.state == state).map(|n| n.id).collect()
    }

    pub fn count(&self, state: NodeState) -> usize {
        self.nodes.iter().filter(|n| n.state == state).count()
    }

    pub fn observe(&self, time: Tick) -> Observation {
        let total = self.nodes.len().max(1) as f64;
        let compromised_count = self.count(NodeState::Compromised);
        let clean_count = self.count(NodeState::Clean);
        Observation {
            num_nodes: self.nodes.len(),
            compromised_count,
            clean_count,
            alert_level: compromised_count as f64 / total,
            network_health: clean_count as f64 / total,
            time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{TopologyKind, VulnerabilityDistribution};
    use crate::network::topology::generate_topology;
    use rand::SeedableRng;

    fn network() -> (Network, SimRng) {
        let mut rng = SimRng::seed_from_u64(11);
        let topology = generate_topology(TopologyKind::ErdosRenyi, 15, 0.4, &mut rng);
        let sampler = VulnerabilitySampler::new(VulnerabilityDistribution::Beta).unwrap();
        (Network::new(topology, sampler, &mut rng), rng)
    }

    #[test]
    fn test_new_network_is_clean() {
        let (net, _) = network();
        assert_eq!(net.node_count(), 15);
        assert_eq!(net.count(NodeState::Clean), 15);
        let obs = net.observe(0);
        assert_eq!(obs.compromised_count, 0);
        assert_eq!(obs.network_health, 1.0);
    }

    #[test]
    fn test_vulnerability_is_clamped() {
        let mut node = Node::new(NodeId(0), 1.7);
        assert_eq!(node.vulnerability(), 1.0);
        node.set_vulnerability(-0.2);
        assert_eq!(node.vulnerability(), 0.0);
    }

    #[test]
    fn test_reset_restores_clean_state() {
        let (mut net, mut rng) = network();
        net.set_state(NodeId(3), NodeState::Compromised);
        net.set_state(NodeId(4), NodeState::Honeypot);
        assert_eq!(net.nodes_in_state(NodeState::Compromised), vec![NodeId(3)]);

        net.reset(&mut rng);
        assert_eq!(net.count(NodeState::Clean), 15);
    }

    #[test]
    fn test_observation_fractions() {
        let (mut net, _) = network();
        for id in 0..5 {
            net.set_state(NodeId(id), NodeState::Compromised);
        }
        let obs = net.observe(9);
        assert_eq!(obs.compromised_count, 5);
        assert_eq!(obs.clean_count, 10);
        assert!((obs.alert_level - 5.0 / 15.0).abs() < 1e-12);
        assert_eq!(obs.time, 9);
    }

    #[test]
    fn test_out_of_range_ids_are_ignored() {
        let (mut net, mut rng) = network();
        net.set_state(NodeId(99), NodeState::Compromised);
        net.resample_vulnerability(NodeId(99), &mut rng);
        assert_eq!(net.state(NodeId(99)), None);
        assert_eq!(net.count(NodeState::Compromised), 0);
    }
}
