//! Network topology generation
//!
//! Produces connected undirected graphs in four families. Random families
//! are regenerated until connected; every family is bridged afterwards so
//! the result is always a single component.

use petgraph::algo::{connected_components, dijkstra};
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::unionfind::UnionFind;
use petgraph::visit::EdgeRef;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::config::TopologyKind;
use crate::core::types::{NodeId, SimRng};

/// Fraction of nodes designated as hubs in hub-spoke networks
pub const HUB_RATIO: f64 = 0.1;
pub const TREE_BRANCHING: u32 = 3;
pub const TREE_DEPTH: u32 = 3;
/// Cross-level shortcut edges attempted per node in hierarchical networks
pub const CROSS_EDGE_RATIO: f64 = 0.1;
/// Reject-and-retry cap for random families before falling back to bridging
pub const MAX_CONNECT_ATTEMPTS: u32 = 1000;

/// Structural role of a node, used by topology-aware vulnerability modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeProfile {
    Flat,
    Hub,
    Peripheral,
    /// BFS distance from the hierarchy root
    Level(u32),
}

/// Immutable connected network graph
#[derive(Debug, Clone)]
pub struct Topology {
    kind: TopologyKind,
    graph: UnGraph<NodeProfile, ()>,
}

impl Topology {
    pub fn kind(&self) -> TopologyKind {
        self.kind
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.graph.node_indices().map(|ix| NodeId(ix.index() as u32))
    }

    pub fn profile(&self, node: NodeId) -> NodeProfile {
        self.graph
            .node_weight(NodeIndex::new(node.index()))
            .copied()
            .unwrap_or(NodeProfile::Flat)
    }

    /// Neighbours in ascending id order
    pub fn neighbors(&self, node: NodeId) -> Vec<NodeId> {
        if node.index() >= self.node_count() {
            return Vec::new();
        }
        let mut out: Vec<NodeId> = self
            .graph
            .neighbors(NodeIndex::new(node.index()))
            .map(|ix| NodeId(ix.index() as u32))
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    pub fn degree(&self, node: NodeId) -> usize {
        self.neighbors(node).len()
    }

    pub fn has_edge(&self, a: NodeId, b: NodeId) -> bool {
        let n = self.node_count();
        a.index() < n
            && b.index() < n
            && self
                .graph
                .contains_edge(NodeIndex::new(a.index()), NodeIndex::new(b.index()))
    }

    pub fn is_connected(&self) -> bool {
        connected_components(&self.graph) <= 1
    }

    /// Deepest hierarchy level, if this is a hierarchical network
    pub fn max_level(&self) -> Option<u32> {
        self.graph
            .node_weights()
            .filter_map(|p| match p {
                NodeProfile::Level(l) => Some(*l),
                _ => None,
            })
            .max()
    }

    /// Hop distances from `source` to every node (None = unreachable)
    pub fn distances_from(&self, source: NodeId) -> Vec<Option<u32>> {
        hop_distances(&self.graph, source.index())
    }
}

/// Generate a connected topology of the requested family
pub fn generate_topology(
    kind: TopologyKind,
    num_nodes: usize,
    connectivity: f64,
    rng: &mut SimRng,
) -> Topology {
    let mut graph = match kind {
        TopologyKind::ErdosRenyi => {
            retry_until_connected(|rng| erdos_renyi(num_nodes, connectivity, rng), rng)
        }
        TopologyKind::BarabasiAlbert => {
            let m = ((num_nodes as f64 * connectivity / 10.0) as usize).max(1);
            retry_until_connected(|rng| barabasi_albert(num_nodes, m, rng), rng)
        }
        TopologyKind::HubSpoke => hub_spoke(num_nodes, connectivity, rng),
        TopologyKind::Hierarchical => hierarchical(num_nodes, rng),
    };

    bridge_components(&mut graph);

    tracing::trace!(
        ?kind,
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "generated topology"
    );

    Topology { kind, graph }
}

fn retry_until_connected(
    mut build: impl FnMut(&mut SimRng) -> UnGraph<NodeProfile, ()>,
    rng: &mut SimRng,
) -> UnGraph<NodeProfile, ()> {
    let mut graph = build(rng);
    let mut attempts = 1;
    while connected_components(&graph) > 1 && attempts < MAX_CONNECT_ATTEMPTS {
        graph = build(rng);
        attempts += 1;
    }
    if attempts > 1 {
        tracing::trace!(attempts, "regenerated random graph for connectivity");
    }
    graph
}

fn empty_graph(num_nodes: usize, profile: NodeProfile) -> UnGraph<NodeProfile, ()> {
    let mut graph = UnGraph::with_capacity(num_nodes, num_nodes * 2);
    for _ in 0..num_nodes {
        graph.add_node(profile);
    }
    graph
}

fn link(graph: &mut UnGraph<NodeProfile, ()>, a: usize, b: usize) {
    if a != b {
        graph.update_edge(NodeIndex::new(a), NodeIndex::new(b), ());
    }
}

fn erdos_renyi(num_nodes: usize, p: f64, rng: &mut SimRng) -> UnGraph<NodeProfile, ()> {
    let mut graph = empty_graph(num_nodes, NodeProfile::Flat);
    for i in 0..num_nodes {
        for j in (i + 1)..num_nodes {
            if rng.gen::<f64>() < p {
                link(&mut graph, i, j);
            }
        }
    }
    graph
}

/// Preferential attachment seeded with a star over the first `m + 1` nodes
fn barabasi_albert(num_nodes: usize, m: usize, rng: &mut SimRng) -> UnGraph<NodeProfile, ()> {
    let mut graph = empty_graph(num_nodes, NodeProfile::Flat);
    let m = m.min(num_nodes.saturating_sub(1)).max(1);

    let mut repeated: Vec<usize> = Vec::new();
    for leaf in 1..=m.min(num_nodes.saturating_sub(1)) {
        link(&mut graph, 0, leaf);
        repeated.push(0);
        repeated.push(leaf);
    }

    for source in (m + 1)..num_nodes {
        let mut targets: Vec<usize> = Vec::with_capacity(m);
        while targets.len() < m {
            let Some(&candidate) = repeated.choose(rng) else {
                break;
            };
            if !targets.contains(&candidate) {
                targets.push(candidate);
            }
        }
        for &target in &targets {
            link(&mut graph, source, target);
        }
        repeated.extend(targets.iter().copied());
        repeated.extend(std::iter::repeat(source).take(m));
    }
    graph
}

fn hub_spoke(num_nodes: usize, connectivity: f64, rng: &mut SimRng) -> UnGraph<NodeProfile, ()> {
    let num_hubs = ((num_nodes as f64 * HUB_RATIO) as usize).max(1).min(num_nodes);
    let mut graph = UnGraph::with_capacity(num_nodes, num_nodes * 3);
    for i in 0..num_nodes {
        graph.add_node(if i < num_hubs { NodeProfile::Hub } else { NodeProfile::Peripheral });
    }

    let hubs: Vec<usize> = (0..num_hubs).collect();
    let peripherals: Vec<usize> = (num_hubs..num_nodes).collect();

    // Fully connected hub core
    for (i, &a) in hubs.iter().enumerate() {
        for &b in &hubs[i + 1..] {
            link(&mut graph, a, b);
        }
    }

    // Each peripheral node hangs off one to three hubs
    for &node in &peripherals {
        let wanted = rng.gen_range(1..4usize).min(hubs.len());
        let chosen: Vec<usize> = hubs.choose_multiple(rng, wanted).copied().collect();
        for hub in chosen {
            link(&mut graph, node, hub);
        }
    }

    let extra_edges = (connectivity * peripherals.len() as f64 * 2.0) as usize;
    if peripherals.len() >= 2 {
        for _ in 0..extra_edges {
            let pair: Vec<usize> = peripherals.choose_multiple(rng, 2).copied().collect();
            if let [a, b] = pair[..] {
                link(&mut graph, a, b);
            }
        }
    }

    graph
}

fn hierarchical(num_nodes: usize, rng: &mut SimRng) -> UnGraph<NodeProfile, ()> {
    // Balanced tree in BFS labelling: children of i are b*i + 1 ..= b*i + b
    let b = TREE_BRANCHING as usize;
    let tree_nodes: usize = (0..TREE_DEPTH).map(|d| b.pow(d)).sum();

    let mut edges: Vec<(usize, usize)> = (1..tree_nodes).map(|child| ((child - 1) / b, child)).collect();
    let first_leaf = tree_nodes - b.pow(TREE_DEPTH - 1);
    let leaves: Vec<usize> = (first_leaf..tree_nodes).collect();

    let mut total = tree_nodes;
    if total < num_nodes {
        let to_add = (num_nodes - total).min(leaves.len() * b);
        for _ in 0..to_add {
            if let Some(&parent) = leaves.choose(rng) {
                edges.push((parent, total));
                total += 1;
            }
        }
    }

    let mut graph = empty_graph(total, NodeProfile::Level(0));
    for &(a, c) in &edges {
        link(&mut graph, a, c);
    }

    // Levels are fixed by the tree before shortcuts are added
    let levels = hop_distances(&graph, 0);
    for (ix, level) in levels.iter().enumerate() {
        if let Some(weight) = graph.node_weight_mut(NodeIndex::new(ix)) {
            *weight = NodeProfile::Level(level.unwrap_or(0));
        }
    }

    let cross_edges = ((total as f64 * CROSS_EDGE_RATIO) as usize).max(1);
    let all: Vec<usize> = (0..total).collect();
    for _ in 0..cross_edges {
        let pair: Vec<usize> = all.choose_multiple(rng, 2).copied().collect();
        if let [a, c] = pair[..] {
            if levels[a] != levels[c]
                && !graph.contains_edge(NodeIndex::new(a), NodeIndex::new(c))
            {
                link(&mut graph, a, c);
            }
        }
    }

    graph
}

/// Unit-weight shortest paths from `root`, indexed by node
fn hop_distances(graph: &UnGraph<NodeProfile, ()>, root: usize) -> Vec<Option<u32>> {
    let mut dist = vec![None; graph.node_count()];
    if root >= dist.len() {
        return dist;
    }
    for (node, d) in dijkstra(graph, NodeIndex::new(root), None, |_| 1u32) {
        dist[node.index()] = Some(d);
    }
    dist
}

/// Join consecutive components with one edge between their lowest ids
fn bridge_components(graph: &mut UnGraph<NodeProfile, ()>) {
    let n = graph.node_count();
    let mut sets = UnionFind::<usize>::new(n);
    for edge in graph.edge_references() {
        sets.union(edge.source().index(), edge.target().index());
    }

    // Ascending scan: the first node seen of each component is its lowest id
    let mut seen_roots = Vec::new();
    let mut representatives = Vec::new();
    for node in 0..n {
        let root = sets.find(node);
        if !seen_roots.contains(&root) {
            seen_roots.push(root);
            representatives.push(node);
        }
    }

    if representatives.len() > 1 {
        tracing::debug!(components = representatives.len(), "bridging disconnected topology");
    }
    for pair in representatives.windows(2) {
        link(graph, pair[0], pair[1]);
    }
}

/// Structural summary of a topology
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopologyMetrics {
    pub nodes: usize,
    pub edges: usize,
    pub density: f64,
    pub clustering_coefficient: f64,
    pub average_path_length: f64,
    pub diameter: u32,
    pub degree_centrality_max: f64,
    pub degree_centrality_mean: f64,
}

pub fn calculate_metrics(topology: &Topology) -> TopologyMetrics {
    let n = topology.node_count();
    let edges = topology.edge_count();
    let pairs = (n * n.saturating_sub(1)) as f64;
    let density = if pairs > 0.0 { 2.0 * edges as f64 / pairs } else { 0.0 };

    let neighbor_lists: Vec<Vec<NodeId>> = topology.nodes().map(|id| topology.neighbors(id)).collect();

    let mut clustering_sum = 0.0;
    for list in &neighbor_lists {
        let k = list.len();
        if k < 2 {
            continue;
        }
        let mut links = 0usize;
        for (i, &a) in list.iter().enumerate() {
            for &b in &list[i + 1..] {
                if topology.has_edge(a, b) {
                    links += 1;
                }
            }
        }
        clustering_sum += 2.0 * links as f64 / (k * (k - 1)) as f64;
    }
    let clustering_coefficient = if n > 0 { clustering_sum / n as f64 } else { 0.0 };

    let mut path_sum = 0u64;
    let mut path_count = 0u64;
    let mut diameter = 0u32;
    for source in topology.nodes() {
        for (target, dist) in topology.distances_from(source).into_iter().enumerate() {
            if let Some(d) = dist {
                if target != source.index() {
                    path_sum += d as u64;
                    path_count += 1;
                    diameter = diameter.max(d);
                }
            }
        }
    }
    let average_path_length = if path_count > 0 {
        path_sum as f64 / path_count as f64
    } else {
        0.0
    };

    let denom = n.saturating_sub(1).max(1) as f64;
    let centralities: Vec<f64> = neighbor_lists.iter().map(|l| l.len() as f64 / denom).collect();
    let degree_centrality_max = centralities.iter().copied().fold(0.0, f64::max);
    let degree_centrality_mean = if n > 0 {
        centralities.iter().sum::<f64>() / n as f64
    } else {
        0.0
    };

    TopologyMetrics {
        nodes: n,
        edges,
        density,
        clustering_coefficient,
        average_path_length,
        diameter,
        degree_centrality_max,
        degree_centrality_mean,
    }
}
