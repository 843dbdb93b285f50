//! Simulated network: topology generation, vulnerability assignment, and
//! live node state.

pub mod environment;
pub mod topology;
pub mod vulnerability;

pub use environment::{Network, Node, Observation};
pub use topology::{calculate_metrics, generate_topology, NodeProfile, Topology, TopologyMetrics};
pub use vulnerability::VulnerabilitySampler;
