pub mod config;
pub mod error;
pub mod types;

pub use config::{
    ExperimentMode, SimulationConfig, SimulationConfigBuilder, TopologyKind,
    VulnerabilityDistribution,
};
pub use error::{AcpError, Result};
pub use types::{ActionType, NodeId, NodeState, Role, SimRng, Tick};
