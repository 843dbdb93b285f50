//! Core type definitions used throughout the codebase

use std::fmt;

use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Episode-scoped random number generator threaded through every component
pub type SimRng = ChaCha8Rng;

/// Simulation time step counter
pub type Tick = u64;

/// Unique identifier for network nodes (dense, `0..node_count`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Security state of a single network node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeState {
    Clean,
    Compromised,
    Honeypot,
    Patched,
    Isolated,
}

/// Which side of the engagement an action belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Attacker,
    Defender,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Attacker => write!(f, "attacker"),
            Role::Defender => write!(f, "defender"),
        }
    }
}

/// Every action either agent can take
///
/// Declaration order is the stable ordering used in histograms and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    // Attacker
    Scan,
    Exploit,
    Propagate,
    // Defender
    Monitor,
    Patch,
    Isolate,
    DeployHoneypot,
    AcpDeception,
    RestoreNode,
}

impl ActionType {
    pub const ATTACKER: [ActionType; 3] = [ActionType::Scan, ActionType::Exploit, ActionType::Propagate];

    pub const DEFENDER: [ActionType; 6] = [
        ActionType::Monitor,
        ActionType::Patch,
        ActionType::Isolate,
        ActionType::DeployHoneypot,
        ActionType::AcpDeception,
        ActionType::RestoreNode,
    ];

    /// Fixed resource cost charged against the acting agent's reward
    pub fn cost(self) -> f64 {
        match self {
            ActionType::Scan => 0.5,
            ActionType::Exploit => 2.0,
            ActionType::Propagate => 1.0,
            ActionType::Monitor => 0.1,
            ActionType::Patch => 1.5,
            ActionType::Isolate => 3.0,
            ActionType::DeployHoneypot => 2.0,
            ActionType::AcpDeception => 1.0,
            // Full system restore: the expensive reaction
            ActionType::RestoreNode => 6.0,
        }
    }

    pub fn role(self) -> Role {
        match self {
            ActionType::Scan | ActionType::Exploit | ActionType::Propagate => Role::Attacker,
            ActionType::Monitor
            | ActionType::Patch
            | ActionType::Isolate
            | ActionType::DeployHoneypot
            | ActionType::AcpDeception
            | ActionType::RestoreNode => Role::Defender,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ActionType::Scan => "SCAN",
            ActionType::Exploit => "EXPLOIT",
            ActionType::Propagate => "PROPAGATE",
            ActionType::Monitor => "MONITOR",
            ActionType::Patch => "PATCH",
            ActionType::Isolate => "ISOLATE",
            ActionType::DeployHoneypot => "DEPLOY_HONEYPOT",
            ActionType::AcpDeception => "ACP_DECEPTION",
            ActionType::RestoreNode => "RESTORE_NODE",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
