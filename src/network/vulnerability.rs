//! Per-node vulnerability assignment
//!
//! Statistical modes draw independently per node; topology-aware modes
//! (`Gradient`, `Inverse`) derive the score from the node's structural role
//! and fall back to 0.5 on flat topologies.

use rand::Rng;
use rand_distr::{Beta, Distribution, Exp, Normal};

use crate::core::config::VulnerabilityDistribution;
use crate::core::error::{AcpError, Result};
use crate::core::types::{NodeId, SimRng};
use crate::network::topology::{NodeProfile, Topology};

const CLIP_LOW: f64 = 0.1;
const CLIP_HIGH: f64 = 0.9;
const BASELINE: f64 = 0.5;

/// Samples vulnerability scores for one distribution
#[derive(Debug, Clone)]
pub struct VulnerabilitySampler {
    distribution: VulnerabilityDistribution,
    normal: Normal<f64>,
    exponential: Exp<f64>,
    beta: Beta<f64>,
}

impl VulnerabilitySampler {
    pub fn new(distribution: VulnerabilityDistribution) -> Result<Self> {
        Ok(Self {
            distribution,
            normal: Normal::new(0.5, 0.15).map_err(|e| AcpError::Distribution(e.to_string()))?,
            // Mean 0.3 -> rate 1/0.3
            exponential: Exp::new(1.0 / 0.3).map_err(|e| AcpError::Distribution(e.to_string()))?,
            beta: Beta::new(2.0, 5.0).map_err(|e| AcpError::Distribution(e.to_string()))?,
        })
    }

    pub fn distribution(&self) -> VulnerabilityDistribution {
        self.distribution
    }

    /// Score for a single node, always within [0, 1]
    pub fn sample(&self, topology: &Topology, node: NodeId, rng: &mut SimRng) -> f64 {
        let value = match self.distribution {
            VulnerabilityDistribution::Uniform => BASELINE,
            VulnerabilityDistribution::Normal => {
                self.normal.sample(rng).clamp(CLIP_LOW, CLIP_HIGH)
            }
            VulnerabilityDistribution::Exponential => {
                self.exponential.sample(rng).clamp(CLIP_LOW, CLIP_HIGH)
            }
            VulnerabilityDistribution::Bimodal => {
                if rng.gen::<f64>() < 0.5 {
                    rng.gen_range(0.1..0.3)
                } else {
                    rng.gen_range(0.7..0.9)
                }
            }
            VulnerabilityDistribution::Gradient => structural(topology, node, false),
            VulnerabilityDistribution::Inverse => structural(topology, node, true),
            VulnerabilityDistribution::Beta => self.beta.sample(rng),
        };
        value.clamp(0.0, 1.0)
    }

    /// Scores for every node, indexed by node id
    pub fn assign(&self, topology: &Topology, rng: &mut SimRng) -> Vec<f64> {
        topology.nodes().map(|node| self.sample(topology, node, rng)).collect()
    }
}

fn structural(topology: &Topology, node: NodeId, inverse: bool) -> f64 {
    match topology.profile(node) {
        // Hardened servers vs exposed endpoints, or the reverse for insiders
        NodeProfile::Hub => {
            if inverse {
                0.8
            } else {
                0.2
            }
        }
        NodeProfile::Peripheral => {
            if inverse {
                0.3
            } else {
                0.7
            }
        }
        NodeProfile::Level(level) => {
            let max_level = topology.max_level().unwrap_or(0).max(1);
            let depth = level as f64 / max_level as f64;
            if inverse {
                0.8 - depth * 0.6
            } else {
                0.3 + depth * 0.6
            }
        }
        NodeProfile::Flat => BASELINE,
    }
}
