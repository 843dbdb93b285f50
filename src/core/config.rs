//! Simulation configuration with documented constants
//!
//! A `SimulationConfig` is built once (from defaults, the builder, or a TOML
//! file), validated, and then shared read-only by every episode. Invalid
//! parameter ranges are rejected here rather than discovered mid-episode.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::{AcpError, Result};

/// How per-node vulnerability scores are drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VulnerabilityDistribution {
    /// Every node gets the same 0.5 score
    Uniform,
    /// N(0.5, 0.15) clipped to [0.1, 0.9]
    Normal,
    /// Exp(mean 0.3) clipped to [0.1, 0.9]
    Exponential,
    /// Half the nodes hardened, half exposed
    Bimodal,
    /// Hubs / core hardened, periphery exposed
    Gradient,
    /// Hubs / core exposed (insider-threat model)
    Inverse,
    /// Beta(2, 5): mostly low scores with a long exposed tail
    Beta,
}

/// Network topology family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopologyKind {
    ErdosRenyi,
    BarabasiAlbert,
    HubSpoke,
    Hierarchical,
}

/// How episodes are assigned to the two defender variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperimentMode {
    /// Even episode ids face the ACP defender, odd ids the pessimistic one
    Alternating,
    /// Every episode id is run against both defenders with the same seed
    /// (common random numbers)
    Paired,
}

/// Configuration for an ACP experiment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    // === EXPERIMENT ===
    /// Number of episode ids to run
    ///
    /// In `Alternating` mode each id is one episode; in `Paired` mode each id
    /// yields one ACP and one pessimistic episode.
    pub num_episodes: u64,

    pub mode: ExperimentMode,

    /// Master seed. Episode `i` is seeded with `random_seed + i`.
    pub random_seed: u64,

    /// Worker threads for episode fan-out (None = rayon's global pool)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n_workers: Option<usize>,

    // === NETWORK ===
    /// Node count requested from the topology generator (minimum 10)
    ///
    /// The hierarchical generator may produce a different count.
    pub num_nodes: u32,

    /// Edge probability (Erdős–Rényi) or density knob for the other families
    pub connectivity: f64,

    pub topology_type: TopologyKind,

    pub vulnerability_distribution: VulnerabilityDistribution,

    /// Build a fresh topology on every engine reset instead of reusing it
    pub regenerate_topology: bool,

    // === ATTACKER COGNITION ===
    /// IBL power-law decay exponent `d` in `ln(Δt^-d)`
    pub decay_rate: f64,

    /// Activation noise scale σ
    pub noise: f64,

    /// Multiplier applied to learning confidence before storage
    ///
    /// Values above 1.0 make the attacker trust its experience more; the
    /// product is clamped to [0, 1].
    pub learning_rate: f64,

    /// Attacker cognitive processing delay range, sampled uniformly per step
    ///
    /// Recorded for analysis only; it never gates control flow.
    pub latency_window: (f64, f64),

    // === DEFENDER ===
    /// Per-target probability that an ACP deception lands
    pub acp_strength: f64,

    // === EPISODE ===
    /// Step cap enforced by the episode loop (the engine has its own
    /// time-based termination)
    pub max_steps_per_episode: u32,

    /// Protocol steps run and discarded before recording starts
    pub warmup_steps: u32,

    // === STATISTICS ===
    /// Two-sided confidence level: 0.90, 0.95 or 0.99
    pub confidence_level: f64,

    /// Bootstrap resamples for percentile intervals (minimum 100)
    pub bootstrap_samples: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            num_episodes: 1000,
            mode: ExperimentMode::Alternating,
            random_seed: 42,
            n_workers: None,

            num_nodes: 50,
            connectivity: 0.6,
            topology_type: TopologyKind::ErdosRenyi,
            vulnerability_distribution: VulnerabilityDistribution::Beta,
            regenerate_topology: false,

            decay_rate: 0.8,
            noise: 0.1,
            learning_rate: 1.0,
            latency_window: (0.3, 0.8),

            acp_strength: 0.65,

            max_steps_per_episode: 60,
            warmup_steps: 0,

            confidence_level: 0.95,
            bootstrap_samples: 10_000,
        }
    }
}

const ALLOWED_CONFIDENCE_LEVELS: [f64; 3] = [0.90, 0.95, 0.99];

impl SimulationConfig {
    /// Start a builder from the default configuration
    pub fn builder() -> SimulationConfigBuilder {
        SimulationConfigBuilder {
            config: Self::default(),
        }
    }

    /// Validate configuration for range and internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.num_episodes < 1 {
            return Err(invalid("num_episodes must be at least 1"));
        }
        if self.num_nodes < 10 {
            return Err(invalid(format!("num_nodes must be at least 10 (got {})", self.num_nodes)));
        }
        if !(0.0..=1.0).contains(&self.connectivity) {
            return Err(invalid(format!(
                "connectivity must be between 0.0 and 1.0 (got {})",
                self.connectivity
            )));
        }
        if !(0.0..=1.0).contains(&self.acp_strength) {
            return Err(invalid(format!(
                "acp_strength must be between 0.0 and 1.0 (got {})",
                self.acp_strength
            )));
        }
        if !(self.decay_rate.is_finite() && self.decay_rate > 0.0) {
            return Err(invalid("decay_rate must be positive"));
        }
        if !(self.noise.is_finite() && self.noise >= 0.0) {
            return Err(invalid("noise must be non-negative"));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(invalid("learning_rate must be positive"));
        }

        let (lo, hi) = self.latency_window;
        if !(lo.is_finite() && hi.is_finite()) || lo < 0.0 || lo > hi {
            return Err(invalid(format!(
                "latency_window must satisfy 0 <= min <= max (got ({}, {}))",
                lo, hi
            )));
        }

        if self.max_steps_per_episode < 1 {
            return Err(invalid("max_steps_per_episode must be at least 1"));
        }
        if !ALLOWED_CONFIDENCE_LEVELS
            .iter()
            .any(|level| (level - self.confidence_level).abs() < 1e-9)
        {
            return Err(invalid("confidence_level must be 0.90, 0.95, or 0.99"));
        }
        if self.bootstrap_samples < 100 {
            return Err(invalid("bootstrap_samples must be at least 100"));
        }
        if self.n_workers == Some(0) {
            return Err(invalid("n_workers must be at least 1 when set"));
        }

        Ok(())
    }

    /// Deterministic seed for one episode
    pub fn episode_seed(&self, episode_id: u64) -> u64 {
        self.random_seed.wrapping_add(episode_id)
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> AcpError {
    AcpError::InvalidConfig(message.into())
}

/// Fluent construction of a validated `SimulationConfig`
#[derive(Debug, Clone)]
pub struct SimulationConfigBuilder {
    config: SimulationConfig,
}

impl SimulationConfigBuilder {
    pub fn num_episodes(mut self, value: u64) -> Self {
        self.config.num_episodes = value;
        self
    }

    pub fn mode(mut self, value: ExperimentMode) -> Self {
        self.config.mode = value;
        self
    }

    pub fn random_seed(mut self, value: u64) -> Self {
        self.config.random_seed = value;
        self
    }

    pub fn n_workers(mut self, value: usize) -> Self {
        self.config.n_workers = Some(value);
        self
    }

    pub fn num_nodes(mut self, value: u32) -> Self {
        self.config.num_nodes = value;
        self
    }

    pub fn connectivity(mut self, value: f64) -> Self {
        self.config.connectivity = value;
        self
    }

    pub fn topology_type(mut self, value: TopologyKind) -> Self {
        self.config.topology_type = value;
        self
    }

    pub fn vulnerability_distribution(mut self, value: VulnerabilityDistribution) -> Self {
        self.config.vulnerability_distribution = value;
        self
    }

    pub fn regenerate_topology(mut self, value: bool) -> Self {
        self.config.regenerate_topology = value;
        self
    }

    pub fn decay_rate(mut self, value: f64) -> Self {
        self.config.decay_rate = value;
        self
    }

    pub fn noise(mut self, value: f64) -> Self {
        self.config.noise = value;
        self
    }

    pub fn learning_rate(mut self, value: f64) -> Self {
        self.config.learning_rate = value;
        self
    }

    pub fn latency_window(mut self, min: f64, max: f64) -> Self {
        self.config.latency_window = (min, max);
        self
    }

    pub fn acp_strength(mut self, value: f64) -> Self {
        self.config.acp_strength = value;
        self
    }

    pub fn max_steps_per_episode(mut self, value: u32) -> Self {
        self.config.max_steps_per_episode = value;
        self
    }

    pub fn warmup_steps(mut self, value: u32) -> Self {
        self.config.warmup_steps = value;
        self
    }

    pub fn confidence_level(mut self, value: f64) -> Self {
        self.config.confidence_level = value;
        self
    }

    pub fn bootstrap_samples(mut self, value: u32) -> Self {
        self.config.bootstrap_samples = value;
        self
    }

    pub fn build(self) -> Result<SimulationConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
