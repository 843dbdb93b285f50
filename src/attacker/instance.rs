use serde::{Deserialize, Serialize};

use crate::core::types::{ActionType, Tick};

/// Coarse encoding of the world as the attacker saw it before acting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Situation {
    pub known_count: u32,
    pub compromised_count: u32,
    /// Alert level in thousandths
    pub alert_permille: u32,
    /// Ten-step time bucket
    pub time_bin: u64,
}

/// One past experience in the attacker's memory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub situation: Situation,
    pub action: ActionType,
    pub outcome: f64,
    pub timestamp: Tick,
    /// How much the attacker trusts this memory (0.0 to 1.0)
    pub confidence: f64,
    /// Formed in a step where deception landed
    #[serde(default)]
    pub poisoned: bool,
}

impl Instance {
    pub fn new(
        situation: Situation,
        action: ActionType,
        outcome: f64,
        timestamp: Tick,
        confidence: f64,
    ) -> Self {
        Self {
            situation,
            action,
            outcome,
            timestamp,
            confidence: confidence.clamp(0.0, 1.0),
            poisoned: false,
        }
    }

    pub fn with_poisoned(mut self, poisoned: bool) -> Self {
        self.poisoned = poisoned;
        self
    }

    /// Memory formed in a step where deception landed
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }
}

/// Audit trail entry for every `learn` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningRecord {
    pub timestamp: Tick,
    pub action: ActionType,
    pub outcome: f64,
    pub confidence: f64,
}
