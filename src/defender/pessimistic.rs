//! Worst-case reactive defender
//!
//! Assumes every anomaly is a full breach. The calibrated action mix puts
//! 41.85% of decisions on `RestoreNode`, the most expensive response.

use std::collections::{BTreeMap, BTreeSet};

use rand::Rng;

use crate::core::types::{ActionType, NodeId, SimRng, Tick};
use crate::defender::{DeceptionRecord, Defender, DefenderKind, DefenderState};
use crate::network::environment::Observation;

/// Share of decisions spent on full restores
pub const RESTORE_RATE: f64 = 0.4185;
/// Share of the remaining mass spent on isolation
pub const ISOLATE_SHARE: f64 = 0.30;
/// Cumulative share of the remaining mass covered by isolation plus patching
pub const PATCH_CUMULATIVE_SHARE: f64 = 0.70;

#[derive(Debug, Clone, Default)]
pub struct PessimisticDefender {
    state: DefenderState,
}

impl PessimisticDefender {
    pub fn new() -> Self {
        Self::default()
    }

    fn choose(observation: &Observation, roll: f64) -> ActionType {
        if roll < RESTORE_RATE {
            ActionType::RestoreNode
        } else if roll < RESTORE_RATE + ISOLATE_SHARE * (1.0 - RESTORE_RATE) {
            if observation.compromised_count > 0 {
                ActionType::Isolate
            } else {
                ActionType::Patch
            }
        } else if roll < RESTORE_RATE + PATCH_CUMULATIVE_SHARE * (1.0 - RESTORE_RATE) {
            ActionType::Patch
        } else {
            ActionType::Monitor
        }
    }
}

impl Defender for PessimisticDefender {
    fn kind(&self) -> DefenderKind {
        DefenderKind::Pessimistic
    }

    fn select_action(
        &mut self,
        observation: &Observation,
        _attacker_known: &BTreeSet<NodeId>,
        rng: &mut SimRng,
    ) -> ActionType {
        let action = Self::choose(observation, rng.gen::<f64>());
        self.state.record_action(action);
        action
    }

    fn deploy_acp_deception(
        &mut self,
        _targets: &[NodeId],
        _now: Tick,
        _attacker_known: &BTreeSet<NodeId>,
        _rng: &mut SimRng,
    ) -> BTreeMap<NodeId, DeceptionRecord> {
        BTreeMap::new()
    }

    fn state(&self) -> &DefenderState {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn observation(compromised: usize) -> Observation {
        Observation {
            num_nodes: 20,
            compromised_count: compromised,
            clean_count: 20 - compromised,
            alert_level: compromised as f64 / 20.0,
            network_health: (20 - compromised) as f64 / 20.0,
            time: 1,
        }
    }

    #[test]
    fn test_threshold_bands() {
        let busy = observation(3);
        assert_eq!(PessimisticDefender::choose(&busy, 0.0), ActionType::RestoreNode);
        assert_eq!(PessimisticDefender::choose(&busy, 0.418), ActionType::RestoreNode);
        assert_eq!(PessimisticDefender::choose(&busy, 0.42), ActionType::Isolate);
        // 0.4185 + 0.3 * 0.5815 = 0.59295
        assert_eq!(PessimisticDefender::choose(&busy, 0.592), ActionType::Isolate);
        assert_eq!(PessimisticDefender::choose(&busy, 0.594), ActionType::Patch);
        // 0.4185 + 0.7 * 0.5815 = 0.82555
        assert_eq!(PessimisticDefender::choose(&busy, 0.825), ActionType::Patch);
        assert_eq!(PessimisticDefender::choose(&busy, 0.826), ActionType::Monitor);
    }

    #[test]
    fn test_isolate_falls_back_to_patch_when_quiet() {
        assert_eq!(PessimisticDefender::choose(&observation(0), 0.5), ActionType::Patch);
    }

    #[test]
    fn test_restore_rate_matches_calibration() {
        let mut defender = PessimisticDefender::new();
        let mut rng = SimRng::seed_from_u64(42);
        let known = BTreeSet::new();
        for _ in 0..5000 {
            let action = defender.select_action(&observation(2), &known, &mut rng);
            assert_ne!(action, ActionType::AcpDeception);
        }
        let restore = defender.action_distribution()[&ActionType::RestoreNode];
        assert!((restore - RESTORE_RATE).abs() < 0.03, "restore rate {}", restore);
        assert_eq!(defender.state().action_history.len(), 5000);
    }

    #[test]
    fn test_never_deceives() {
        let mut defender = PessimisticDefender::new();
        let mut rng = SimRng::seed_from_u64(1);
        let records =
            defender.deploy_acp_deception(&[NodeId(1), NodeId(2)], 3, &BTreeSet::new(), &mut rng);
        assert!(records.is_empty());
        assert_eq!(defender.state().deception_attempts, 0);
    }
}
