//! Outcome values and reward formulas
//!
//! Both rewards start from the negated action cost. The attacker adds its
//! outcome value only when the action succeeded; the defender is paid for
//! every clean node, penalised for every compromised node, and earns a
//! per-action bonus on success.

use crate::core::types::ActionType;

// Attacker outcome values
pub const SCAN_VALUE: f64 = 2.0;
pub const EXPLOIT_VALUE: f64 = 10.0;
/// Learning signal for a failed exploit (never paid out as reward)
pub const EXPLOIT_FAILURE_VALUE: f64 = -1.0;
pub const PROPAGATE_VALUE: f64 = 5.0;
/// Chance a lateral move lands
pub const PROPAGATE_SUCCESS_RATE: f64 = 0.6;

// Defender shaping
pub const CLEAN_NODE_BONUS: f64 = 0.4;
pub const COMPROMISED_NODE_PENALTY: f64 = 2.0;
/// Paid per node successfully deceived
pub const DECEPTION_BONUS: f64 = 15.0;

/// What an attacker action produced
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AttackResult {
    pub success: bool,
    /// Outcome value fed to learning; only added to reward on success
    pub value: f64,
}

/// Attacker step reward
pub fn attacker_reward(action: ActionType, result: &AttackResult) -> f64 {
    let mut reward = -action.cost();
    if result.success {
        reward += result.value;
    }
    reward
}

/// Bonus a defender action earns when it succeeds
pub fn defender_success_bonus(action: ActionType, deceptions: usize) -> f64 {
    match action {
        ActionType::Patch => 4.0,
        ActionType::Isolate => 10.0,
        ActionType::DeployHoneypot => 5.0,
        ActionType::AcpDeception => DECEPTION_BONUS * deceptions as f64,
        ActionType::RestoreNode => 12.0,
        ActionType::Monitor => 1.0,
        ActionType::Scan | ActionType::Exploit | ActionType::Propagate => 0.0,
    }
}

/// Defender step reward, from the post-action node counts
pub fn defender_reward(
    action: ActionType,
    success: bool,
    deceptions: usize,
    clean: usize,
    compromised: usize,
) -> f64 {
    let mut reward = -action.cost();
    reward += clean as f64 * CLEAN_NODE_BONUS;
    if success {
        reward += defender_success_bonus(action, deceptions);
    }
    reward -= compromised as f64 * COMPROMISED_NODE_PENALTY;
    reward
}
