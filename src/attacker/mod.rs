//! Cognitive attacker built on instance-based learning

pub mod instance;
pub mod memory;

pub use instance::{Instance, LearningRecord, Situation};
pub use memory::{stable_softmax, AttackerParams, CognitiveAttacker};
