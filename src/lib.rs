//! ACP Sim - cognitive attacker vs pessimistic and deceptive defenders

pub mod analysis;
pub mod attacker;
pub mod core;
pub mod defender;
pub mod engine;
pub mod experiment;
pub mod network;
