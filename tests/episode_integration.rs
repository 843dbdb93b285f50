//! Episode engine integration tests

use acp_sim::attacker::{AttackerParams, CognitiveAttacker, Situation};
use acp_sim::core::config::{SimulationConfig, TopologyKind, VulnerabilityDistribution};
use acp_sim::core::types::{ActionType, NodeState, SimRng};
use acp_sim::defender::{Defender, DefenderKind};
use acp_sim::engine::EpisodeEngine;
use acp_sim::experiment::run_single_episode;
use rand::SeedableRng;

fn scenario_config() -> SimulationConfig {
    SimulationConfig::builder()
        .num_nodes(20)
        .connectivity(0.6)
        .random_seed(42)
        .acp_strength(0.65)
        .build()
        .unwrap()
}

/// Drive the engine for `steps` protocol steps, starting a fresh episode
/// whenever one ends. Returns the defender actions taken.
fn drive(
    config: &SimulationConfig,
    kind: DefenderKind,
    steps: usize,
) -> (Vec<ActionType>, EpisodeEngine, CognitiveAttacker, Box<dyn Defender>) {
    let mut rng = SimRng::seed_from_u64(config.random_seed);
    let mut engine = EpisodeEngine::new(config, &mut rng).unwrap();
    let mut attacker = CognitiveAttacker::new(AttackerParams::from(config));
    let mut defender = kind.build(config);
    let mut actions = Vec::with_capacity(steps);

    for _ in 0..steps {
        if engine.is_terminated() {
            engine.reset(&mut rng);
        }
        let observation = engine.observe();
        let attacker_action = attacker.select_action(engine.time(), &mut rng);
        let defender_action = defender.select_action(&observation, attacker.known_nodes(), &mut rng);
        engine
            .step(attacker_action, defender_action, &mut attacker, defender.as_mut(), &mut rng)
            .unwrap();
        actions.push(defender_action);
    }

    (actions, engine, attacker, defender)
}

// ============================================================================
// Literal scenarios
// ============================================================================

#[test]
fn test_pessimistic_scenario_restore_band() {
    let config = scenario_config();
    let (actions, engine, _, _) = drive(&config, DefenderKind::Pessimistic, 60);

    let restores = actions.iter().filter(|&&a| a == ActionType::RestoreNode).count();
    let rate = restores as f64 / actions.len() as f64;
    assert!(
        (0.30..=0.55).contains(&rate),
        "RestoreNode frequency {:.3} outside calibration band",
        rate
    );
    assert!(engine.network().count(NodeState::Compromised) < 14);
}

#[test]
fn test_acp_scenario_scans_first_and_never_restores() {
    let config = scenario_config();
    let mut rng = SimRng::seed_from_u64(config.random_seed);
    let attacker = CognitiveAttacker::new(AttackerParams::from(&config));
    assert!(attacker.known_nodes().is_empty());
    assert_eq!(attacker.select_action(0, &mut rng), ActionType::Scan);

    let (actions, _, _, defender) = drive(&config, DefenderKind::OptimisticAcp, 60);
    assert_eq!(actions.len(), 60);
    assert!(!actions.contains(&ActionType::RestoreNode));
    assert!(!defender.state().action_history.contains(&ActionType::RestoreNode));
}

#[test]
fn test_poisoning_scenario_lowers_confidence() {
    let mut attacker = CognitiveAttacker::new(AttackerParams::default());
    let mut rng = SimRng::seed_from_u64(42);
    let situation = Situation {
        known_count: 0,
        compromised_count: 0,
        alert_permille: 0,
        time_bin: 0,
    };

    for t in 1..=5 {
        attacker.learn(situation, ActionType::Scan, 2.0, t, 1.0, &mut rng);
    }
    let after_fifth = attacker.overall_confidence();
    for t in 6..=10 {
        attacker.learn(situation, ActionType::Scan, 2.0, t, 0.3, &mut rng);
    }
    assert!(attacker.overall_confidence() < after_fifth);
}

// ============================================================================
// Invariants over full episodes
// ============================================================================

#[test]
fn test_episode_determinism() {
    let config = scenario_config();
    for id in 0..4 {
        for kind in [DefenderKind::OptimisticAcp, DefenderKind::Pessimistic] {
            let first = run_single_episode(&config, id, kind).unwrap();
            let second = run_single_episode(&config, id, kind).unwrap();
            assert_eq!(first.rewards_per_step, second.rewards_per_step);
            assert_eq!(first.action_counts, second.action_counts);
            assert_eq!(first.final_attacker_confidence, second.final_attacker_confidence);
        }
    }
}

#[test]
fn test_acp_never_restores_across_configurations() {
    let topologies = [
        TopologyKind::ErdosRenyi,
        TopologyKind::BarabasiAlbert,
        TopologyKind::HubSpoke,
        TopologyKind::Hierarchical,
    ];
    for (i, topology) in topologies.into_iter().enumerate() {
        let config = SimulationConfig::builder()
            .num_nodes(25)
            .topology_type(topology)
            .vulnerability_distribution(VulnerabilityDistribution::Bimodal)
            .acp_strength(0.3 + 0.2 * i as f64)
            .build()
            .unwrap();
        for id in 0..3 {
            let result = run_single_episode(&config, id, DefenderKind::OptimisticAcp).unwrap();
            assert_eq!(result.restore_node_count, 0);
        }
    }
}

#[test]
fn test_discovery_is_monotonic_and_state_bounded() {
    let config = SimulationConfig::builder()
        .num_nodes(30)
        .vulnerability_distribution(VulnerabilityDistribution::Normal)
        .build()
        .unwrap();
    let mut rng = SimRng::seed_from_u64(7);
    let mut engine = EpisodeEngine::new(&config, &mut rng).unwrap();
    let mut attacker = CognitiveAttacker::new(AttackerParams::from(&config));
    let mut defender = DefenderKind::OptimisticAcp.build(&config);

    let mut known = 0;
    loop {
        let observation = engine.observe();
        let a = attacker.select_action(engine.time(), &mut rng);
        let d = defender.select_action(&observation, attacker.known_nodes(), &mut rng);
        let outcome = engine
            .step(a, d, &mut attacker, defender.as_mut(), &mut rng)
            .unwrap();

        assert!(attacker.known_nodes().len() >= known);
        known = attacker.known_nodes().len();
        for node in engine.network().nodes() {
            assert!((0.0..=1.0).contains(&node.vulnerability()));
        }
        assert!((0.0..=1.0).contains(&attacker.overall_confidence()));
        assert!(attacker.memory().len() <= 150);

        if outcome.done {
            break;
        }
    }
}

#[test]
fn test_episodes_terminate_within_step_bound() {
    let config = SimulationConfig::builder()
        .num_nodes(12)
        .max_steps_per_episode(20)
        .vulnerability_distribution(VulnerabilityDistribution::Bimodal)
        .build()
        .unwrap();
    for id in 0..10 {
        for kind in [DefenderKind::OptimisticAcp, DefenderKind::Pessimistic] {
            let result = run_single_episode(&config, id, kind).unwrap();
            assert!(result.steps <= config.max_steps_per_episode + 1);
        }
    }
}

#[test]
fn test_regenerated_topology_changes_between_resets() {
    let config = SimulationConfig::builder()
        .num_nodes(30)
        .connectivity(0.3)
        .regenerate_topology(true)
        .build()
        .unwrap();
    let mut rng = SimRng::seed_from_u64(3);
    let mut engine = EpisodeEngine::new(&config, &mut rng).unwrap();

    let mut edge_counts = vec![engine.network().topology().edge_count()];
    for _ in 0..5 {
        engine.reset(&mut rng);
        assert!(engine.network().topology().is_connected());
        edge_counts.push(engine.network().topology().edge_count());
    }
    edge_counts.dedup();
    assert!(edge_counts.len() > 1);
}
