//! Episode and experiment execution
//!
//! Episodes are independent: each owns its engine, attacker, defender and
//! RNG, seeded from the config's base seed plus the episode id. Experiments
//! fan episodes out over rayon and sort the results back into id order, so
//! output is identical regardless of worker count.

use std::collections::BTreeMap;

use rand::SeedableRng;
use rayon::prelude::*;

use crate::analysis::statistics::analyze;
use crate::attacker::memory::{AttackerParams, CognitiveAttacker};
use crate::core::config::{ExperimentMode, SimulationConfig};
use crate::core::error::Result;
use crate::core::types::{ActionType, NodeState, SimRng};
use crate::defender::{Defender, DefenderKind};
use crate::engine::episode::{EpisodeEngine, StepOutcome};
use crate::experiment::output::{EpisodeResult, ExperimentOutput};
use crate::network::topology::calculate_metrics;

/// Which (episode id, defender) pairs an experiment runs, in id order
pub fn episode_plan(config: &SimulationConfig) -> Vec<(u64, DefenderKind)> {
    match config.mode {
        ExperimentMode::Alternating => (0..config.num_episodes)
            .map(|id| {
                let kind = if id % 2 == 0 {
                    DefenderKind::OptimisticAcp
                } else {
                    DefenderKind::Pessimistic
                };
                (id, kind)
            })
            .collect(),
        ExperimentMode::Paired => (0..config.num_episodes)
            .flat_map(|id| [(id, DefenderKind::OptimisticAcp), (id, DefenderKind::Pessimistic)])
            .collect(),
    }
}

/// Both agents choose, then the engine resolves the step
fn play_step(
    engine: &mut EpisodeEngine,
    attacker: &mut CognitiveAttacker,
    defender: &mut dyn Defender,
    rng: &mut SimRng,
) -> Result<(ActionType, ActionType, StepOutcome)> {
    let observation = engine.observe();
    let attacker_action = attacker.select_action(engine.time(), rng);
    let defender_action = defender.select_action(&observation, attacker.known_nodes(), rng);
    let outcome = engine.step(attacker_action, defender_action, attacker, defender, rng)?;
    Ok((attacker_action, defender_action, outcome))
}

/// Play `steps` unrecorded steps, then start a fresh episode
///
/// The attacker keeps what it learned; the network, clock and metrics are
/// reset so the recorded episode gets its full time budget.
fn warm_up(
    engine: &mut EpisodeEngine,
    attacker: &mut CognitiveAttacker,
    defender: &mut dyn Defender,
    steps: u32,
    rng: &mut SimRng,
) -> Result<()> {
    if steps == 0 {
        return Ok(());
    }
    for _ in 0..steps {
        let (_, _, outcome) = play_step(engine, attacker, defender, rng)?;
        if outcome.done {
            engine.reset(rng);
        }
    }
    engine.reset(rng);
    tracing::trace!(steps, memory = attacker.memory().len(), "warmup complete");
    Ok(())
}

/// Run one episode against the given defender
pub fn run_single_episode(
    config: &SimulationConfig,
    episode_id: u64,
    kind: DefenderKind,
) -> Result<EpisodeResult> {
    let seed = config.episode_seed(episode_id);
    let mut rng = SimRng::seed_from_u64(seed);

    let mut engine = EpisodeEngine::new(config, &mut rng)?;
    let mut attacker = CognitiveAttacker::new(AttackerParams::from(config));
    let mut defender = kind.build(config);

    warm_up(
        &mut engine,
        &mut attacker,
        defender.as_mut(),
        config.warmup_steps,
        &mut rng,
    )?;

    let mut steps = 0u32;
    let mut total_reward = 0.0;
    let mut attacker_reward = 0.0;
    let mut deception_count = 0u32;
    let mut actions = Vec::new();
    let mut attacker_actions = Vec::new();
    let mut rewards_per_step = Vec::new();
    let mut confidence_trajectory = Vec::new();

    loop {
        let (attacker_action, defender_action, outcome) =
            play_step(&mut engine, &mut attacker, defender.as_mut(), &mut rng)?;
        steps += 1;

        total_reward += outcome.defender_reward;
        attacker_reward += outcome.attacker_reward;
        deception_count += outcome.defense.deceptions.len() as u32;
        actions.push(defender_action);
        attacker_actions.push(attacker_action);
        rewards_per_step.push(outcome.defender_reward);
        confidence_trajectory.push(attacker.overall_confidence());

        if outcome.done || steps > config.max_steps_per_episode {
            break;
        }
    }

    let mut action_counts: BTreeMap<ActionType, u32> = BTreeMap::new();
    for action in &actions {
        *action_counts.entry(*action).or_insert(0) += 1;
    }
    let restore_node_count = action_counts.get(&ActionType::RestoreNode).copied().unwrap_or(0);

    let network = engine.network();
    let final_compromised_ratio =
        network.count(NodeState::Compromised) as f64 / network.node_count().max(1) as f64;

    tracing::debug!(
        episode_id,
        defender = %kind,
        steps,
        total_reward,
        "episode finished"
    );

    Ok(EpisodeResult {
        episode_id,
        defender: kind,
        seed,
        total_reward,
        attacker_reward,
        steps,
        actions,
        attacker_actions,
        rewards_per_step,
        action_counts,
        final_attacker_confidence: attacker.overall_confidence(),
        attacker_confidence_trajectory: confidence_trajectory,
        deception_count,
        cognitive_latency_exploitations: engine.metrics().cognitive_latency_exploitations,
        restore_node_count,
        final_compromised_ratio,
        cognitive_latencies: engine.metrics().cognitive_latencies.clone(),
        topology_metrics: calculate_metrics(network.topology()),
    })
}

/// Run every planned episode and compare the two defenders
pub fn run_experiment(config: &SimulationConfig) -> Result<ExperimentOutput> {
    config.validate()?;
    let plan = episode_plan(config);

    tracing::info!(
        episodes = plan.len(),
        mode = ?config.mode,
        seed = config.random_seed,
        "starting experiment"
    );

    let run_all = || -> Result<Vec<EpisodeResult>> {
        plan.par_iter()
            .map(|&(id, kind)| run_single_episode(config, id, kind))
            .collect()
    };
    let mut results = match config.n_workers {
        Some(workers) => rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()?
            .install(run_all)?,
        None => run_all()?,
    };
    results.sort_by_key(|r| (r.episode_id, r.defender));

    let (acp_results, traditional_results): (Vec<_>, Vec<_>) = results
        .into_iter()
        .partition(|r| r.defender == DefenderKind::OptimisticAcp);

    let acp_rewards: Vec<f64> = acp_results.iter().map(|r| r.total_reward).collect();
    let trad_rewards: Vec<f64> = traditional_results.iter().map(|r| r.total_reward).collect();

    let statistics = if acp_rewards.len() >= 2 && trad_rewards.len() >= 2 {
        Some(analyze(
            &acp_rewards,
            &trad_rewards,
            config.confidence_level,
            config.bootstrap_samples,
            config.random_seed,
        )?)
    } else {
        tracing::warn!(
            acp = acp_rewards.len(),
            traditional = trad_rewards.len(),
            "too few episodes per defender for statistics"
        );
        None
    };

    let output = ExperimentOutput::new(config.clone(), acp_results, traditional_results, statistics);

    tracing::info!(
        acp_mean = output.acp.rewards.iter().sum::<f64>() / output.acp.episodes.max(1) as f64,
        traditional_mean =
            output.traditional.rewards.iter().sum::<f64>() / output.traditional.episodes.max(1) as f64,
        "experiment complete"
    );

    Ok(output)
}
