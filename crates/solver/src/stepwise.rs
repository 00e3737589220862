use crate::{
    reliability_profile, run_forked, run_search, score_state, spread_seed, status_for_completion,
    CandidateMacro, SolveStatus, SolverConfig, SolverError,
};
use craftplan_core::{
    ActionCatalog, ActionId, CompletionState, CraftState, LiveRandom, Recipe, Simulator,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Replanning driver: solve, commit only the recommended first action to
/// the live random simulator, and plan again from the realized outcome.
pub fn solve_stepwise(
    catalog: &ActionCatalog,
    recipe: &Recipe,
    start: &CraftState,
    config: &SolverConfig,
    forked: bool,
    cancel: &AtomicBool,
) -> Result<CandidateMacro, SolverError> {
    let started = Instant::now();
    let mut live = Simulator::new(
        catalog,
        *recipe,
        config.max_step_count,
        LiveRandom::from_seed(spread_seed(config.seed, 0x51E9)),
    );
    let mut state = start.clone();
    let mut committed: Vec<ActionId> = Vec::new();
    let mut simulations = 0u64;
    let mut status = None;

    while state.completion(recipe, config.max_step_count) == CompletionState::Incomplete {
        if cancel.load(Ordering::Relaxed) {
            status = Some(SolveStatus::Cancelled);
            break;
        }
        let action = if forked {
            let outcome = run_forked(catalog, recipe, &state, config, cancel);
            simulations += outcome.simulations;
            if outcome.cancelled {
                status = Some(SolveStatus::Cancelled);
            }
            outcome.chosen
        } else {
            let outcome = run_search(
                catalog,
                *recipe,
                &state,
                config,
                spread_seed(config.seed, 0x57E9 ^ state.step as u64),
                config.iterations,
                config.max_iterations,
                cancel,
            );
            simulations += outcome.simulations as u64;
            if outcome.cancelled {
                status = Some(SolveStatus::Cancelled);
            }
            outcome.best_root_action()
        };
        let Some(action) = action else {
            status.get_or_insert(SolveStatus::NoMoreActions);
            break;
        };
        let (next, _) = live.apply(&state, action);
        committed.push(action);
        state = next;
        if status.is_some() {
            break;
        }
    }

    let completion = state.completion(recipe, config.max_step_count);
    let status = status.unwrap_or_else(|| status_for_completion(completion));
    let completion = if status == SolveStatus::NoMoreActions {
        CompletionState::NoMoreActions
    } else {
        completion
    };
    let reliability = reliability_profile(
        catalog,
        recipe,
        start,
        &committed,
        config.max_step_count,
        config.seed,
        config.reliability_trials,
    );
    Ok(CandidateMacro {
        status,
        actions: committed,
        end_state: state,
        completion,
        reliability,
        simulations,
        wall_time_ms: started.elapsed().as_millis() as u64,
    })
}

#[derive(Debug, Clone)]
struct Lineage {
    state: CraftState,
    score: f64,
}

/// Beam search layered over forked MCTS: each surviving lineage expands one
/// step through its own fork set, then the beam is pruned back to the
/// configured width. The emitted macro follows the lineage that survives to
/// completion.
pub fn solve_genetic(
    catalog: &ActionCatalog,
    recipe: &Recipe,
    start: &CraftState,
    config: &SolverConfig,
    cancel: &AtomicBool,
) -> Result<CandidateMacro, SolverError> {
    let started = Instant::now();
    let root_history = start.history.len();
    let beam = config.furcated_action_count as usize;
    let mut lineages = vec![Lineage {
        score: score_state(start, recipe, config.max_step_count, &config.weights),
        state: start.clone(),
    }];
    let mut simulations = 0u64;
    let mut status = None;

    for round in 0..config.max_step_count {
        if cancel.load(Ordering::Relaxed) {
            status = Some(SolveStatus::Cancelled);
            break;
        }
        if lineages.iter().any(|lineage| {
            lineage.state.completion(recipe, config.max_step_count)
                == CompletionState::ProgressComplete
        }) {
            break;
        }

        let mut children: Vec<Lineage> = Vec::new();
        for (lineage_idx, lineage) in lineages.iter().enumerate() {
            if lineage
                .state
                .completion(recipe, config.max_step_count)
                .is_terminal()
            {
                continue;
            }
            let outcome = run_forked(catalog, recipe, &lineage.state, config, cancel);
            simulations += outcome.simulations;
            if outcome.cancelled {
                status = Some(SolveStatus::Cancelled);
            }

            let mut ranked = outcome.merged;
            ranked.sort_by(|a, b| {
                b.1.max_score
                    .total_cmp(&a.1.max_score)
                    .then_with(|| b.1.visits.cmp(&a.1.visits))
                    .then_with(|| a.0.catalog_index().cmp(&b.0.catalog_index()))
            });
            for (action, _) in ranked.into_iter().take(beam) {
                let lane = spread_seed(
                    config.seed,
                    (round as u64) << 32 | (lineage_idx as u64) << 8 | action.catalog_index() as u64,
                );
                let mut sim = Simulator::new(
                    catalog,
                    *recipe,
                    config.max_step_count,
                    LiveRandom::from_seed(lane),
                );
                let (next, _) = sim.apply(&lineage.state, action);
                children.push(Lineage {
                    score: score_state(&next, recipe, config.max_step_count, &config.weights),
                    state: next,
                });
            }
        }
        if status.is_some() {
            break;
        }
        if children.is_empty() {
            status = Some(SolveStatus::NoMoreActions);
            break;
        }
        children.sort_by(|a, b| b.score.total_cmp(&a.score));
        children.truncate(beam.max(1));
        lineages = children;
    }

    let winner = lineages
        .into_iter()
        .max_by(|a, b| a.score.total_cmp(&b.score))
        .unwrap_or_else(|| Lineage {
            score: score_state(start, recipe, config.max_step_count, &config.weights),
            state: start.clone(),
        });
    let actions = winner.state.history[root_history..].to_vec();
    let completion = winner.state.completion(recipe, config.max_step_count);
    let status = status.unwrap_or_else(|| status_for_completion(completion));
    let reliability = reliability_profile(
        catalog,
        recipe,
        start,
        &actions,
        config.max_step_count,
        config.seed,
        config.reliability_trials,
    );
    Ok(CandidateMacro {
        status,
        actions,
        end_state: winner.state,
        completion,
        reliability,
        simulations,
        wall_time_ms: started.elapsed().as_millis() as u64,
    })
}
