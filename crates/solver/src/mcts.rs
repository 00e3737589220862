use crate::{
    reliability_profile, score_state, status_for_completion, CandidateMacro, RootScores,
    SearchTree, SolveStatus, SolverConfig, SolverError,
};
use craftplan_core::{
    ActionCatalog, ActionCategory, ActionDefinition, ActionId, CompletionState, CraftState,
    LiveRandom, Recipe, RngState, Simulator,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Result of one independent search tree. Forks return these over a channel
/// and never share mutable state.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub root_scores: Vec<(ActionId, RootScores)>,
    pub best_actions: Vec<ActionId>,
    pub best_state: Option<CraftState>,
    pub best_score: f64,
    pub simulations: u32,
    pub found_complete: bool,
    pub cancelled: bool,
}

impl SearchOutcome {
    /// Best first action by max score, then visits, then catalog order.
    pub fn best_root_action(&self) -> Option<ActionId> {
        let mut best: Option<(ActionId, &RootScores)> = None;
        for (action, scores) in &self.root_scores {
            let better = match best {
                None => true,
                Some((_, current)) => {
                    scores.max_score > current.max_score
                        || (scores.max_score == current.max_score
                            && scores.visits > current.visits)
                }
            };
            if better {
                best = Some((*action, scores));
            }
        }
        best.map(|(action, _)| action)
    }
}

/// One select/expand/rollout/backpropagate loop over a private tree. Runs
/// `iterations` iterations, extending toward `hard_cap` while no completing
/// playout has been found.
pub fn run_search(
    catalog: &ActionCatalog,
    recipe: Recipe,
    root: &CraftState,
    config: &SolverConfig,
    seed: u64,
    iterations: u32,
    hard_cap: u32,
    cancel: &AtomicBool,
) -> SearchOutcome {
    let mut sim = Simulator::new(
        catalog,
        recipe,
        config.max_step_count,
        LiveRandom::from_seed(seed),
    );
    let mut rng = RngState::from_seed(seed ^ 0xA5A5_5A5A_0F0F_F0F0);
    let root_history = root.history.len();
    let hard_cap = hard_cap.max(iterations);

    let root_terminal = root.completion(&recipe, config.max_step_count).is_terminal();
    let root_untried = if root_terminal {
        Vec::new()
    } else {
        expansion_actions(&sim, root, config)
    };
    let root_dead = root_terminal || root_untried.is_empty();
    let mut tree = SearchTree::new(root.clone(), root_untried, root_dead);

    let mut best_score = f64::NEG_INFINITY;
    let mut best_state: Option<CraftState> = None;
    let mut found_complete = false;
    let mut cancelled = false;
    let mut simulations = 0u32;

    while !root_dead && (simulations < iterations || (!found_complete && simulations < hard_cap)) {
        if cancel.load(Ordering::Relaxed) {
            cancelled = true;
            break;
        }

        let mut idx = 0usize;
        loop {
            if tree.nodes[idx].terminal {
                break;
            }
            if !tree.nodes[idx].untried.is_empty() {
                let pick = rng.next_below(tree.nodes[idx].untried.len().min(3));
                let action = tree.nodes[idx].untried.remove(pick);
                let parent_state = tree.nodes[idx].state.clone();
                let parent_depth = tree.nodes[idx].depth;
                let (child_state, _) = sim.apply(&parent_state, action);
                let capped = child_state
                    .completion(&recipe, config.max_step_count)
                    .is_terminal()
                    || parent_depth + 1 >= config.max_rollout_steps;
                let untried = if capped {
                    Vec::new()
                } else {
                    expansion_actions(&sim, &child_state, config)
                };
                let terminal = capped || untried.is_empty();
                idx = tree.add_child(idx, action, child_state, untried, terminal);
                break;
            }
            match tree.select_child(
                idx,
                config.max_score_weighting_constant,
                config.exploration_constant,
            ) {
                Some(next) => idx = next,
                None => {
                    tree.nodes[idx].terminal = true;
                    break;
                }
            }
        }

        let leaf_state = tree.nodes[idx].state.clone();
        let leaf_depth = tree.nodes[idx].depth;
        let (score, final_state) = rollout(&mut sim, &mut rng, leaf_state, leaf_depth, config);
        if score > best_score {
            best_score = score;
            found_complete = final_state.completion(&recipe, config.max_step_count)
                == CompletionState::ProgressComplete;
            best_state = Some(final_state);
        }
        tree.backpropagate(idx, score);
        simulations = simulations.saturating_add(1);
    }

    let mut root_scores = Vec::new();
    for child_idx in tree.root().children.iter().copied() {
        let child = &tree.nodes[child_idx];
        if let Some(action) = child.action {
            root_scores.push((
                action,
                RootScores {
                    max_score: child.max_score,
                    visits: child.visits,
                },
            ));
        }
    }
    root_scores.sort_by_key(|(action, _)| action.catalog_index());

    let best_actions = best_state
        .as_ref()
        .map(|state| state.history[root_history..].to_vec())
        .unwrap_or_default();
    SearchOutcome {
        root_scores,
        best_actions,
        best_state,
        best_score,
        simulations,
        found_complete,
        cancelled,
    }
}

pub fn solve_oneshot(
    catalog: &ActionCatalog,
    recipe: &Recipe,
    state: &CraftState,
    config: &SolverConfig,
    cancel: &AtomicBool,
) -> Result<CandidateMacro, SolverError> {
    let started = Instant::now();
    let outcome = run_search(
        catalog,
        *recipe,
        state,
        config,
        config.seed,
        config.iterations,
        config.max_iterations,
        cancel,
    );
    Ok(candidate_from_playout(
        catalog,
        recipe,
        state,
        config,
        outcome.best_actions,
        outcome.best_state,
        outcome.cancelled,
        outcome.simulations as u64,
        started,
    ))
}

/// Eligible expansion actions: the enabled pool, minus risky actions under
/// strict mode. Narrowing applies to expansion only, so if it would empty
/// the list the full legal set stays eligible.
pub(crate) fn expansion_actions(
    sim: &Simulator<'_, LiveRandom>,
    state: &CraftState,
    config: &SolverConfig,
) -> Vec<ActionId> {
    let legal = sim.legal_actions(state, &config.action_pool);
    if config.strict_actions {
        let filtered: Vec<ActionId> = legal
            .iter()
            .copied()
            .filter(|id| !sim.catalog.get(*id).risky)
            .collect();
        if !filtered.is_empty() {
            return filtered;
        }
    }
    legal
}

/// Fast default policy: greedy over a cheap priority, randomized across the
/// top few candidates to decorrelate playouts.
fn rollout(
    sim: &mut Simulator<'_, LiveRandom>,
    rng: &mut RngState,
    mut state: CraftState,
    start_depth: u32,
    config: &SolverConfig,
) -> (f64, CraftState) {
    let recipe = sim.recipe;
    let mut depth = start_depth;
    while depth < config.max_rollout_steps
        && !state.completion(&recipe, config.max_step_count).is_terminal()
    {
        let legal = sim.legal_actions(&state, &config.action_pool);
        if legal.is_empty() {
            break;
        }
        let action = select_rollout_action(sim, rng, &state, legal);
        let (next, _) = sim.apply(&state, action);
        state = next;
        depth += 1;
    }
    let score = score_state(&state, &recipe, config.max_step_count, &config.weights);
    (score, state)
}

fn select_rollout_action(
    sim: &Simulator<'_, LiveRandom>,
    rng: &mut RngState,
    state: &CraftState,
    legal: Vec<ActionId>,
) -> ActionId {
    let mut ranked: Vec<(f64, usize, ActionId)> = legal
        .into_iter()
        .map(|id| {
            let priority = rollout_priority(sim.catalog.get(id), state, &sim.recipe);
            (priority, id.catalog_index(), id)
        })
        .collect();
    ranked.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
    let pick = rng.next_below(ranked.len().min(3));
    ranked[pick].2
}

fn rollout_priority(def: &ActionDefinition, state: &CraftState, recipe: &Recipe) -> f64 {
    let progress_needed = state.progress < recipe.target_progress;
    let quality_needed = state.quality < recipe.target_quality;
    let base = match def.category {
        ActionCategory::FirstStep | ActionCategory::Progress => {
            if progress_needed {
                80.0 + def.potency as f64 / 10.0
            } else {
                5.0
            }
        }
        ActionCategory::Quality => {
            if quality_needed {
                60.0 + def.potency as f64 / 10.0
            } else {
                5.0
            }
        }
        ActionCategory::Durability => {
            if state.durability <= def.durability_restore {
                70.0
            } else {
                8.0
            }
        }
        ActionCategory::Buff => {
            let already = def
                .grants
                .map(|grant| state.has_status(grant.kind))
                .unwrap_or(false);
            if already {
                2.0
            } else {
                40.0
            }
        }
        ActionCategory::Other => 10.0,
    };
    base * def.success_rate as f64 / 100.0
}

/// Shared assembly of the solver output contract.
#[allow(clippy::too_many_arguments)]
pub(crate) fn candidate_from_playout(
    catalog: &ActionCatalog,
    recipe: &Recipe,
    start: &CraftState,
    config: &SolverConfig,
    actions: Vec<ActionId>,
    end_state: Option<CraftState>,
    cancelled: bool,
    simulations: u64,
    started: Instant,
) -> CandidateMacro {
    let end_state = end_state.unwrap_or_else(|| start.clone());
    let mut completion = end_state.completion(recipe, config.max_step_count);
    if actions.is_empty() && completion == CompletionState::Incomplete {
        completion = CompletionState::NoMoreActions;
    }
    let status = if cancelled {
        SolveStatus::Cancelled
    } else {
        status_for_completion(completion)
    };
    let reliability = reliability_profile(
        catalog,
        recipe,
        start,
        &actions,
        config.max_step_count,
        config.seed,
        config.reliability_trials,
    );
    CandidateMacro {
        status,
        actions,
        end_state,
        completion,
        reliability,
        simulations,
        wall_time_ms: started.elapsed().as_millis() as u64,
    }
}
