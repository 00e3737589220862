use crate::{
    reliability_profile, score_state, status_for_completion, CandidateMacro, SolveStatus,
    SolverConfig, SolverError,
};
use craftplan_core::{
    ActionCatalog, ActionCategory, ActionId, ActionResponse, CompletionState, Condition,
    CraftState, ForcedCondition, Recipe, Simulator, StatusEffect,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Exhaustive branch-and-bound over the deterministic simulator. Only
/// guaranteed actions participate, so the sole remaining uncertainty is the
/// condition stream; in adversarial mode every condition the adversary could
/// pick is branched and the rotation must complete under all of them.
pub fn solve_optimal(
    catalog: &ActionCatalog,
    recipe: &Recipe,
    start: &CraftState,
    config: &SolverConfig,
    cancel: &AtomicBool,
) -> Result<CandidateMacro, SolverError> {
    let started = Instant::now();
    let pool: Vec<ActionId> = config
        .action_pool
        .iter()
        .copied()
        .filter(|id| catalog.get(*id).success_rate >= 100)
        .collect();
    let branch_conditions: &[Condition] = if config.adversarial {
        &Condition::ALL
    } else {
        &[Condition::Normal]
    };

    let mut search = Search {
        sim: Simulator::new(
            catalog,
            *recipe,
            config.max_step_count,
            ForcedCondition {
                next: Condition::Normal,
            },
        ),
        config,
        pool,
        branch_conditions,
        cancel,
        nodes: 0,
        budget_hit: false,
        cancelled: false,
        memo: HashMap::new(),
        combo_suffix: combo_suffix_len(catalog),
        best_complete: None,
        best_partial: None,
        max_step_progress: max_progress_per_step(catalog, &config.action_pool),
    };
    search.visit(&[start.clone()], Vec::new());

    let mut candidate = search.into_candidate(catalog, recipe, start, config, started)?;
    if config.backload_progress && candidate.status == SolveStatus::TargetReached {
        backload(catalog, recipe, start, config, branch_conditions, &mut candidate);
    }
    Ok(candidate)
}

struct Search<'a, 'b> {
    sim: Simulator<'a, ForcedCondition>,
    config: &'b SolverConfig,
    pool: Vec<ActionId>,
    branch_conditions: &'b [Condition],
    cancel: &'b AtomicBool,
    nodes: u64,
    budget_hit: bool,
    cancelled: bool,
    // Explored resource vectors per (step, combo suffix, member signature).
    // Entries prune only sets whose conditions and active effects match
    // member for member.
    memo: HashMap<MemoKey, Vec<Vec<[i64; 4]>>>,
    combo_suffix: usize,
    best_complete: Option<(f64, Vec<ActionId>, CraftState)>,
    best_partial: Option<(f64, Vec<ActionId>, CraftState)>,
    max_step_progress: u32,
}

impl Search<'_, '_> {
    /// Depth-first walk over sets of condition-branched states sharing one
    /// action history. All members share step, history, and progress.
    fn visit(&mut self, states: &[CraftState], actions: Vec<ActionId>) {
        self.nodes += 1;
        if self.nodes > self.config.max_iterations as u64 {
            self.budget_hit = true;
            return;
        }
        if self.best_complete.is_some() && self.nodes > self.config.iterations as u64 {
            return;
        }
        if self.cancel.load(Ordering::Relaxed) {
            self.cancelled = true;
            return;
        }

        let recipe = self.sim.recipe;
        let max_steps = self.config.max_step_count;
        if states
            .iter()
            .any(|s| s.completion(&recipe, max_steps) == CompletionState::NoMoreDurability)
        {
            return;
        }
        let (worst_score, worst) = worst_of(states, &recipe, max_steps, self.config);
        if states[0].completion(&recipe, max_steps) == CompletionState::ProgressComplete {
            let better = self
                .best_complete
                .as_ref()
                .map(|(score, _, _)| worst_score > *score)
                .unwrap_or(true);
            if better {
                self.best_complete = Some((worst_score, actions, worst.clone()));
            }
            return;
        }
        let better_partial = self
            .best_partial
            .as_ref()
            .map(|(score, _, _)| worst_score > *score)
            .unwrap_or(true);
        if better_partial {
            self.best_partial = Some((worst_score, actions.clone(), worst.clone()));
        }
        if states[0].step >= max_steps {
            return;
        }

        let deficit = recipe.target_progress.saturating_sub(states[0].progress);
        let steps_left = max_steps - states[0].step;
        if deficit as u64 > self.max_step_progress as u64 * steps_left as u64 {
            return;
        }
        if self.dominated(states) {
            return;
        }

        for action in self.pool.clone() {
            if states
                .iter()
                .any(|s| self.sim.check(s, action) != ActionResponse::UsedAction)
            {
                continue;
            }
            let children = self.branch(states, action);
            if children.is_empty() {
                continue;
            }
            let mut next_actions = actions.clone();
            next_actions.push(action);
            self.visit(&children, next_actions);
            if self.budget_hit || self.cancelled {
                return;
            }
        }
    }

    /// Apply `action` to every member under every adversary condition, then
    /// drop members uniformly no worse than another member with the same
    /// upcoming condition.
    fn branch(&mut self, states: &[CraftState], action: ActionId) -> Vec<CraftState> {
        let mut children: Vec<CraftState> = Vec::new();
        for state in states {
            for condition in self.branch_conditions {
                self.sim.random.next = *condition;
                let (next, _) = self.sim.apply(state, action);
                children.push(next);
            }
        }
        prune_dominated(children)
    }

    /// A revisit is pruned only against an explored set with the same step,
    /// combo suffix, and member signature (condition plus active effects,
    /// member for member) that was at least as well off on progress,
    /// quality, durability, and cp everywhere. Signatures must match
    /// exactly; resources alone never justify a skip.
    fn dominated(&mut self, states: &[CraftState]) -> bool {
        let history = &states[0].history;
        let from = history.len().saturating_sub(self.combo_suffix);
        let mut ordered: Vec<&CraftState> = states.iter().collect();
        ordered.sort_by_key(|state| member_order(state));
        let key = MemoKey {
            step: states[0].step,
            suffix: history[from..].to_vec(),
            members: ordered
                .iter()
                .map(|state| (state.condition, sorted_effects(state)))
                .collect(),
        };
        let vector: Vec<[i64; 4]> = ordered
            .iter()
            .map(|state| {
                [
                    state.progress as i64,
                    state.quality as i64,
                    state.durability as i64,
                    state.cp as i64,
                ]
            })
            .collect();
        let explored = self.memo.entry(key).or_default();
        if explored.iter().any(|seen| covers(seen, &vector)) {
            return true;
        }
        explored.retain(|seen| !covers(&vector, seen));
        explored.push(vector);
        false
    }

    fn into_candidate(
        self,
        catalog: &ActionCatalog,
        recipe: &Recipe,
        start: &CraftState,
        config: &SolverConfig,
        started: Instant,
    ) -> Result<CandidateMacro, SolverError> {
        let (status, actions, end_state) = if let Some((_, actions, end)) = self.best_complete {
            let status = if self.cancelled {
                SolveStatus::Cancelled
            } else {
                SolveStatus::TargetReached
            };
            (status, actions, end)
        } else if self.cancelled || self.budget_hit {
            let (_, actions, end) = self
                .best_partial
                .unwrap_or_else(|| (f64::NEG_INFINITY, Vec::new(), start.clone()));
            let status = if self.cancelled {
                SolveStatus::Cancelled
            } else {
                SolveStatus::BudgetExhausted
            };
            (status, actions, end)
        } else if config.adversarial {
            // The whole guaranteed space was walked without a completing
            // rotation: impossibility, not exhaustion.
            return Err(SolverError::Infeasible);
        } else {
            let (_, actions, end) = self
                .best_partial
                .unwrap_or_else(|| (f64::NEG_INFINITY, Vec::new(), start.clone()));
            (SolveStatus::NoMoreActions, actions, end)
        };

        let mut completion = end_state.completion(recipe, config.max_step_count);
        if completion == CompletionState::Incomplete && status == SolveStatus::NoMoreActions {
            completion = CompletionState::NoMoreActions;
        }
        let status = if status == SolveStatus::TargetReached {
            status_for_completion(completion)
        } else {
            status
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
        Ok(CandidateMacro {
            status,
            actions,
            end_state,
            completion,
            reliability,
            simulations: self.nodes,
            wall_time_ms: started.elapsed().as_millis() as u64,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MemoKey {
    step: u32,
    suffix: Vec<ActionId>,
    members: Vec<(Condition, Vec<StatusEffect>)>,
}

/// Member-wise resource comparison between sets sharing one memo key.
fn covers(a: &[[i64; 4]], b: &[[i64; 4]]) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b.iter())
            .all(|(x, y)| x.iter().zip(y.iter()).all(|(p, q)| p >= q))
}

fn sorted_effects(state: &CraftState) -> Vec<StatusEffect> {
    let mut effects = state.effects.clone();
    effects.sort_by_key(|effect| (effect.kind as u8, effect.remaining, effect.magnitude));
    effects
}

/// Canonical member order within a set. The projection onto (condition,
/// effects) is resource-independent, so equal signatures line up member for
/// member across sets.
fn member_order(state: &CraftState) -> (u8, Vec<(u8, u8, u16)>, u32, i32, i32) {
    let effects: Vec<(u8, u8, u16)> = sorted_effects(state)
        .into_iter()
        .map(|effect| (effect.kind as u8, effect.remaining, effect.magnitude))
        .collect();
    (
        state.condition as u8,
        effects,
        state.quality,
        state.durability,
        state.cp,
    )
}

/// Longest prerequisite chain registered in the catalog. Combo legality
/// only ever inspects this many trailing history entries, so the memo
/// suffix of this length is exact.
fn combo_suffix_len(catalog: &ActionCatalog) -> usize {
    catalog
        .definitions()
        .iter()
        .map(|def| chain_depth(catalog, def.id))
        .max()
        .unwrap_or(0)
}

fn chain_depth(catalog: &ActionCatalog, id: ActionId) -> usize {
    match catalog.get(id).combo {
        None => 0,
        Some(combo) => {
            1 + combo
                .prerequisites()
                .into_iter()
                .flatten()
                .map(|prev| chain_depth(catalog, prev))
                .max()
                .unwrap_or(0)
        }
    }
}

fn worst_of<'s>(
    states: &'s [CraftState],
    recipe: &Recipe,
    max_steps: u32,
    config: &SolverConfig,
) -> (f64, &'s CraftState) {
    let mut worst_score = f64::INFINITY;
    let mut worst = &states[0];
    for state in states {
        let score = score_state(state, recipe, max_steps, &config.weights);
        if score < worst_score {
            worst_score = score;
            worst = state;
        }
    }
    (worst_score, worst)
}

/// Member A can be dropped when another member with the same upcoming
/// condition is no better on quality, durability, and cp: the adversary
/// would always prefer continuing from the worse one.
fn prune_dominated(states: Vec<CraftState>) -> Vec<CraftState> {
    let mut kept: Vec<CraftState> = Vec::new();
    for state in states {
        if kept.iter().any(|other| {
            other.condition == state.condition
                && other.quality <= state.quality
                && other.durability <= state.durability
                && other.cp <= state.cp
        }) {
            continue;
        }
        kept.retain(|other| {
            !(other.condition == state.condition
                && state.quality <= other.quality
                && state.durability <= other.durability
                && state.cp <= other.cp)
        });
        kept.push(state);
    }
    kept
}

fn max_progress_per_step(catalog: &ActionCatalog, pool: &[ActionId]) -> u32 {
    pool.iter()
        .map(|id| catalog.get(*id))
        .filter(|def| {
            matches!(
                def.category,
                ActionCategory::Progress | ActionCategory::FirstStep
            ) && def.success_rate >= 100
        })
        .map(|def| def.potency * 150 / 100)
        .max()
        .unwrap_or(0)
}

/// Push progress actions toward the end when the reordered rotation is
/// verified to still complete under every branched condition with a
/// worst-case score no lower than the original.
fn backload(
    catalog: &ActionCatalog,
    recipe: &Recipe,
    start: &CraftState,
    config: &SolverConfig,
    branch_conditions: &[Condition],
    candidate: &mut CandidateMacro,
) {
    let (front, back): (Vec<ActionId>, Vec<ActionId>) = candidate
        .actions
        .iter()
        .copied()
        .partition(|id| catalog.get(*id).category != ActionCategory::Progress);
    if back.is_empty() || front.is_empty() {
        return;
    }
    let mut reordered = front;
    reordered.extend(back);
    if reordered == candidate.actions {
        return;
    }

    let original = replay_guaranteed(
        catalog,
        recipe,
        start,
        config,
        branch_conditions,
        &candidate.actions,
    );
    let Some((original_score, _)) = original else {
        return;
    };
    let Some((score, end)) = replay_guaranteed(
        catalog,
        recipe,
        start,
        config,
        branch_conditions,
        &reordered,
    ) else {
        return;
    };
    if score < original_score {
        return;
    }
    candidate.reliability = reliability_profile(
        catalog,
        recipe,
        start,
        &reordered,
        config.max_step_count,
        config.seed,
        config.reliability_trials,
    );
    candidate.actions = reordered;
    candidate.end_state = end;
    candidate.completion = candidate
        .end_state
        .completion(recipe, config.max_step_count);
}

/// Deterministic replay of a fixed rotation across the branched condition
/// set. Returns the worst-case score and end state when every branch accepts
/// every action and finishes complete, `None` otherwise.
fn replay_guaranteed(
    catalog: &ActionCatalog,
    recipe: &Recipe,
    start: &CraftState,
    config: &SolverConfig,
    branch_conditions: &[Condition],
    actions: &[ActionId],
) -> Option<(f64, CraftState)> {
    let mut sim = Simulator::new(
        catalog,
        *recipe,
        config.max_step_count,
        ForcedCondition {
            next: Condition::Normal,
        },
    );
    let mut states = vec![start.clone()];
    for (idx, action) in actions.iter().enumerate() {
        let mut children = Vec::new();
        for state in &states {
            if sim.check(state, *action) != ActionResponse::UsedAction {
                return None;
            }
            for condition in branch_conditions {
                sim.random.next = *condition;
                let (next, _) = sim.apply(state, *action);
                children.push(next);
            }
        }
        states = prune_dominated(children);
        let last = idx + 1 == actions.len();
        for state in &states {
            let completion = state.completion(recipe, config.max_step_count);
            if completion == CompletionState::NoMoreDurability {
                return None;
            }
            if last && completion != CompletionState::ProgressComplete {
                return None;
            }
            if !last && completion.is_terminal() {
                return None;
            }
        }
    }
    let (score, worst) = worst_of(&states, recipe, config.max_step_count, config);
    Some((score, worst.clone()))
}
