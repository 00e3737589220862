use crate::spread_seed;
use craftplan_core::{
    ActionCatalog, ActionId, ActionResponse, CompletionState, CraftState, LiveRandom, Recipe,
    Simulator,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SolveStatus {
    TargetReached,
    Failed,
    NoMoreActions,
    BudgetExhausted,
    MaxSteps,
    Cancelled,
}

/// The uniform output of every solver variant: an ordered action sequence,
/// the predicted end state, and a per-prefix reliability estimate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateMacro {
    pub status: SolveStatus,
    pub actions: Vec<ActionId>,
    pub end_state: CraftState,
    pub completion: CompletionState,
    pub reliability: Vec<f64>,
    pub simulations: u64,
    pub wall_time_ms: u64,
}

/// Monte Carlo success fraction of a macro prefix: the share of independent
/// random replays in which every action is accepted and passes its success
/// roll (an early `ProgressComplete` also counts as success).
pub fn evaluate(
    catalog: &ActionCatalog,
    recipe: &Recipe,
    start: &CraftState,
    actions: &[ActionId],
    max_steps: u32,
    seed: u64,
    trials: u32,
) -> f64 {
    if actions.is_empty() || trials == 0 {
        return 1.0;
    }
    let mut successes = 0u32;
    for trial in 0..trials {
        let random = LiveRandom::from_seed(spread_seed(seed, trial as u64 + 1));
        let mut sim = Simulator::new(catalog, *recipe, max_steps, random);
        let mut state = start.clone();
        let mut ok = true;
        for (idx, action) in actions.iter().enumerate() {
            let (next, response, success) = sim.apply_rolled(&state, *action);
            let accepted = matches!(
                response,
                ActionResponse::UsedAction | ActionResponse::SimulationComplete
            );
            if !accepted || !success {
                ok = false;
                break;
            }
            state = next;
            if response == ActionResponse::SimulationComplete && idx + 1 < actions.len() {
                // Finished early: completion is a win, any other terminal is not.
                ok = state.completion(recipe, max_steps) == CompletionState::ProgressComplete;
                break;
            }
        }
        if ok {
            successes += 1;
        }
    }
    successes as f64 / trials as f64
}

/// Reliability of every prefix of `actions`, shortest first.
pub fn reliability_profile(
    catalog: &ActionCatalog,
    recipe: &Recipe,
    start: &CraftState,
    actions: &[ActionId],
    max_steps: u32,
    seed: u64,
    trials: u32,
) -> Vec<f64> {
    (1..=actions.len())
        .map(|len| evaluate(catalog, recipe, start, &actions[..len], max_steps, seed, trials))
        .collect()
}

pub(crate) fn status_for_completion(completion: CompletionState) -> SolveStatus {
    match completion {
        CompletionState::ProgressComplete => SolveStatus::TargetReached,
        CompletionState::NoMoreDurability => SolveStatus::Failed,
        CompletionState::MaxActionCountReached => SolveStatus::MaxSteps,
        CompletionState::NoMoreActions => SolveStatus::NoMoreActions,
        CompletionState::Incomplete | CompletionState::InvalidAction => {
            SolveStatus::BudgetExhausted
        }
    }
}
