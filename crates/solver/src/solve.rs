use crate::{
    solve_genetic, solve_oneshot, solve_oneshot_forked, solve_optimal, solve_stepwise,
    CandidateMacro, SolverAlgorithm, SolverConfig, SolverError,
};
use craftplan_core::{ActionCatalog, CraftState, Recipe};
use std::sync::atomic::AtomicBool;

/// Validates the configuration and runs the selected solver variant. Every
/// variant returns the same `CandidateMacro` contract; `cancel` may be
/// flipped from another thread to stop the search at the next checkpoint.
pub fn solve(
    catalog: &ActionCatalog,
    recipe: &Recipe,
    state: &CraftState,
    config: &SolverConfig,
    cancel: &AtomicBool,
) -> Result<CandidateMacro, SolverError> {
    config.validate()?;
    match config.algorithm {
        SolverAlgorithm::Oneshot => solve_oneshot(catalog, recipe, state, config, cancel),
        SolverAlgorithm::OneshotForked => {
            solve_oneshot_forked(catalog, recipe, state, config, cancel)
        }
        SolverAlgorithm::Stepwise => solve_stepwise(catalog, recipe, state, config, false, cancel),
        SolverAlgorithm::StepwiseForked => {
            solve_stepwise(catalog, recipe, state, config, true, cancel)
        }
        SolverAlgorithm::StepwiseGenetic => solve_genetic(catalog, recipe, state, config, cancel),
        SolverAlgorithm::Optimal => solve_optimal(catalog, recipe, state, config, cancel),
    }
}
