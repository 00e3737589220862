use crate::{
    candidate_from_playout, run_search, CandidateMacro, SearchOutcome, SolverConfig, SolverError,
};
use craftplan_core::{ActionCatalog, ActionId, CraftState, Recipe};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::Instant;

/// Per first-action aggregate for a set of parallel forks. Exists only
/// between fork completion and decision commit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RootScores {
    pub max_score: f64,
    pub visits: u32,
}

impl Default for RootScores {
    fn default() -> Self {
        Self {
            max_score: f64::NEG_INFINITY,
            visits: 0,
        }
    }
}

impl RootScores {
    pub fn visit(&mut self, score: f64) {
        if score > self.max_score {
            self.max_score = score;
        }
        self.visits += 1;
    }

    pub fn merge(&mut self, other: &RootScores) {
        if other.max_score > self.max_score {
            self.max_score = other.max_score;
        }
        self.visits = self.visits.saturating_add(other.visits);
    }
}

/// Merged result of all forks for one decision point.
#[derive(Debug, Clone)]
pub struct ForkedOutcome {
    pub merged: Vec<(ActionId, RootScores)>,
    pub chosen: Option<ActionId>,
    pub best_actions: Vec<ActionId>,
    pub best_state: Option<CraftState>,
    pub best_score: f64,
    pub simulations: u64,
    pub found_complete: bool,
    pub cancelled: bool,
}

pub(crate) fn spread_seed(seed: u64, lane: u64) -> u64 {
    let mut z = seed ^ lane.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Runs the configured number of independent searches on a bounded worker
/// pool and merges their root statistics. Forks share only read-only data;
/// each gets a private tree and a distinctly seeded random stream.
pub fn run_forked(
    catalog: &ActionCatalog,
    recipe: &Recipe,
    root: &CraftState,
    config: &SolverConfig,
    cancel: &AtomicBool,
) -> ForkedOutcome {
    let fork_count = config.fork_count;
    let worker_count = config.max_thread_count.min(fork_count).max(1) as usize;
    let next_fork = AtomicU32::new(0);
    let (sender, receiver) = mpsc::channel::<(u32, SearchOutcome)>();

    thread::scope(|scope| {
        for _ in 0..worker_count {
            let sender = sender.clone();
            let next_fork = &next_fork;
            scope.spawn(move || loop {
                let fork = next_fork.fetch_add(1, Ordering::Relaxed);
                if fork >= fork_count {
                    break;
                }
                let outcome = run_search(
                    catalog,
                    *recipe,
                    root,
                    config,
                    spread_seed(config.seed, fork as u64 + 1),
                    config.iteration_share(config.iterations, fork),
                    config.iteration_share(config.max_iterations, fork),
                    cancel,
                );
                if sender.send((fork, outcome)).is_err() {
                    break;
                }
            });
        }
        drop(sender);
    });

    let mut merged = vec![RootScores::default(); ActionId::ALL.len()];
    let mut touched = vec![false; ActionId::ALL.len()];
    let mut best_score = f64::NEG_INFINITY;
    let mut best_actions = Vec::new();
    let mut best_state = None;
    let mut simulations = 0u64;
    let mut found_complete = false;
    let mut cancelled = false;

    // Merge in fork order so the result is independent of completion order.
    let mut outcomes: Vec<(u32, SearchOutcome)> = receiver.try_iter().collect();
    outcomes.sort_by_key(|(fork, _)| *fork);
    for (_, outcome) in outcomes {
        for (action, scores) in &outcome.root_scores {
            let idx = action.catalog_index();
            merged[idx].merge(scores);
            touched[idx] = true;
        }
        if outcome.best_score > best_score {
            best_score = outcome.best_score;
            best_actions = outcome.best_actions;
            best_state = outcome.best_state;
        }
        simulations += outcome.simulations as u64;
        found_complete |= outcome.found_complete;
        cancelled |= outcome.cancelled;
    }

    let merged: Vec<(ActionId, RootScores)> = ActionId::ALL
        .into_iter()
        .filter(|action| touched[action.catalog_index()])
        .map(|action| (action, merged[action.catalog_index()]))
        .collect();
    let chosen = select_merged(&merged);

    ForkedOutcome {
        merged,
        chosen,
        best_actions,
        best_state,
        best_score,
        simulations,
        found_complete,
        cancelled,
    }
}

/// Highest merged max score, ties by visits, then catalog order. A pure
/// function of the merged scores, independent of fork completion order.
pub fn select_merged(merged: &[(ActionId, RootScores)]) -> Option<ActionId> {
    let mut best: Option<(ActionId, RootScores)> = None;
    for (action, scores) in merged {
        let better = match &best {
            None => true,
            Some((_, current)) => {
                scores.max_score > current.max_score
                    || (scores.max_score == current.max_score && scores.visits > current.visits)
            }
        };
        if better {
            best = Some((*action, *scores));
        }
    }
    best.map(|(action, _)| action)
}

pub fn solve_oneshot_forked(
    catalog: &ActionCatalog,
    recipe: &Recipe,
    state: &CraftState,
    config: &SolverConfig,
    cancel: &AtomicBool,
) -> Result<CandidateMacro, SolverError> {
    let started = Instant::now();
    let outcome = run_forked(catalog, recipe, state, config, cancel);
    Ok(candidate_from_playout(
        catalog,
        recipe,
        state,
        config,
        outcome.best_actions,
        outcome.best_state,
        outcome.cancelled,
        outcome.simulations,
        started,
    ))
}
