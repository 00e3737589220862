use craftplan_core::{ActionCatalog, ActionId, CraftState, Recipe};
use craftplan_solver::{
    evaluate, reliability_profile, score_state, select_merged, RootScores, ScoreWeights,
    SolverConfig,
};

fn recipe(progress: u32, quality: u32, durability: i32, cp: i32, level: u8) -> Recipe {
    Recipe {
        target_progress: progress,
        target_quality: quality,
        max_durability: durability,
        max_cp: cp,
        job_level: level,
    }
}

fn weights(progress: f64, quality: f64, durability: f64, cp: f64, steps: f64) -> ScoreWeights {
    ScoreWeights {
        progress,
        quality,
        durability,
        cp,
        steps,
    }
}

/// Completion must outrank any incomplete state no matter how the weights
/// are distributed.
macro_rules! completion_order_case {
    ($name:ident, $weights:expr) => {
        #[test]
        fn $name() {
            let recipe = recipe(1000, 1000, 80, 200, 90);
            let complete = CraftState {
                progress: 1000,
                ..CraftState::initial(&recipe)
            };
            // Near-perfect on every axis except the one that matters.
            let incomplete = CraftState {
                progress: 999,
                quality: 1000,
                ..CraftState::initial(&recipe)
            };
            let w = $weights;
            let complete_score = score_state(&complete, &recipe, 30, &w);
            let incomplete_score = score_state(&incomplete, &recipe, 30, &w);
            assert!((0.0..=1.0).contains(&incomplete_score));
            assert!((2.0..=3.0).contains(&complete_score));
            assert!(complete_score > incomplete_score);
        }
    };
}

completion_order_case!(completion_order_default, ScoreWeights::default());
completion_order_case!(completion_order_progress_only, weights(100.0, 0.0, 0.0, 0.0, 0.0));
completion_order_case!(completion_order_quality_heavy, weights(1.0, 100.0, 0.0, 0.0, 0.0));
completion_order_case!(completion_order_uniform, weights(20.0, 20.0, 20.0, 20.0, 20.0));
completion_order_case!(completion_order_all_zero, weights(0.0, 0.0, 0.0, 0.0, 0.0));

#[test]
fn score_rises_with_progress() {
    let recipe = recipe(1000, 1000, 80, 200, 90);
    let w = ScoreWeights::default();
    let low = CraftState {
        progress: 100,
        ..CraftState::initial(&recipe)
    };
    let high = CraftState {
        progress: 500,
        ..CraftState::initial(&recipe)
    };
    assert!(score_state(&high, &recipe, 30, &w) > score_state(&low, &recipe, 30, &w));
}

#[test]
fn overshoot_does_not_score_extra() {
    let recipe = recipe(1000, 500, 80, 200, 90);
    let w = ScoreWeights::default();
    let exact = CraftState {
        progress: 1000,
        quality: 500,
        ..CraftState::initial(&recipe)
    };
    let overshoot = CraftState {
        progress: 4000,
        quality: 2000,
        ..CraftState::initial(&recipe)
    };
    let a = score_state(&exact, &recipe, 30, &w);
    let b = score_state(&overshoot, &recipe, 30, &w);
    assert!((a - b).abs() < 1e-12);
}

#[test]
fn root_scores_track_max_and_visits() {
    let mut scores = RootScores::default();
    scores.visit(0.4);
    scores.visit(0.9);
    scores.visit(0.2);
    assert_eq!(scores.visits, 3);
    assert!((scores.max_score - 0.9).abs() < 1e-12);
}

#[test]
fn root_scores_merge_takes_max_and_sums_visits() {
    let mut a = RootScores { max_score: 5.0, visits: 10 };
    a.merge(&RootScores { max_score: 5.0, visits: 8 });
    a.merge(&RootScores { max_score: 7.0, visits: 3 });
    assert!((a.max_score - 7.0).abs() < 1e-12);
    assert_eq!(a.visits, 21);
}

#[test]
fn select_merged_prefers_max_then_visits_then_order() {
    let by_score = vec![
        (ActionId::BasicWork, RootScores { max_score: 1.0, visits: 100 }),
        (ActionId::BasicRefine, RootScores { max_score: 2.0, visits: 1 }),
    ];
    assert_eq!(select_merged(&by_score), Some(ActionId::BasicRefine));

    let by_visits = vec![
        (ActionId::BasicWork, RootScores { max_score: 2.0, visits: 4 }),
        (ActionId::BasicRefine, RootScores { max_score: 2.0, visits: 9 }),
    ];
    assert_eq!(select_merged(&by_visits), Some(ActionId::BasicRefine));

    let tied = vec![
        (ActionId::BasicWork, RootScores { max_score: 2.0, visits: 9 }),
        (ActionId::BasicRefine, RootScores { max_score: 2.0, visits: 9 }),
    ];
    assert_eq!(select_merged(&tied), Some(ActionId::BasicWork));
    assert_eq!(select_merged(&[]), None);
}

macro_rules! config_reject_case {
    ($name:ident, $mutate:expr) => {
        #[test]
        fn $name() {
            let mut config = SolverConfig::default();
            let mutate: fn(&mut SolverConfig) = $mutate;
            mutate(&mut config);
            assert!(config.validate().is_err());
        }
    };
}

config_reject_case!(reject_iteration_cap_below_floor, |c| {
    c.iterations = 100;
    c.max_iterations = 50;
});
config_reject_case!(reject_zero_steps, |c| c.max_step_count = 0);
config_reject_case!(reject_exploration_out_of_range, |c| {
    c.exploration_constant = 10.5
});
config_reject_case!(reject_negative_exploration, |c| {
    c.exploration_constant = -0.1
});
config_reject_case!(reject_weighting_above_one, |c| {
    c.max_score_weighting_constant = 1.5
});
config_reject_case!(reject_zero_forks, |c| c.fork_count = 0);
config_reject_case!(reject_zero_furcation, |c| c.furcated_action_count = 0);
config_reject_case!(reject_zero_threads, |c| c.max_thread_count = 0);
config_reject_case!(reject_zero_rollout, |c| c.max_rollout_steps = 0);
config_reject_case!(reject_empty_pool, |c| c.action_pool.clear());
config_reject_case!(reject_weight_above_hundred, |c| c.weights.quality = 150.0);
config_reject_case!(reject_negative_weight, |c| c.weights.progress = -1.0);

#[test]
fn default_config_validates() {
    assert!(SolverConfig::default().validate().is_ok());
}

#[test]
fn iteration_shares_cover_the_budget() {
    let mut config = SolverConfig::default();
    config.fork_count = 4;
    let total = 10;
    let shares: Vec<u32> = (0..4).map(|fork| config.iteration_share(total, fork)).collect();
    assert_eq!(shares.iter().sum::<u32>(), total);
    assert_eq!(shares[0], 4);
    assert_eq!(&shares[1..], &[2, 2, 2]);
}

#[test]
fn guaranteed_macro_is_fully_reliable() {
    let catalog = ActionCatalog::standard().unwrap();
    let recipe = recipe(240, 0, 80, 0, 10);
    let start = CraftState::initial(&recipe);
    let actions = [ActionId::BasicWork, ActionId::BasicWork];
    let result = evaluate(&catalog, &recipe, &start, &actions, 30, 7, 50);
    assert_eq!(result, 1.0);
}

#[test]
fn risky_macro_reliability_near_its_rate() {
    let catalog = ActionCatalog::standard().unwrap();
    let recipe = recipe(500, 0, 80, 0, 10);
    let start = CraftState::initial(&recipe);
    // First roll happens from the Normal baseline at a flat 50% rate.
    let result = evaluate(&catalog, &recipe, &start, &[ActionId::RushedWork], 30, 7, 200);
    assert!(result > 0.2 && result < 0.8, "got {result}");
}

#[test]
fn reliability_profile_is_non_increasing() {
    let catalog = ActionCatalog::standard().unwrap();
    let recipe = recipe(2000, 0, 80, 0, 10);
    let start = CraftState::initial(&recipe);
    let actions = [ActionId::RushedWork, ActionId::RushedWork];
    let profile = reliability_profile(&catalog, &recipe, &start, &actions, 30, 11, 100);
    assert_eq!(profile.len(), 2);
    assert!(profile[0] >= profile[1]);
}

#[test]
fn empty_macro_evaluates_to_one() {
    let catalog = ActionCatalog::standard().unwrap();
    let recipe = recipe(240, 0, 80, 0, 10);
    let start = CraftState::initial(&recipe);
    assert_eq!(evaluate(&catalog, &recipe, &start, &[], 30, 7, 50), 1.0);
}
