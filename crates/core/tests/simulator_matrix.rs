use craftplan_core::{
    standard_definitions, ActionCatalog, ActionCategory, ActionId, ActionResponse, CompletionState,
    ComboRequirement, Condition, CoreError, CraftState, LiveRandom, NoRandom, Recipe, Simulator,
    StatusEffect, StatusKind,
};
use std::collections::HashSet;

fn recipe(progress: u32, quality: u32, durability: i32, cp: i32, level: u8) -> Recipe {
    Recipe {
        target_progress: progress,
        target_quality: quality,
        max_durability: durability,
        max_cp: cp,
        job_level: level,
    }
}

fn catalog() -> ActionCatalog {
    ActionCatalog::standard().expect("standard catalog builds")
}

/// Replays `prefix` deterministically and asserts the response `check`
/// returns for one more action.
macro_rules! response_case {
    ($name:ident, $recipe:expr, $prefix:expr, $action:expr, $expected:expr) => {
        #[test]
        fn $name() {
            let catalog = catalog();
            let mut sim = Simulator::new(&catalog, $recipe, 30, NoRandom);
            let mut state = sim.initial_state();
            let prefix: &[ActionId] = &$prefix;
            for action in prefix.iter().copied() {
                let (next, response) = sim.apply(&state, action);
                assert_eq!(response, ActionResponse::UsedAction);
                state = next;
            }
            assert_eq!(sim.check(&state, $action), $expected);
        }
    };
}

response_case!(
    locked_by_level,
    recipe(1000, 1000, 80, 200, 10),
    [],
    ActionId::SteadyWork,
    ActionResponse::ActionNotUnlocked
);
response_case!(
    locked_level_checked_before_cp,
    recipe(1000, 1000, 80, 0, 10),
    [],
    ActionId::SteadyWork,
    ActionResponse::ActionNotUnlocked
);
response_case!(
    not_enough_cp,
    recipe(1000, 1000, 80, 10, 90),
    [],
    ActionId::BasicRefine,
    ActionResponse::NotEnoughCp
);
response_case!(
    no_durability,
    recipe(1000, 1000, 5, 200, 90),
    [],
    ActionId::BasicWork,
    ActionResponse::NoDurability
);
response_case!(
    opening_allowed_on_first_step,
    recipe(1000, 1000, 80, 200, 90),
    [],
    ActionId::OpeningFlourish,
    ActionResponse::UsedAction
);
response_case!(
    opening_blocked_after_first_step,
    recipe(1000, 1000, 80, 200, 90),
    [ActionId::BasicWork],
    ActionId::OpeningFlourish,
    ActionResponse::CannotUseAction
);
response_case!(
    combo_blocked_without_prerequisite,
    recipe(1000, 1000, 80, 200, 90),
    [],
    ActionId::SteadyRefine,
    ActionResponse::CannotUseAction
);
response_case!(
    combo_follows_prerequisite,
    recipe(1000, 1000, 80, 200, 90),
    [ActionId::BasicRefine],
    ActionId::SteadyRefine,
    ActionResponse::UsedAction
);
response_case!(
    combo_broken_by_interleaved_action,
    recipe(1000, 1000, 80, 200, 90),
    [ActionId::BasicRefine, ActionId::Observe],
    ActionId::SteadyRefine,
    ActionResponse::CannotUseAction
);
response_case!(
    combo_chain_full_suffix,
    recipe(1000, 1000, 80, 200, 90),
    [ActionId::BasicRefine, ActionId::SteadyRefine],
    ActionId::PolishedRefine,
    ActionResponse::UsedAction
);
response_case!(
    combo_chain_rejects_partial_suffix,
    recipe(1000, 1000, 80, 200, 90),
    [ActionId::BasicRefine],
    ActionId::PolishedRefine,
    ActionResponse::CannotUseAction
);
response_case!(
    focused_needs_observe,
    recipe(1000, 1000, 80, 200, 90),
    [ActionId::Observe],
    ActionId::FocusedRefine,
    ActionResponse::UsedAction
);

macro_rules! condition_cost_case {
    ($name:ident, $condition:expr, $action:expr, $durability:expr, $cp:expr) => {
        #[test]
        fn $name() {
            let catalog = catalog();
            let sim = Simulator::new(&catalog, recipe(1000, 1000, 80, 200, 90), 30, NoRandom);
            let mut state = sim.initial_state();
            state.condition = $condition;
            let def = catalog.get($action);
            assert_eq!(sim.durability_cost(&state, def), $durability);
            assert_eq!(sim.cp_cost(&state, def), $cp);
        }
    };
}

condition_cost_case!(normal_costs, Condition::Normal, ActionId::BasicRefine, 10, 18);
condition_cost_case!(sturdy_halves_durability, Condition::Sturdy, ActionId::BasicWork, 5, 0);
condition_cost_case!(harsh_raises_durability, Condition::Harsh, ActionId::BasicWork, 15, 0);
condition_cost_case!(pliant_halves_cp, Condition::Pliant, ActionId::BasicRefine, 10, 9);
condition_cost_case!(good_leaves_costs_alone, Condition::Good, ActionId::BasicRefine, 10, 18);

#[test]
fn conserving_halves_durability_cost() {
    let catalog = catalog();
    let sim = Simulator::new(&catalog, recipe(1000, 1000, 80, 200, 90), 30, NoRandom);
    let mut state = sim.initial_state();
    state.effects.push(StatusEffect {
        kind: StatusKind::Conserving,
        remaining: 3,
        magnitude: 50,
    });
    assert_eq!(sim.durability_cost(&state, catalog.get(ActionId::BasicWork)), 5);
    state.condition = Condition::Sturdy;
    // 50% of 50%, rounded up.
    assert_eq!(sim.durability_cost(&state, catalog.get(ActionId::BasicWork)), 3);
}

macro_rules! condition_quality_case {
    ($name:ident, $condition:expr, $expected:expr) => {
        #[test]
        fn $name() {
            let catalog = catalog();
            let mut sim = Simulator::new(&catalog, recipe(1000, 1000, 80, 200, 90), 30, NoRandom);
            let mut state = sim.initial_state();
            state.condition = $condition;
            let (next, response) = sim.apply(&state, ActionId::BasicRefine);
            assert_eq!(response, ActionResponse::UsedAction);
            assert_eq!(next.quality, $expected);
        }
    };
}

condition_quality_case!(normal_quality, Condition::Normal, 100);
condition_quality_case!(good_quality_bonus, Condition::Good, 150);
condition_quality_case!(excellent_quality_bonus, Condition::Excellent, 400);
condition_quality_case!(harsh_quality_unchanged, Condition::Harsh, 100);

#[test]
fn failed_roll_still_deducts_costs() {
    let catalog = catalog();
    let mut sim = Simulator::new(&catalog, recipe(1000, 1000, 80, 200, 90), 30, NoRandom);
    let state = sim.initial_state();
    let (next, response, success) = sim.apply_rolled(&state, ActionId::RushedWork);
    assert!(!success);
    assert_eq!(response, ActionResponse::UsedAction);
    assert_eq!(next.progress, 0);
    assert_eq!(next.durability, 70);
    assert_eq!(next.step, 1);
    assert_eq!(next.history, vec![ActionId::RushedWork]);
}

#[test]
fn rejected_action_leaves_state_untouched() {
    let catalog = catalog();
    let mut sim = Simulator::new(&catalog, recipe(1000, 1000, 80, 200, 10), 30, NoRandom);
    let state = sim.initial_state();
    let (next, response) = sim.apply(&state, ActionId::SteadyWork);
    assert_eq!(response, ActionResponse::ActionNotUnlocked);
    assert_eq!(next, state);
}

#[test]
fn intensified_boosts_progress() {
    let catalog = catalog();
    let mut sim = Simulator::new(&catalog, recipe(1000, 1000, 80, 200, 90), 30, NoRandom);
    let state = sim.initial_state();
    let (buffed, _) = sim.apply(&state, ActionId::Intensify);
    assert!(buffed.has_status(StatusKind::Intensified));
    let (next, _) = sim.apply(&buffed, ActionId::BasicWork);
    assert_eq!(next.progress, 180);
}

#[test]
fn momentum_consumed_by_quality_action() {
    let catalog = catalog();
    let mut sim = Simulator::new(&catalog, recipe(1000, 1000, 80, 200, 90), 30, NoRandom);
    let state = sim.initial_state();
    let (buffed, _) = sim.apply(&state, ActionId::Momentum);
    let (next, _) = sim.apply(&buffed, ActionId::BasicRefine);
    assert_eq!(next.quality, 200);
    assert!(!next.has_status(StatusKind::Momentum));
    // A progress action leaves the charge in place.
    let (other, _) = sim.apply(&buffed, ActionId::BasicWork);
    assert!(other.has_status(StatusKind::Momentum));
}

#[test]
fn status_expires_after_duration() {
    let catalog = catalog();
    let mut sim = Simulator::new(&catalog, recipe(10_000, 1000, 200, 200, 90), 50, NoRandom);
    let mut state = sim.initial_state();
    let (next, _) = sim.apply(&state, ActionId::Intensify);
    state = next;
    assert!(state.has_status(StatusKind::Intensified));
    for _ in 0..4 {
        let (next, _) = sim.apply(&state, ActionId::Observe);
        state = next;
    }
    assert!(!state.has_status(StatusKind::Intensified));
}

#[test]
fn mend_restores_durability_up_to_max() {
    let catalog = catalog();
    let mut sim = Simulator::new(&catalog, recipe(1000, 1000, 80, 200, 90), 30, NoRandom);
    let mut state = sim.initial_state();
    for action in [ActionId::BasicWork, ActionId::BasicWork] {
        let (next, _) = sim.apply(&state, action);
        state = next;
    }
    assert_eq!(state.durability, 60);
    let (mended, _) = sim.apply(&state, ActionId::Mend);
    assert_eq!(mended.durability, 80);
}

#[test]
fn deterministic_replay_matches() {
    let catalog = catalog();
    let actions = [
        ActionId::OpeningFlourish,
        ActionId::BasicRefine,
        ActionId::SteadyRefine,
        ActionId::BasicWork,
    ];
    let run = |_: usize| {
        let mut sim = Simulator::new(&catalog, recipe(2000, 1000, 80, 200, 90), 30, NoRandom);
        let mut state = sim.initial_state();
        for action in actions {
            let (next, response) = sim.apply(&state, action);
            assert_eq!(response, ActionResponse::UsedAction);
            state = next;
        }
        state
    };
    assert_eq!(run(0), run(1));
}

#[test]
fn progress_complete_reports_simulation_complete() {
    let catalog = catalog();
    let mut sim = Simulator::new(&catalog, recipe(120, 0, 80, 200, 90), 30, NoRandom);
    let state = sim.initial_state();
    let (next, response) = sim.apply(&state, ActionId::BasicWork);
    assert_eq!(response, ActionResponse::SimulationComplete);
    assert_eq!(next.completion(&sim.recipe, 30), CompletionState::ProgressComplete);
}

#[test]
fn resources_never_go_negative_under_random_play() {
    let catalog = catalog();
    for seed in 0..8u64 {
        let mut sim = Simulator::new(
            &catalog,
            recipe(5000, 5000, 60, 120, 90),
            20,
            LiveRandom::from_seed(seed),
        );
        let mut state = sim.initial_state();
        loop {
            let legal = sim.legal_actions(&state, &ActionId::ALL);
            let Some(action) = legal.first().copied() else {
                break;
            };
            let (next, _) = sim.apply(&state, action);
            assert!(next.durability >= 0);
            assert!(next.cp >= 0);
            assert_eq!(next.step, state.step + 1);
            state = next;
            if state.completion(&sim.recipe, 20).is_terminal() {
                break;
            }
        }
    }
}

#[test]
fn legal_actions_in_catalog_order_and_empty_when_terminal() {
    let catalog = catalog();
    let sim = Simulator::new(&catalog, recipe(1000, 1000, 80, 200, 90), 30, NoRandom);
    let state = sim.initial_state();
    let legal = sim.legal_actions(&state, &ActionId::ALL);
    let mut sorted = legal.clone();
    sorted.sort_by_key(|id| id.catalog_index());
    assert_eq!(legal, sorted);
    assert!(legal.contains(&ActionId::OpeningFlourish));
    assert!(!legal.contains(&ActionId::SteadyRefine));

    let mut done = state.clone();
    done.progress = 1000;
    assert!(sim.legal_actions(&done, &ActionId::ALL).is_empty());
}

#[test]
fn classify_reports_no_more_actions() {
    let catalog = catalog();
    let sim = Simulator::new(&catalog, recipe(1000, 1000, 80, 0, 90), 30, NoRandom);
    let state = sim.initial_state();
    // Only the zero-cp progress actions remain; narrowing the pool to a
    // cp-gated action leaves nothing playable.
    assert_eq!(
        sim.classify(&state, &[ActionId::BasicRefine]),
        CompletionState::NoMoreActions
    );
    assert_eq!(
        sim.classify(&state, &[ActionId::BasicWork]),
        CompletionState::Incomplete
    );
}

#[test]
fn by_category_sorted_by_level() {
    let catalog = catalog();
    let quality = catalog.by_category(ActionCategory::Quality);
    let ids: Vec<ActionId> = quality.iter().map(|def| def.id).collect();
    assert_eq!(
        ids,
        vec![
            ActionId::BasicRefine,
            ActionId::HastyRefine,
            ActionId::SteadyRefine,
            ActionId::PolishedRefine,
            ActionId::FocusedRefine,
        ]
    );
}

#[test]
fn can_combo_resolves_nested_chains() {
    let catalog = catalog();
    let mut enabled: HashSet<ActionId> =
        [ActionId::SteadyRefine, ActionId::PolishedRefine].into_iter().collect();
    assert!(!catalog.can_combo(ActionId::PolishedRefine, &enabled));
    enabled.insert(ActionId::BasicRefine);
    assert!(catalog.can_combo(ActionId::PolishedRefine, &enabled));
    assert!(!catalog.can_combo(ActionId::FocusedRefine, &enabled));
    enabled.insert(ActionId::Observe);
    assert!(catalog.can_combo(ActionId::FocusedRefine, &enabled));
}

#[test]
fn catalog_rejects_combo_cycles() {
    let mut defs = standard_definitions();
    for def in defs.iter_mut() {
        if def.id == ActionId::SteadyRefine {
            def.combo = Some(ComboRequirement::After(ActionId::PolishedRefine));
        }
    }
    let err = ActionCatalog::from_definitions(defs).unwrap_err();
    assert!(matches!(err, CoreError::ComboCycle(_)));
}

#[test]
fn catalog_rejects_duplicates_and_gaps() {
    let mut defs = standard_definitions();
    let copy = defs[0].clone();
    defs.push(copy);
    assert!(matches!(
        ActionCatalog::from_definitions(defs).unwrap_err(),
        CoreError::DuplicateAction(ActionId::OpeningFlourish)
    ));

    let mut defs = standard_definitions();
    defs.retain(|def| def.id != ActionId::Mend);
    assert!(matches!(
        ActionCatalog::from_definitions(defs).unwrap_err(),
        CoreError::MissingAction(ActionId::Mend)
    ));
}

#[test]
fn condition_distribution_sums_to_one_hundred() {
    let total: u32 = Condition::DISTRIBUTION.iter().map(|(_, weight)| weight).sum();
    assert_eq!(total, 100);
}

#[test]
fn initial_state_starts_at_baseline() {
    let recipe = recipe(1000, 1000, 80, 200, 90);
    let state = CraftState::initial(&recipe);
    assert_eq!(state.durability, 80);
    assert_eq!(state.cp, 200);
    assert_eq!(state.condition, Condition::Normal);
    assert_eq!(state.completion(&recipe, 30), CompletionState::Incomplete);
}
