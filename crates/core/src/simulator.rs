use crate::{
    ActionCatalog, ActionCategory, ActionDefinition, ActionId, CompletionState, Condition,
    CraftState, Recipe, RngState, StatusEffect, StatusKind,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ActionResponse {
    SimulationComplete,
    ActionNotUnlocked,
    NotEnoughCp,
    NoDurability,
    CannotUseAction,
    UsedAction,
}

/// The two randomness hooks of the transition function. Swapping the
/// implementation swaps the simulator between its random and deterministic
/// variants without touching the transition logic.
pub trait RandomSource {
    fn roll_success_raw(&mut self, rate: u8) -> bool;
    fn next_condition(&mut self) -> Condition;
}

#[derive(Debug, Clone)]
pub struct LiveRandom {
    rng: RngState,
}

impl LiveRandom {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: RngState::from_seed(seed),
        }
    }
}

impl RandomSource for LiveRandom {
    fn roll_success_raw(&mut self, rate: u8) -> bool {
        self.rng.roll_percent(rate)
    }

    fn next_condition(&mut self) -> Condition {
        let total: u32 = Condition::DISTRIBUTION.iter().map(|(_, w)| w).sum();
        let mut pick = (self.rng.next_u64() % total as u64) as u32;
        for (condition, weight) in Condition::DISTRIBUTION {
            if pick < weight {
                return condition;
            }
            pick -= weight;
        }
        Condition::Normal
    }
}

/// Deterministic variant: a roll succeeds only at a fully guaranteed rate
/// and the condition never leaves the baseline.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRandom;

impl RandomSource for NoRandom {
    fn roll_success_raw(&mut self, rate: u8) -> bool {
        rate >= 100
    }

    fn next_condition(&mut self) -> Condition {
        Condition::Normal
    }
}

/// Deterministic rolls with an externally scripted condition stream. Used
/// by the adversarial solver to branch over condition outcomes.
#[derive(Debug, Clone, Copy)]
pub struct ForcedCondition {
    pub next: Condition,
}

impl RandomSource for ForcedCondition {
    fn roll_success_raw(&mut self, rate: u8) -> bool {
        rate >= 100
    }

    fn next_condition(&mut self) -> Condition {
        self.next
    }
}

#[derive(Debug, Clone)]
pub struct Simulator<'a, R> {
    pub catalog: &'a ActionCatalog,
    pub recipe: Recipe,
    pub max_steps: u32,
    pub random: R,
}

impl<'a, R: RandomSource> Simulator<'a, R> {
    pub fn new(catalog: &'a ActionCatalog, recipe: Recipe, max_steps: u32, random: R) -> Self {
        Self {
            catalog,
            recipe,
            max_steps,
            random,
        }
    }

    pub fn initial_state(&self) -> CraftState {
        CraftState::initial(&self.recipe)
    }

    pub fn cp_cost(&self, state: &CraftState, def: &ActionDefinition) -> i32 {
        scale_cost(def.cp_cost, state.condition.cp_cost_percent())
    }

    pub fn durability_cost(&self, state: &CraftState, def: &ActionDefinition) -> i32 {
        let mut percent = state.condition.durability_cost_percent();
        if state.has_status(StatusKind::Conserving) {
            percent = percent * 50 / 100;
        }
        scale_cost(def.durability_cost, percent)
    }

    /// Precondition checks in fixed order, each short-circuiting with its
    /// own response. `UsedAction` means every check passed.
    pub fn check(&self, state: &CraftState, action: ActionId) -> ActionResponse {
        let def = self.catalog.get(action);
        if def.level > self.recipe.job_level {
            return ActionResponse::ActionNotUnlocked;
        }
        if self.cp_cost(state, def) > state.cp {
            return ActionResponse::NotEnoughCp;
        }
        if self.durability_cost(state, def) > state.durability {
            return ActionResponse::NoDurability;
        }
        if def.first_step_only && state.step != 0 {
            return ActionResponse::CannotUseAction;
        }
        if !self.catalog.combo_satisfied(action, &state.history) {
            return ActionResponse::CannotUseAction;
        }
        ActionResponse::UsedAction
    }

    /// State transition. A rejected action returns the input state
    /// untouched; the caller retries with a legal action.
    pub fn apply(&mut self, state: &CraftState, action: ActionId) -> (CraftState, ActionResponse) {
        let (next, response, _) = self.apply_rolled(state, action);
        (next, response)
    }

    /// Like `apply`, additionally reporting whether the success roll passed.
    /// Costs deduct either way; effects land only on success.
    pub fn apply_rolled(
        &mut self,
        state: &CraftState,
        action: ActionId,
    ) -> (CraftState, ActionResponse, bool) {
        let response = self.check(state, action);
        if response != ActionResponse::UsedAction {
            return (state.clone(), response, false);
        }

        let def = self.catalog.get(action).clone();
        let mut next = state.clone();
        next.cp -= self.cp_cost(state, &def);
        next.durability -= self.durability_cost(state, &def);

        let rate = (def.success_rate as u32 + state.condition.success_bonus() as u32).min(100);
        let success = self.random.roll_success_raw(rate as u8);
        if success {
            self.apply_effects(&mut next, state, &def);
        }

        for effect in next.effects.iter_mut() {
            effect.remaining = effect.remaining.saturating_sub(1);
        }
        next.effects.retain(|effect| effect.remaining > 0);
        if success {
            if let Some(grant) = def.grants {
                next.effects.retain(|effect| effect.kind != grant.kind);
                next.effects.push(StatusEffect {
                    kind: grant.kind,
                    remaining: grant.duration,
                    magnitude: grant.magnitude,
                });
            }
        }

        next.step += 1;
        next.history.push(action);
        next.condition = self.random.next_condition();

        let response = if next.completion(&self.recipe, self.max_steps).is_terminal() {
            ActionResponse::SimulationComplete
        } else {
            ActionResponse::UsedAction
        };
        (next, response, success)
    }

    fn apply_effects(&self, next: &mut CraftState, before: &CraftState, def: &ActionDefinition) {
        match def.category {
            ActionCategory::FirstStep | ActionCategory::Progress => {
                let percent = 100 + before.status_magnitude(StatusKind::Intensified);
                next.progress += def.potency * percent / 100;
            }
            ActionCategory::Quality => {
                let mut percent = 100 + before.status_magnitude(StatusKind::Inspired);
                if before.has_status(StatusKind::Momentum) {
                    percent += before.status_magnitude(StatusKind::Momentum);
                    next.effects
                        .retain(|effect| effect.kind != StatusKind::Momentum);
                }
                let gain = def.potency * percent / 100;
                next.quality += gain * before.condition.quality_percent() / 100;
            }
            ActionCategory::Durability | ActionCategory::Buff | ActionCategory::Other => {}
        }
        if def.durability_restore > 0 {
            next.durability =
                (next.durability + def.durability_restore).min(self.recipe.max_durability);
        }
    }

    /// Legal actions from `state` restricted to `pool`, in catalog order.
    /// Empty once the state is terminal.
    pub fn legal_actions(&self, state: &CraftState, pool: &[ActionId]) -> Vec<ActionId> {
        if state.completion(&self.recipe, self.max_steps).is_terminal() {
            return Vec::new();
        }
        ActionId::ALL
            .into_iter()
            .filter(|id| pool.contains(id))
            .filter(|id| self.check(state, *id) == ActionResponse::UsedAction)
            .collect()
    }

    /// Classification of a state as seen by solvers: an `Incomplete` state
    /// with no remaining legal action counts as `NoMoreActions`.
    pub fn classify(&self, state: &CraftState, pool: &[ActionId]) -> CompletionState {
        let completion = state.completion(&self.recipe, self.max_steps);
        if completion == CompletionState::Incomplete && self.legal_actions(state, pool).is_empty() {
            return CompletionState::NoMoreActions;
        }
        completion
    }
}

fn scale_cost(base: i32, percent: u32) -> i32 {
    if base <= 0 {
        return base;
    }
    let scaled = (base as i64 * percent as i64 + 99) / 100;
    scaled.max(1) as i32
}
