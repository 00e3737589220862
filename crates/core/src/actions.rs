use crate::{CoreError, StatusKind};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ActionCategory {
    FirstStep,
    Progress,
    Quality,
    Durability,
    Buff,
    Other,
}

/// Declaration order is catalog registration order and the universal
/// tie-break order everywhere in the solver.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ActionId {
    OpeningFlourish,
    BasicWork,
    RushedWork,
    SteadyWork,
    BasicRefine,
    HastyRefine,
    SteadyRefine,
    PolishedRefine,
    FocusedRefine,
    Mend,
    Conserve,
    Momentum,
    Intensify,
    Inspire,
    Observe,
}

impl ActionId {
    pub const ALL: [ActionId; 15] = [
        ActionId::OpeningFlourish,
        ActionId::BasicWork,
        ActionId::RushedWork,
        ActionId::SteadyWork,
        ActionId::BasicRefine,
        ActionId::HastyRefine,
        ActionId::SteadyRefine,
        ActionId::PolishedRefine,
        ActionId::FocusedRefine,
        ActionId::Mend,
        ActionId::Conserve,
        ActionId::Momentum,
        ActionId::Intensify,
        ActionId::Inspire,
        ActionId::Observe,
    ];

    pub fn catalog_index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            ActionId::OpeningFlourish => "opening_flourish",
            ActionId::BasicWork => "basic_work",
            ActionId::RushedWork => "rushed_work",
            ActionId::SteadyWork => "steady_work",
            ActionId::BasicRefine => "basic_refine",
            ActionId::HastyRefine => "hasty_refine",
            ActionId::SteadyRefine => "steady_refine",
            ActionId::PolishedRefine => "polished_refine",
            ActionId::FocusedRefine => "focused_refine",
            ActionId::Mend => "mend",
            ActionId::Conserve => "conserve",
            ActionId::Momentum => "momentum",
            ActionId::Intensify => "intensify",
            ActionId::Inspire => "inspire",
            ActionId::Observe => "observe",
        }
    }
}

/// Combo dependency on the immediately preceding action(s). Prerequisites
/// may themselves be combos; chains resolve recursively.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ComboRequirement {
    After(ActionId),
    AfterEither(ActionId, ActionId),
}

impl ComboRequirement {
    pub fn prerequisites(self) -> [Option<ActionId>; 2] {
        match self {
            ComboRequirement::After(first) => [Some(first), None],
            ComboRequirement::AfterEither(first, second) => [Some(first), Some(second)],
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusGrant {
    pub kind: StatusKind,
    pub duration: u8,
    pub magnitude: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionDefinition {
    pub id: ActionId,
    pub category: ActionCategory,
    pub level: u8,
    pub durability_cost: i32,
    pub cp_cost: i32,
    pub success_rate: u8,
    pub potency: u32,
    pub durability_restore: i32,
    pub combo: Option<ComboRequirement>,
    pub grants: Option<StatusGrant>,
    pub first_step_only: bool,
    pub risky: bool,
}

impl ActionDefinition {
    fn new(id: ActionId, category: ActionCategory, level: u8) -> Self {
        Self {
            id,
            category,
            level,
            durability_cost: 0,
            cp_cost: 0,
            success_rate: 100,
            potency: 0,
            durability_restore: 0,
            combo: None,
            grants: None,
            first_step_only: false,
            risky: false,
        }
    }

    fn costs(mut self, durability: i32, cp: i32) -> Self {
        self.durability_cost = durability;
        self.cp_cost = cp;
        self
    }

    fn potency(mut self, potency: u32) -> Self {
        self.potency = potency;
        self
    }

    fn success(mut self, rate: u8) -> Self {
        self.success_rate = rate;
        self.risky = rate < 100;
        self
    }

    fn combo(mut self, combo: ComboRequirement) -> Self {
        self.combo = Some(combo);
        self
    }

    fn grants(mut self, kind: StatusKind, duration: u8, magnitude: u16) -> Self {
        self.grants = Some(StatusGrant {
            kind,
            duration,
            magnitude,
        });
        self
    }

    fn restores(mut self, durability: i32) -> Self {
        self.durability_restore = durability;
        self
    }

    fn first_step(mut self) -> Self {
        self.first_step_only = true;
        self
    }
}

/// Process-wide read-only action table. Built once, passed by reference
/// into simulator and solvers.
#[derive(Debug, Clone)]
pub struct ActionCatalog {
    defs: Vec<ActionDefinition>,
}

impl ActionCatalog {
    pub fn standard() -> Result<Self, CoreError> {
        Self::from_definitions(standard_definitions())
    }

    pub fn from_definitions(defs: Vec<ActionDefinition>) -> Result<Self, CoreError> {
        let mut ordered: Vec<Option<ActionDefinition>> = vec![None; ActionId::ALL.len()];
        for def in defs {
            let slot = &mut ordered[def.id.catalog_index()];
            if slot.is_some() {
                return Err(CoreError::DuplicateAction(def.id));
            }
            *slot = Some(def);
        }
        let mut flat = Vec::with_capacity(ordered.len());
        for (idx, slot) in ordered.into_iter().enumerate() {
            flat.push(slot.ok_or(CoreError::MissingAction(ActionId::ALL[idx]))?);
        }
        let catalog = Self { defs: flat };
        catalog.reject_combo_cycles()?;
        Ok(catalog)
    }

    pub fn get(&self, id: ActionId) -> &ActionDefinition {
        &self.defs[id.catalog_index()]
    }

    pub fn definitions(&self) -> &[ActionDefinition] {
        &self.defs
    }

    /// Actions of one category, ascending unlock level. Unknown categories
    /// simply yield nothing.
    pub fn by_category(&self, category: ActionCategory) -> Vec<&ActionDefinition> {
        let mut out: Vec<&ActionDefinition> = self
            .defs
            .iter()
            .filter(|def| def.category == category)
            .collect();
        out.sort_by_key(|def| (def.level, def.id));
        out
    }

    /// A combo action is usable from a given action pool only if every
    /// prerequisite, resolving nested combos recursively, is enabled.
    pub fn can_combo(&self, id: ActionId, enabled: &HashSet<ActionId>) -> bool {
        let Some(combo) = self.get(id).combo else {
            return true;
        };
        match combo {
            ComboRequirement::After(first) => self.leaf_enabled(first, enabled),
            ComboRequirement::AfterEither(first, second) => {
                self.leaf_enabled(first, enabled) || self.leaf_enabled(second, enabled)
            }
        }
    }

    fn leaf_enabled(&self, id: ActionId, enabled: &HashSet<ActionId>) -> bool {
        enabled.contains(&id) && self.can_combo(id, enabled)
    }

    /// A combo is legal only if its full prerequisite chain is the
    /// immediate suffix of the history, in order.
    pub fn combo_satisfied(&self, id: ActionId, history: &[ActionId]) -> bool {
        let Some(combo) = self.get(id).combo else {
            return true;
        };
        let tail_matches = |prev: ActionId| -> bool {
            match history.split_last() {
                Some((last, rest)) => *last == prev && self.combo_satisfied(prev, rest),
                None => false,
            }
        };
        match combo {
            ComboRequirement::After(first) => tail_matches(first),
            ComboRequirement::AfterEither(first, second) => {
                tail_matches(first) || tail_matches(second)
            }
        }
    }

    fn reject_combo_cycles(&self) -> Result<(), CoreError> {
        // 0 = unvisited, 1 = on stack, 2 = done
        let mut marks = vec![0u8; self.defs.len()];
        for id in ActionId::ALL {
            self.visit_combo(id, &mut marks)?;
        }
        Ok(())
    }

    fn visit_combo(&self, id: ActionId, marks: &mut [u8]) -> Result<(), CoreError> {
        match marks[id.catalog_index()] {
            1 => return Err(CoreError::ComboCycle(id)),
            2 => return Ok(()),
            _ => {}
        }
        marks[id.catalog_index()] = 1;
        if let Some(combo) = self.get(id).combo {
            for prerequisite in combo.prerequisites().into_iter().flatten() {
                self.visit_combo(prerequisite, marks)?;
            }
        }
        marks[id.catalog_index()] = 2;
        Ok(())
    }
}

pub fn standard_definitions() -> Vec<ActionDefinition> {
    use ActionCategory::*;
    use ActionId::*;
    vec![
        ActionDefinition::new(OpeningFlourish, FirstStep, 1)
            .costs(10, 6)
            .potency(300)
            .first_step(),
        ActionDefinition::new(BasicWork, Progress, 1)
            .costs(10, 0)
            .potency(120),
        ActionDefinition::new(RushedWork, Progress, 9)
            .costs(10, 0)
            .potency(500)
            .success(50),
        ActionDefinition::new(SteadyWork, Progress, 20)
            .costs(10, 7)
            .potency(180),
        ActionDefinition::new(BasicRefine, Quality, 5)
            .costs(10, 18)
            .potency(100),
        ActionDefinition::new(HastyRefine, Quality, 10)
            .costs(10, 0)
            .potency(100)
            .success(60),
        ActionDefinition::new(SteadyRefine, Quality, 18)
            .costs(10, 18)
            .potency(125)
            .combo(ComboRequirement::After(BasicRefine)),
        ActionDefinition::new(PolishedRefine, Quality, 30)
            .costs(10, 18)
            .potency(150)
            .combo(ComboRequirement::After(SteadyRefine)),
        ActionDefinition::new(FocusedRefine, Quality, 40)
            .costs(10, 18)
            .potency(150)
            .combo(ComboRequirement::After(Observe)),
        ActionDefinition::new(Mend, Durability, 7)
            .costs(0, 88)
            .restores(30),
        ActionDefinition::new(Conserve, Buff, 15)
            .costs(0, 56)
            .grants(StatusKind::Conserving, 4, 50),
        ActionDefinition::new(Momentum, Buff, 21)
            .costs(0, 32)
            .grants(StatusKind::Momentum, 3, 100),
        ActionDefinition::new(Intensify, Buff, 25)
            .costs(0, 18)
            .grants(StatusKind::Intensified, 4, 50),
        ActionDefinition::new(Inspire, Buff, 26)
            .costs(0, 18)
            .grants(StatusKind::Inspired, 4, 50),
        ActionDefinition::new(Observe, Other, 13).costs(0, 7),
    ]
}
