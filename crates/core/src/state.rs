use crate::ActionId;
use serde::{Deserialize, Serialize};

/// Per-step ambient modifier. `Normal` is the common baseline; the rest are
/// rare specials drawn from a fixed weighted distribution.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Condition {
    Normal,
    Good,
    Excellent,
    Sturdy,
    Pliant,
    Harsh,
}

impl Condition {
    pub const ALL: [Condition; 6] = [
        Condition::Normal,
        Condition::Good,
        Condition::Excellent,
        Condition::Sturdy,
        Condition::Pliant,
        Condition::Harsh,
    ];

    /// Weights out of 100.
    pub const DISTRIBUTION: [(Condition, u32); 6] = [
        (Condition::Normal, 80),
        (Condition::Good, 10),
        (Condition::Excellent, 2),
        (Condition::Sturdy, 3),
        (Condition::Pliant, 3),
        (Condition::Harsh, 2),
    ];

    pub fn quality_percent(self) -> u32 {
        match self {
            Condition::Good => 150,
            Condition::Excellent => 400,
            _ => 100,
        }
    }

    pub fn durability_cost_percent(self) -> u32 {
        match self {
            Condition::Sturdy => 50,
            Condition::Harsh => 150,
            _ => 100,
        }
    }

    pub fn cp_cost_percent(self) -> u32 {
        match self {
            Condition::Pliant => 50,
            _ => 100,
        }
    }

    /// Additive success-rate bonus in percent points.
    pub fn success_bonus(self) -> u8 {
        match self {
            Condition::Good => 25,
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CompletionState {
    Incomplete,
    ProgressComplete,
    NoMoreDurability,
    InvalidAction,
    MaxActionCountReached,
    NoMoreActions,
}

impl CompletionState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, CompletionState::Incomplete)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum StatusKind {
    Intensified,
    Inspired,
    Momentum,
    Conserving,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct StatusEffect {
    pub kind: StatusKind,
    pub remaining: u8,
    pub magnitude: u16,
}

/// Host-supplied recipe parameters. Read-only during a solve.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Recipe {
    pub target_progress: u32,
    pub target_quality: u32,
    pub max_durability: i32,
    pub max_cp: i32,
    pub job_level: u8,
}

/// One crafting attempt. Produced only by the simulator's transition
/// function; every transition yields a new value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CraftState {
    pub progress: u32,
    pub quality: u32,
    pub durability: i32,
    pub cp: i32,
    pub step: u32,
    pub condition: Condition,
    pub effects: Vec<StatusEffect>,
    pub history: Vec<ActionId>,
}

impl CraftState {
    pub fn initial(recipe: &Recipe) -> Self {
        Self {
            progress: 0,
            quality: 0,
            durability: recipe.max_durability,
            cp: recipe.max_cp,
            step: 0,
            condition: Condition::Normal,
            effects: Vec::new(),
            history: Vec::new(),
        }
    }

    pub fn has_status(&self, kind: StatusKind) -> bool {
        self.effects.iter().any(|effect| effect.kind == kind)
    }

    pub fn status_magnitude(&self, kind: StatusKind) -> u32 {
        self.effects
            .iter()
            .find(|effect| effect.kind == kind)
            .map(|effect| effect.magnitude as u32)
            .unwrap_or(0)
    }

    pub fn completion(&self, recipe: &Recipe, max_steps: u32) -> CompletionState {
        if self.progress >= recipe.target_progress {
            CompletionState::ProgressComplete
        } else if self.durability <= 0 {
            CompletionState::NoMoreDurability
        } else if self.step >= max_steps {
            CompletionState::MaxActionCountReached
        } else {
            CompletionState::Incomplete
        }
    }
}
