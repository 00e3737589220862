use crate::SolverError;
use craftplan_core::{CompletionState, CraftState, Recipe};
use serde::{Deserialize, Serialize};

/// Raw user weights in [0, 100], normalized internally before use.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub progress: f64,
    pub quality: f64,
    pub durability: f64,
    pub cp: f64,
    pub steps: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            progress: 100.0,
            quality: 80.0,
            durability: 5.0,
            cp: 5.0,
            steps: 10.0,
        }
    }
}

impl ScoreWeights {
    pub fn validate(&self) -> Result<(), SolverError> {
        for (label, value) in [
            ("progress", self.progress),
            ("quality", self.quality),
            ("durability", self.durability),
            ("cp", self.cp),
            ("steps", self.steps),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(SolverError::Config(format!(
                    "score weight {label} must be in [0, 100], got {value}"
                )));
            }
        }
        Ok(())
    }

    fn normalized(&self) -> [f64; 5] {
        let raw = [
            self.progress,
            self.quality,
            self.durability,
            self.cp,
            self.steps,
        ];
        let sum: f64 = raw.iter().sum();
        if sum <= 0.0 {
            return [0.2; 5];
        }
        raw.map(|value| value / sum)
    }
}

/// Scalar utility of a state. Incomplete states land in [0, 1]; any
/// `ProgressComplete` state lands in [2, 3], so completion always outranks
/// non-completion regardless of the weight configuration.
pub fn score_state(
    state: &CraftState,
    recipe: &Recipe,
    max_steps: u32,
    weights: &ScoreWeights,
) -> f64 {
    let [w_progress, w_quality, w_durability, w_cp, w_steps] = weights.normalized();

    let progress = fraction(state.progress as f64, recipe.target_progress as f64);
    let quality = fraction(state.quality as f64, recipe.target_quality as f64);
    let durability = fraction(state.durability.max(0) as f64, recipe.max_durability as f64);
    let cp = fraction(state.cp.max(0) as f64, recipe.max_cp as f64);
    let steps = if max_steps == 0 {
        0.0
    } else {
        (max_steps.saturating_sub(state.step)) as f64 / max_steps as f64
    };

    let base = w_progress * progress
        + w_quality * quality
        + w_durability * durability
        + w_cp * cp
        + w_steps * steps;
    if state.completion(recipe, max_steps) == CompletionState::ProgressComplete {
        2.0 + base
    } else {
        base
    }
}

fn fraction(value: f64, target: f64) -> f64 {
    if target <= 0.0 {
        1.0
    } else {
        (value / target).min(1.0)
    }
}
